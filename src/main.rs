pub use pokebot_server::*;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let config = config::Config::from_env();
    let redis_url = std::env::var("REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let redis_client = init_redis_client(&redis_url).await;

    let players = players::PlayerStore::new(redis_client);
    let skills = skills::SkillProvider::new(&config.pokeapi, &config.cache);
    let state = app_state::AppState::new(config.clone(), players, skills);

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .server
                .cors_origins
                .iter()
                .map(|origin| origin.parse().unwrap())
                .collect::<Vec<_>>(),
        )
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    let app = Router::new()
        .route("/commands/battle", post(handlers::battle_handler))
        .route("/commands/attack", post(handlers::attack_handler))
        .route("/commands/capture", post(handlers::capture_handler))
        .route("/commands/flee", post(handlers::flee_handler))
        .route("/commands/switch", post(handlers::switch_handler))
        .route("/players/{user_id}/pokemon", get(handlers::roster_handler))
        .route("/admin/pokemon", post(handlers::give_pokemon_handler))
        .route("/admin/pokeballs", post(handlers::give_pokeballs_handler))
        .route("/health", get(handlers::health_handler))
        .layer(cors)
        .with_state(state);

    let addr = config.server_addr();
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind port");
    axum::serve(listener, app).await.expect("Server failed");
}

async fn init_redis_client(redis_url: &str) -> redis::Client {
    let client = redis::Client::open(redis_url).expect("Failed to create Redis client");

    // Test the connection
    let mut con = client
        .get_async_connection()
        .await
        .expect("Failed to connect to Redis");
    let _: String = redis::cmd("PING")
        .query_async(&mut con)
        .await
        .expect("Redis connection test failed");

    tracing::info!("Successfully connected to Redis at {}", redis_url);
    client
}
