use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::info;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub pokeapi: PokeApiConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokeApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

/// TTL cache settings for the move provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    pub max_size: usize,
    pub expiration_sec: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
                port: 3000,
                cors_origins: vec!["*".to_string()],
            },
            pokeapi: PokeApiConfig {
                base_url: "https://pokeapi.co/api/v2".to_string(),
                timeout_ms: 5000,
            },
            cache: CacheConfig {
                max_size: 1000,
                expiration_sec: 3600, // 1 hour
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        // Load .env file if available
        dotenv::dotenv().ok();

        let mut config = Config::default();

        // Server config
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.server.port = port;
            }
        }

        if let Ok(host) = env::var("HOST") {
            if let Ok(host) = host.parse::<IpAddr>() {
                config.server.host = host;
            }
        }

        if let Ok(cors) = env::var("CORS_ORIGINS") {
            config.server.cors_origins = cors.split(',').map(|s| s.trim().to_string()).collect();
        }

        // PokeAPI config
        if let Ok(base_url) = env::var("POKEAPI_BASE_URL") {
            config.pokeapi.base_url = base_url;
        }

        if let Ok(timeout) = env::var("POKEAPI_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                config.pokeapi.timeout_ms = timeout;
            }
        }

        // Cache config
        if let Ok(max_size) = env::var("SKILL_CACHE_MAX") {
            if let Ok(max_size) = max_size.parse::<usize>() {
                config.cache.max_size = max_size;
            }
        }

        if let Ok(ttl) = env::var("SKILL_CACHE_TTL_SEC") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                config.cache.expiration_sec = ttl;
            }
        }

        info!("Configuration loaded: {:?}", config);
        config
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}
