use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use pokebot_server::app_state::AppState;
use pokebot_server::combat::BattleKind;
use pokebot_server::config::Config;
use pokebot_server::handlers::{self, BattleCommand, CaptureCommand, FleeCommand};
use pokebot_server::players::{OwnedPokemon, PlayerStore};
use pokebot_server::skills::SkillProvider;

fn test_state() -> (Arc<AppState>, Arc<PlayerStore>) {
    let players = PlayerStore::in_memory();
    let skills = SkillProvider::offline();
    let state = AppState::new(Config::default(), players.clone(), skills);
    (state, players)
}

async fn reply_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn capture_outside_a_battle_replies_only_to_the_caller() {
    let (state, _players) = test_state();

    let response = handlers::capture_handler(
        State(state),
        Json(CaptureCommand {
            user_id: "ash".to_string(),
            pokeball: None,
        }),
    )
    .await
    .into_response();

    let reply = reply_json(response).await;
    assert_eq!(reply["ephemeral"], true);
    assert!(reply["content"]
        .as_str()
        .unwrap()
        .contains("not in a battle"));
}

#[tokio::test]
async fn flee_outside_a_battle_replies_only_to_the_caller() {
    let (state, _players) = test_state();

    let response = handlers::flee_handler(
        State(state),
        Json(FleeCommand {
            user_id: "ash".to_string(),
        }),
    )
    .await
    .into_response();

    let reply = reply_json(response).await;
    assert_eq!(reply["ephemeral"], true);
}

#[tokio::test]
async fn capture_refusal_in_a_trainer_battle_is_not_broadcast() {
    let (state, players) = test_state();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 40, 5))
        .await
        .unwrap();
    players
        .give_pokeballs("ash", Some("Master Bola"), 1)
        .await
        .unwrap();
    state
        .battles
        .start_battle(
            "ash",
            pokebot_server::combat::PokemonChoice::Unspecified,
            Some(BattleKind::Trainer),
        )
        .await
        .unwrap();

    let response = handlers::capture_handler(
        State(state),
        Json(CaptureCommand {
            user_id: "ash".to_string(),
            pokeball: Some("Master Bola".to_string()),
        }),
    )
    .await
    .into_response();

    let reply = reply_json(response).await;
    assert_eq!(reply["ephemeral"], true);
    assert!(reply["content"].as_str().unwrap().contains("trainer"));
}

#[tokio::test]
async fn battle_start_is_broadcast() {
    let (state, players) = test_state();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 40, 5))
        .await
        .unwrap();

    let response = handlers::battle_handler(
        State(state),
        Json(BattleCommand {
            user_id: "ash".to_string(),
            pokemon: None,
            index: None,
            kind: Some(BattleKind::Wild),
        }),
    )
    .await
    .into_response();

    let reply = reply_json(response).await;
    assert_eq!(reply["ephemeral"], false);
    assert!(reply["content"].as_str().unwrap().contains("wild"));
}
