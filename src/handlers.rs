use crate::app_state::AppState;
use crate::combat::encounter::species_base_hp;
use crate::combat::{Battle, BattleKind, PokemonChoice, StartOutcome};
use crate::players::OwnedPokemon;
use crate::pokeballs::all_pokeballs;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use std::sync::Arc;

/// The chat-facing reply. `ephemeral` replies are shown only to the
/// player who issued the command.
#[derive(Debug, Serialize)]
pub struct CommandReply {
    pub content: String,
    pub ephemeral: bool,
}

impl CommandReply {
    fn public(content: impl Into<String>) -> Json<CommandReply> {
        Json(CommandReply {
            content: content.into(),
            ephemeral: false,
        })
    }

    fn ephemeral(content: impl Into<String>) -> Json<CommandReply> {
        Json(CommandReply {
            content: content.into(),
            ephemeral: true,
        })
    }
}

fn internal_error(err: impl std::fmt::Display) -> axum::response::Response {
    error!("Command failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        CommandReply::ephemeral("Something went wrong, please try again later."),
    )
        .into_response()
}

// 10-slot HP bar, filled proportionally to remaining HP
fn life_bar(hp: u32, max_hp: u32) -> String {
    let filled = if max_hp == 0 {
        0
    } else {
        ((hp as f64 / max_hp as f64) * 10.0).round() as usize
    };
    let filled = filled.min(10);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(10 - filled))
}

fn battle_status(battle: &Battle) -> String {
    let yours = &battle.player_pokemon;
    let theirs = &battle.opponent_pokemon;
    format!(
        "Your {} (level {}) HP: {}/{} {}\n{}'s {} (level {}) HP: {}/{} {}\nTurn {}",
        yours.name,
        yours.level,
        yours.hp,
        yours.max_hp,
        life_bar(yours.hp, yours.max_hp),
        battle.opponent,
        theirs.name,
        theirs.level,
        theirs.hp,
        theirs.max_hp,
        life_bar(theirs.hp, theirs.max_hp),
        battle.turn_number,
    )
}

#[derive(Debug, Deserialize)]
pub struct BattleCommand {
    pub user_id: String,
    pub pokemon: Option<String>,
    pub index: Option<usize>,
    pub kind: Option<BattleKind>,
}

pub async fn battle_handler(
    State(state): State<Arc<AppState>>,
    Json(command): Json<BattleCommand>,
) -> impl IntoResponse {
    let choice = match (command.index, command.pokemon) {
        (Some(index), _) => PokemonChoice::ByIndex(index),
        (None, Some(name)) if !name.trim().is_empty() => PokemonChoice::ByName(name),
        _ => PokemonChoice::Unspecified,
    };

    let outcome = match state
        .battles
        .start_battle(&command.user_id, choice, command.kind)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return internal_error(e),
    };

    match outcome {
        StartOutcome::Started(battle) => {
            let intro = match battle.kind {
                BattleKind::Wild => format!(
                    "A wild {} (level {}) appeared!",
                    battle.opponent_pokemon.name, battle.opponent_pokemon.level
                ),
                BattleKind::Trainer => format!(
                    "Trainer {} challenges you with {} (level {})!",
                    battle.opponent,
                    battle.opponent_pokemon.name,
                    battle.opponent_pokemon.level
                ),
            };
            CommandReply::public(format!("{}\n\n{}", intro, battle_status(&battle)))
                .into_response()
        }
        StartOutcome::AlreadyInBattle => CommandReply::ephemeral(
            "You are already in a battle! Finish it before starting another.",
        )
        .into_response(),
        StartOutcome::NoPokemon => CommandReply::ephemeral(
            "You don't have any Pokémon! Ask a moderator to grant you one.",
        )
        .into_response(),
        StartOutcome::MustChoose(listings) => {
            let mut content =
                String::from("You have more than one Pokémon. Pick one to send out:\n");
            for listing in listings {
                content.push_str(&format!(
                    "{}. {} (level {}) HP: {}/{}\n",
                    listing.index + 1,
                    listing.name,
                    listing.level,
                    listing.hp,
                    listing.max_hp
                ));
            }
            CommandReply::ephemeral(content).into_response()
        }
        StartOutcome::UnknownPokemon(name) => {
            CommandReply::ephemeral(format!("You don't have a Pokémon called {}!", name))
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AttackCommand {
    pub user_id: String,
    pub skill: Option<String>,
}

pub async fn attack_handler(
    State(state): State<Arc<AppState>>,
    Json(command): Json<AttackCommand>,
) -> impl IntoResponse {
    let outcome = match state
        .battles
        .player_attack(&command.user_id, command.skill.as_deref())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return internal_error(e),
    };

    if !outcome.success {
        return CommandReply::ephemeral(outcome.message).into_response();
    }

    let mut content = outcome.message;

    if !outcome.battle_ended {
        let counter = match state.battles.opponent_attack(&command.user_id).await {
            Ok(counter) => counter,
            Err(e) => return internal_error(e),
        };
        if !counter.message.is_empty() {
            content.push_str("\n");
            content.push_str(&counter.message);
        }
        if let Some(battle) = state.battles.snapshot(&command.user_id).await {
            content.push_str("\n\n");
            content.push_str(&battle_status(&battle));
        }
    }

    CommandReply::public(content).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CaptureCommand {
    pub user_id: String,
    pub pokeball: Option<String>,
}

pub async fn capture_handler(
    State(state): State<Arc<AppState>>,
    Json(command): Json<CaptureCommand>,
) -> impl IntoResponse {
    let outcome = match state
        .battles
        .attempt_capture(&command.user_id, command.pokeball.as_deref())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return internal_error(e),
    };

    if outcome.rejected {
        return CommandReply::ephemeral(outcome.message).into_response();
    }
    if outcome.success {
        return CommandReply::public(outcome.message).into_response();
    }

    let mut content = outcome.message;

    // A missed throw hands the turn over and earns a counter-attack.
    if !outcome.battle_ended {
        let counter = match state.battles.opponent_attack(&command.user_id).await {
            Ok(counter) => counter,
            Err(e) => return internal_error(e),
        };
        if !counter.message.is_empty() {
            content.push_str("\n");
            content.push_str(&counter.message);
        }
        if let Some(battle) = state.battles.snapshot(&command.user_id).await {
            content.push_str("\n\n");
            content.push_str(&battle_status(&battle));
        }
    }

    CommandReply::public(content).into_response()
}

#[derive(Debug, Deserialize)]
pub struct FleeCommand {
    pub user_id: String,
}

pub async fn flee_handler(
    State(state): State<Arc<AppState>>,
    Json(command): Json<FleeCommand>,
) -> impl IntoResponse {
    let outcome = match state.battles.attempt_flee(&command.user_id).await {
        Ok(outcome) => outcome,
        Err(e) => return internal_error(e),
    };

    if outcome.rejected {
        return CommandReply::ephemeral(outcome.message).into_response();
    }

    let mut content = outcome.message;
    if let Some(counter) = outcome.opponent_attack {
        if !counter.message.is_empty() {
            content.push_str("\n");
            content.push_str(&counter.message);
        }
    }
    if !outcome.battle_ended {
        if let Some(battle) = state.battles.snapshot(&command.user_id).await {
            content.push_str("\n\n");
            content.push_str(&battle_status(&battle));
        }
    }

    CommandReply::public(content).into_response()
}

#[derive(Debug, Deserialize)]
pub struct SwitchCommand {
    pub user_id: String,
    pub index: usize,
}

pub async fn switch_handler(
    State(state): State<Arc<AppState>>,
    Json(command): Json<SwitchCommand>,
) -> impl IntoResponse {
    let outcome = match state
        .battles
        .switch_pokemon(&command.user_id, command.index)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return internal_error(e),
    };

    if !outcome.success {
        return CommandReply::ephemeral(outcome.message).into_response();
    }

    let mut content = outcome.message;
    if let Some(battle) = state.battles.snapshot(&command.user_id).await {
        content.push_str("\n\n");
        content.push_str(&battle_status(&battle));
    }

    CommandReply::public(content).into_response()
}

#[derive(Debug, Serialize)]
pub struct RosterEntry {
    pub index: usize,
    pub name: String,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub xp: u32,
    pub bar: String,
}

pub async fn roster_handler(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.players.get_player(&user_id).await {
        Ok(Some(player)) => {
            let roster = player
                .pokemons
                .iter()
                .enumerate()
                .map(|(index, p)| RosterEntry {
                    index,
                    name: p.name.clone(),
                    level: p.level,
                    hp: p.hp,
                    max_hp: p.max_hp,
                    xp: p.xp,
                    bar: life_bar(p.hp, p.max_hp),
                })
                .collect::<Vec<_>>();
            Json(serde_json::json!({
                "user_id": player.user_id,
                "xp": player.xp,
                "pokemons": roster,
                "pokeballs": player.pokeballs,
            }))
            .into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "Player not found").into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct GivePokemonCommand {
    pub user_id: String,
    pub name: String,
    pub hp: Option<u32>,
    pub level: Option<u32>,
}

pub async fn give_pokemon_handler(
    State(state): State<Arc<AppState>>,
    Json(command): Json<GivePokemonCommand>,
) -> impl IntoResponse {
    if command.name.trim().is_empty() {
        return CommandReply::ephemeral("Pokémon name must not be empty!").into_response();
    }

    let level = command.level.unwrap_or(1).max(1);
    let hp = command
        .hp
        .unwrap_or_else(|| species_base_hp(command.name.trim()) + 2 * level);
    let pokemon = OwnedPokemon::new(command.name.trim(), hp, level);
    let name = pokemon.name.clone();

    match state.players.give_pokemon(&command.user_id, pokemon).await {
        Ok(index) => CommandReply::public(format!(
            "{} (level {}) joined <@{}>'s team in slot {}!",
            name,
            level,
            command.user_id,
            index + 1
        ))
        .into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct GivePokeballsCommand {
    pub user_id: String,
    pub kind: Option<String>,
    pub count: Option<u32>,
}

pub async fn give_pokeballs_handler(
    State(state): State<Arc<AppState>>,
    Json(command): Json<GivePokeballsCommand>,
) -> impl IntoResponse {
    let count = command.count.unwrap_or(1);
    if count == 0 {
        return CommandReply::ephemeral("Count must be at least 1!").into_response();
    }
    // Inventory keys are the canonical catalog names.
    let kind = match command.kind.as_deref() {
        Some(kind) => {
            match all_pokeballs()
                .iter()
                .find(|b| b.name.eq_ignore_ascii_case(kind))
            {
                Some(ball) => Some(ball.name),
                None => {
                    let known = all_pokeballs()
                        .iter()
                        .map(|b| b.name)
                        .collect::<Vec<_>>()
                        .join(", ");
                    return CommandReply::ephemeral(format!(
                        "Unknown pokéball {}! Known kinds: {}",
                        kind, known
                    ))
                    .into_response();
                }
            }
        }
        None => None,
    };

    match state
        .players
        .give_pokeballs(&command.user_id, kind, count)
        .await
    {
        Ok(total) => CommandReply::public(format!(
            "<@{}> received {} pokéball(s)! They now hold {} of that kind.",
            command.user_id, count, total
        ))
        .into_response(),
        Err(e) => internal_error(e),
    }
}

// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn life_bar_full_and_empty() {
        assert_eq!(life_bar(40, 40), "[██████████]");
        assert_eq!(life_bar(0, 40), "[░░░░░░░░░░]");
    }

    #[test]
    fn life_bar_rounds_to_nearest_slot() {
        assert_eq!(life_bar(20, 40), "[█████░░░░░]");
        assert_eq!(life_bar(1, 40), "[░░░░░░░░░░]");
        assert_eq!(life_bar(39, 40), "[██████████]");
    }

    #[test]
    fn life_bar_survives_zero_max_hp() {
        assert_eq!(life_bar(0, 0), "[░░░░░░░░░░]");
    }
}
