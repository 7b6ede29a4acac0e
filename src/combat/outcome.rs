use serde::{Deserialize, Serialize};

use crate::combat::state::{Battle, PokemonSnapshot};

/// One roster entry as shown in "choose your Pokémon" listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PokemonListing {
    pub index: usize,
    pub name: String,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
}

/// Result of trying to start a battle. Rejections are ordinary outcomes,
/// not errors; only store failures surface as `Err`.
#[derive(Debug, Clone)]
pub enum StartOutcome {
    Started(Battle),
    AlreadyInBattle,
    NoPokemon,
    /// More than one Pokémon owned and none chosen: the player has to pick.
    MustChoose(Vec<PokemonListing>),
    UnknownPokemon(String),
}

/// Result of an attack, either side. `success == false` means a
/// precondition failed and nothing was mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub success: bool,
    pub damage: u32,
    pub skill: Option<String>,
    pub pp_remaining: Option<u32>,
    pub message: String,
    pub battle_ended: bool,
}

impl AttackOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        AttackOutcome {
            success: false,
            damage: 0,
            skill: None,
            pp_remaining: None,
            message: message.into(),
            battle_ended: false,
        }
    }

    /// The silent no-op used when the opponent is asked to act off-turn.
    pub fn noop() -> Self {
        Self::failure("")
    }
}

/// `rejected` marks a precondition failure where nothing was mutated;
/// those replies are shown only to the caller. A missed roll has
/// `success == false` but `rejected == false` and is battle progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOutcome {
    pub success: bool,
    pub rejected: bool,
    pub message: String,
    pub battle_ended: bool,
}

impl CaptureOutcome {
    /// A throw that happened but didn't hold.
    pub fn failure(message: impl Into<String>) -> Self {
        CaptureOutcome {
            success: false,
            rejected: false,
            message: message.into(),
            battle_ended: false,
        }
    }

    /// A precondition failure; the battle and inventory are untouched.
    pub fn rejection(message: impl Into<String>) -> Self {
        CaptureOutcome {
            rejected: true,
            ..Self::failure(message)
        }
    }
}

/// Flee resolves the opponent's counter-attack inside the same operation
/// when the roll fails, so the outcome carries it along. `rejected` has
/// the same meaning as on `CaptureOutcome`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleeOutcome {
    pub success: bool,
    pub rejected: bool,
    pub message: String,
    pub battle_ended: bool,
    pub opponent_attack: Option<AttackOutcome>,
}

impl FleeOutcome {
    pub fn rejection(message: impl Into<String>) -> Self {
        FleeOutcome {
            success: false,
            rejected: true,
            message: message.into(),
            battle_ended: false,
            opponent_attack: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchOutcome {
    pub success: bool,
    pub message: String,
    pub pokemon: Option<PokemonSnapshot>,
}

impl SwitchOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        SwitchOutcome {
            success: false,
            message: message.into(),
            pokemon: None,
        }
    }
}
