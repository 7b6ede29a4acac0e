pub mod encounter;
pub mod engine;
pub mod manager;
pub mod outcome;
pub mod state;

// Re-export key types from state module
pub use state::{
    Battle,
    BattleKind,
    BattleStatus,
    PokemonChoice,
    PokemonSnapshot,
    Turn,
};
pub use manager::BattleManager;
pub use outcome::{
    AttackOutcome,
    CaptureOutcome,
    FleeOutcome,
    PokemonListing,
    StartOutcome,
    SwitchOutcome,
};
