use thiserror::Error;

/// Failures of the player store. These are infrastructure errors; game-rule
/// rejections are reported through the outcome types instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to encode player record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("player {0} not found")]
    PlayerNotFound(String),
}

/// Failures of the remote move catalog. Callers of the skill provider never
/// see these directly; the provider degrades to its default move set.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("pokeapi request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("species {0} not found")]
    SpeciesNotFound(String),
}
