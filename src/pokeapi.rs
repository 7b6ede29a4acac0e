use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::config::PokeApiConfig;
use crate::error::ProviderError;

// Response shapes for the two PokeAPI endpoints we hit. Only the fields the
// move selection needs are deserialized.

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NamedApiResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct PokemonResponse {
    pub name: String,
    pub moves: Vec<PokemonMoveEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PokemonMoveEntry {
    #[serde(rename = "move")]
    pub move_ref: NamedApiResource,
    #[serde(default)]
    pub version_group_details: Vec<VersionGroupDetail>,
}

#[derive(Debug, Deserialize)]
pub struct VersionGroupDetail {
    #[serde(default)]
    pub level_learned_at: u32,
    pub move_learn_method: Option<NamedApiResource>,
}

#[derive(Debug, Deserialize)]
pub struct MoveResponse {
    pub name: String,
    pub power: Option<u32>,
    pub pp: Option<u32>,
    #[serde(rename = "type")]
    pub move_type: Option<NamedApiResource>,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorTextEntry>,
    #[serde(default)]
    pub effect_entries: Vec<EffectEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FlavorTextEntry {
    pub flavor_text: String,
    pub language: NamedApiResource,
}

#[derive(Debug, Deserialize)]
pub struct EffectEntry {
    pub effect: String,
}

impl PokemonMoveEntry {
    /// Lowest level at which the move is learned by level-up, across all
    /// game versions. `None` when the move is never learned that way.
    pub fn min_level_up(&self) -> Option<u32> {
        self.version_group_details
            .iter()
            .filter(|d| {
                d.move_learn_method
                    .as_ref()
                    .map(|m| m.name == "level-up")
                    .unwrap_or(false)
            })
            .map(|d| d.level_learned_at)
            .min()
    }
}

impl MoveResponse {
    /// English (or Portuguese) flavor text, falling back to the effect text.
    pub fn description(&self) -> String {
        let flavor = self
            .flavor_text_entries
            .iter()
            .find(|e| e.language.name == "pt" || e.language.name == "en")
            .map(|e| e.flavor_text.replace(['\n', '\u{c}'], " "));

        flavor
            .or_else(|| {
                self.effect_entries
                    .first()
                    .map(|e| e.effect.replace(['\n', '\u{c}'], " "))
            })
            .unwrap_or_else(|| "No description available".to_string())
    }

    /// "thunder-shock" -> "Thunder Shock".
    pub fn display_name(&self) -> String {
        self.name
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Thin PokeAPI client with a bounded request timeout.
pub struct PokeApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl PokeApiClient {
    pub fn new(config: &PokeApiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();
        PokeApiClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_pokemon(&self, species: &str) -> Result<PokemonResponse, ProviderError> {
        let name = species.to_lowercase();
        let url = format!("{}/pokemon/{}", self.base_url, name.trim());
        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::SpeciesNotFound(species.to_string()));
        }
        let response = response.error_for_status()?;
        Ok(response.json::<PokemonResponse>().await?)
    }

    pub async fn fetch_move(&self, url: &str) -> Result<MoveResponse, ProviderError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json::<MoveResponse>().await?)
    }

    /// Move URLs for a species, preferring level-up moves sorted by the
    /// level they are learned at, capped at `limit`.
    pub async fn move_urls(&self, species: &str, limit: usize) -> Result<Vec<String>, ProviderError> {
        let pokemon = self.fetch_pokemon(species).await?;

        let mut level_up: Vec<(u32, &PokemonMoveEntry)> = pokemon
            .moves
            .iter()
            .filter_map(|entry| entry.min_level_up().map(|lvl| (lvl, entry)))
            .collect();
        level_up.sort_by_key(|(lvl, _)| *lvl);

        let urls: Vec<String> = if level_up.is_empty() {
            warn!("No level-up moves for {}, taking the first listed", species);
            pokemon
                .moves
                .iter()
                .take(limit)
                .map(|entry| entry.move_ref.url.clone())
                .collect()
        } else {
            level_up
                .into_iter()
                .take(limit)
                .map(|(_, entry)| entry.move_ref.url.clone())
                .collect()
        };

        Ok(urls)
    }
}
