use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::{CacheConfig, PokeApiConfig};
use crate::pokeapi::PokeApiClient;

/// Moves a Pokémon carries into battle.
pub const MAX_SKILLS: usize = 4;

/// How many candidate moves to pull from the catalog before filtering out
/// the non-damaging ones.
const FETCH_CANDIDATES: usize = 6;

/// A combat move. Immutable reference data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Skill {
    pub name: String,
    pub power: u32,
    pub element: String,
    pub pp: u32,
    pub description: String,
}

/// Time source for the cache, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    skills: Vec<Skill>,
    inserted_at: Instant,
}

/// TTL cache for per-species move lists. One lookup per species per TTL
/// window keeps a whole battle on a single catalog round-trip.
pub struct SkillCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_size: usize,
    clock: Arc<dyn Clock>,
}

impl SkillCache {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        SkillCache {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::from_secs(config.expiration_sec),
            max_size: config.max_size.max(1),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<Skill>> {
        let mut entries = self.entries.lock().ok()?;
        let now = self.clock.now();
        match entries.get(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                debug!("Skill cache hit for {}", key);
                Some(entry.skills.clone())
            }
            Some(_) => {
                debug!("Skill cache entry expired for {}", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, skills: Vec<Skill>) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries.len() >= self.max_size && !entries.contains_key(&key) {
            // Evict the oldest entry rather than growing without bound.
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                skills,
                inserted_at: self.clock.now(),
            },
        );
    }
}

/// Serves the up-to-4-move set for a species: PokeAPI when reachable,
/// cached results while fresh, and a fixed default set on any failure.
/// Built `offline` it never touches the network, which the tests rely on.
pub struct SkillProvider {
    client: Option<PokeApiClient>,
    cache: SkillCache,
}

impl SkillProvider {
    pub fn new(pokeapi: &PokeApiConfig, cache: &CacheConfig) -> Arc<Self> {
        Arc::new(SkillProvider {
            client: Some(PokeApiClient::new(pokeapi)),
            cache: SkillCache::new(cache, Arc::new(SystemClock)),
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(SkillProvider {
            client: None,
            cache: SkillCache::new(
                &CacheConfig {
                    max_size: 100,
                    expiration_sec: 3600,
                },
                Arc::new(SystemClock),
            ),
        })
    }

    /// Moves for a species. Always returns between 1 and `MAX_SKILLS`
    /// entries; degraded paths fall back to the default set instead of
    /// erroring, so a battle can always proceed.
    pub async fn get_skills(&self, species: &str) -> Vec<Skill> {
        let species = species.trim();
        if species.is_empty() {
            return default_skills();
        }

        let key = species.to_lowercase();
        if let Some(skills) = self.cache.get(&key) {
            return skills;
        }

        let skills = match &self.client {
            Some(client) => match self.fetch_skills(client, species).await {
                Ok(skills) if !skills.is_empty() => skills,
                Ok(_) => {
                    warn!("No damaging moves found for {}, using defaults", species);
                    default_skills()
                }
                Err(e) => {
                    warn!("Move lookup failed for {}: {}, using defaults", species, e);
                    default_skills()
                }
            },
            None => default_skills(),
        };

        self.cache.insert(key, skills.clone());
        skills
    }

    async fn fetch_skills(
        &self,
        client: &PokeApiClient,
        species: &str,
    ) -> Result<Vec<Skill>, crate::error::ProviderError> {
        let urls = client.move_urls(species, FETCH_CANDIDATES).await?;

        let mut skills = Vec::new();
        for url in urls {
            let move_data = match client.fetch_move(&url).await {
                Ok(data) => data,
                Err(e) => {
                    warn!("Skipping move {}: {}", url, e);
                    continue;
                }
            };

            // Status moves carry no power; the battle engine only deals in
            // damaging moves.
            let Some(power) = move_data.power.filter(|p| *p > 0) else {
                continue;
            };

            skills.push(Skill {
                name: move_data.display_name(),
                power,
                element: move_data
                    .move_type
                    .as_ref()
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| "normal".to_string()),
                pp: move_data.pp.unwrap_or(20),
                description: move_data.description(),
            });
            if skills.len() == MAX_SKILLS {
                break;
            }
        }

        // Pad short lists from the defaults so every Pokémon has 4 moves.
        for fallback in default_skills() {
            if skills.len() >= MAX_SKILLS {
                break;
            }
            if !skills.iter().any(|s| s.name == fallback.name) {
                skills.push(fallback);
            }
        }

        Ok(skills)
    }
}

/// Fixed move set used whenever the remote catalog cannot answer.
pub fn default_skills() -> Vec<Skill> {
    vec![
        Skill {
            name: "Tackle".to_string(),
            power: 40,
            element: "normal".to_string(),
            pp: 35,
            description: "A basic physical attack".to_string(),
        },
        Skill {
            name: "Quick Attack".to_string(),
            power: 40,
            element: "normal".to_string(),
            pp: 30,
            description: "A fast attack that always strikes first".to_string(),
        },
        Skill {
            name: "Scratch".to_string(),
            power: 40,
            element: "normal".to_string(),
            pp: 35,
            description: "Scratches the opponent with sharp claws".to_string(),
        },
        Skill {
            name: "Bite".to_string(),
            power: 60,
            element: "dark".to_string(),
            pp: 25,
            description: "Bites down hard on the opponent".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(ManualClock {
                now: Mutex::new(Instant::now()),
            })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    fn cache_config(ttl_sec: u64, max_size: usize) -> CacheConfig {
        CacheConfig {
            max_size,
            expiration_sec: ttl_sec,
        }
    }

    #[test]
    fn cache_serves_until_ttl() {
        let clock = ManualClock::new();
        let cache = SkillCache::new(&cache_config(60, 10), clock.clone());
        cache.insert("pikachu".to_string(), default_skills());

        assert!(cache.get("pikachu").is_some());

        clock.advance(Duration::from_secs(61));
        assert!(cache.get("pikachu").is_none());
    }

    #[test]
    fn cache_evicts_oldest_when_full() {
        let clock = ManualClock::new();
        let cache = SkillCache::new(&cache_config(3600, 2), clock.clone());

        cache.insert("a".to_string(), default_skills());
        clock.advance(Duration::from_secs(1));
        cache.insert("b".to_string(), default_skills());
        clock.advance(Duration::from_secs(1));
        cache.insert("c".to_string(), default_skills());

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[tokio::test]
    async fn offline_provider_serves_defaults() {
        let provider = SkillProvider::offline();
        let skills = provider.get_skills("Pikachu").await;

        assert_eq!(skills.len(), MAX_SKILLS);
        assert_eq!(skills[0].name, "Tackle");
        assert!(skills.iter().all(|s| s.power > 0));
    }

    #[tokio::test]
    async fn empty_species_name_gets_defaults_without_caching() {
        let provider = SkillProvider::offline();
        let skills = provider.get_skills("  ").await;
        assert_eq!(skills, default_skills());
    }

    #[test]
    fn default_set_has_four_damaging_moves() {
        let skills = default_skills();
        assert_eq!(skills.len(), 4);
        assert!(skills.iter().all(|s| s.pp >= 1 && s.power > 0));
    }
}
