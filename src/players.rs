use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::pokeballs::DEFAULT_POKEBALL;

/// XP needed per level; levels are always recomputed from total XP.
pub const XP_PER_LEVEL: u32 = 100;
/// Max-HP gained when a level-up is detected.
pub const LEVEL_UP_HP_BONUS: u32 = 10;

/// A Pokémon owned by a player. The position in `Player::pokemons` is the
/// stable reference battles use, so the vec is append-only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OwnedPokemon {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub level: u32,
    pub xp: u32,
}

impl OwnedPokemon {
    pub fn new(name: impl Into<String>, hp: u32, level: u32) -> Self {
        OwnedPokemon {
            name: name.into(),
            hp,
            max_hp: hp,
            level,
            xp: 0,
        }
    }

    /// Add XP and recompute the level from the new total. Returns true when
    /// the Pokémon leveled up, in which case max HP grows and HP is fully
    /// restored.
    pub fn grant_xp(&mut self, amount: u32) -> bool {
        self.xp += amount;
        let new_level = self.xp / XP_PER_LEVEL + 1;
        if new_level > self.level {
            self.level = new_level;
            self.max_hp += LEVEL_UP_HP_BONUS;
            self.hp = self.max_hp;
            true
        } else {
            false
        }
    }
}

/// Persistent record for one user.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Player {
    pub user_id: String,
    pub pokemons: Vec<OwnedPokemon>,
    pub xp: u32,
    pub pokeballs: HashMap<String, u32>,
}

impl Player {
    pub fn new(user_id: &str) -> Self {
        Player {
            user_id: user_id.to_string(),
            pokemons: Vec::new(),
            xp: 0,
            pokeballs: HashMap::new(),
        }
    }

    pub fn pokeball_count(&self, kind: &str) -> u32 {
        self.pokeballs.get(kind).copied().unwrap_or(0)
    }

    /// Names of pokéball kinds the player still holds at least one of.
    pub fn held_pokeball_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .pokeballs
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, _)| name.clone())
            .collect();
        kinds.sort();
        kinds
    }
}

/// Redis-backed player store with an in-memory write-through cache. Built
/// without a Redis client it keeps everything in memory, which is what the
/// tests use.
pub struct PlayerStore {
    players: RwLock<HashMap<String, Player>>,
    redis: Option<redis::Client>,
    fail_writes: AtomicBool,
}

impl PlayerStore {
    pub fn new(redis_client: redis::Client) -> Arc<Self> {
        Arc::new(PlayerStore {
            players: RwLock::new(HashMap::new()),
            redis: Some(redis_client),
            fail_writes: AtomicBool::new(false),
        })
    }

    pub fn in_memory() -> Arc<Self> {
        Arc::new(PlayerStore {
            players: RwLock::new(HashMap::new()),
            redis: None,
            fail_writes: AtomicBool::new(false),
        })
    }

    /// Make every following `save` fail, for exercising the callers'
    /// recovery paths against a dead backend.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn redis_key(user_id: &str) -> String {
        format!("player:{}", user_id)
    }

    /// Fetch a player record, loading it into the cache from Redis on first
    /// access. Returns `Ok(None)` for users that have no record yet.
    pub async fn get_player(&self, user_id: &str) -> Result<Option<Player>, StoreError> {
        {
            let players = self.players.read().await;
            if let Some(player) = players.get(user_id) {
                return Ok(Some(player.clone()));
            }
        }

        let Some(client) = &self.redis else {
            return Ok(None);
        };

        let mut con = client.get_async_connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::redis_key(user_id))
            .query_async(&mut con)
            .await?;

        match raw {
            Some(json) => {
                let player: Player = serde_json::from_str(&json)?;
                let mut players = self.players.write().await;
                players.insert(user_id.to_string(), player.clone());
                Ok(Some(player))
            }
            None => Ok(None),
        }
    }

    /// Fetch a player record, creating an empty one when absent.
    pub async fn get_or_create(&self, user_id: &str) -> Result<Player, StoreError> {
        if let Some(player) = self.get_player(user_id).await? {
            return Ok(player);
        }

        let player = Player::new(user_id);
        self.save(&player).await?;
        info!("Created player record for {}", user_id);
        Ok(player)
    }

    /// Full replace of a player record, cache and Redis both.
    pub async fn save(&self, player: &Player) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "store unavailable",
            ))));
        }

        if let Some(client) = &self.redis {
            let json = serde_json::to_string(player)?;
            let mut con = client.get_async_connection().await?;
            redis::cmd("SET")
                .arg(Self::redis_key(&player.user_id))
                .arg(json)
                .query_async::<_, ()>(&mut con)
                .await?;
        }

        let mut players = self.players.write().await;
        players.insert(player.user_id.clone(), player.clone());
        Ok(())
    }

    /// Mod-only grant: append a Pokémon to the player's roster, creating the
    /// record if needed. Returns its roster index.
    pub async fn give_pokemon(
        &self,
        user_id: &str,
        pokemon: OwnedPokemon,
    ) -> Result<usize, StoreError> {
        let mut player = self.get_or_create(user_id).await?;
        player.pokemons.push(pokemon.clone());
        let index = player.pokemons.len() - 1;
        self.save(&player).await?;
        info!(
            "Granted {} (level {}) to player {}",
            pokemon.name, pokemon.level, user_id
        );
        Ok(index)
    }

    /// Mod-only grant: add pokéballs of one kind. Unknown kinds are stored
    /// as given; capture resolves them against the fixed catalog later.
    pub async fn give_pokeballs(
        &self,
        user_id: &str,
        kind: Option<&str>,
        count: u32,
    ) -> Result<u32, StoreError> {
        let kind = kind.unwrap_or(DEFAULT_POKEBALL);
        let mut player = self.get_or_create(user_id).await?;
        let total = player.pokeballs.entry(kind.to_string()).or_insert(0);
        *total += count;
        let total = *total;
        self.save(&player).await?;
        info!("Granted {} x{} to player {} (now {})", kind, count, user_id, total);
        Ok(total)
    }

    /// Apply a battle reward: player-level XP plus XP on the Pokémon that
    /// fought, with its level recomputed from the new total.
    pub async fn apply_xp_reward(
        &self,
        user_id: &str,
        pokemon_index: usize,
        amount: u32,
    ) -> Result<Option<OwnedPokemon>, StoreError> {
        let mut player = self
            .get_player(user_id)
            .await?
            .ok_or_else(|| StoreError::PlayerNotFound(user_id.to_string()))?;

        player.xp += amount;

        let mut leveled = None;
        if let Some(pokemon) = player.pokemons.get_mut(pokemon_index) {
            if pokemon.grant_xp(amount) {
                info!(
                    "{} leveled up to {} (HP {}/{})",
                    pokemon.name, pokemon.level, pokemon.hp, pokemon.max_hp
                );
                leveled = Some(pokemon.clone());
            }
        } else {
            warn!(
                "XP reward for player {} pointed at missing roster index {}",
                user_id, pokemon_index
            );
        }

        self.save(&player).await?;
        Ok(leveled)
    }
}
