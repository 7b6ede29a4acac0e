use dashmap::DashMap;
use rand::thread_rng;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use rand::Rng;

use crate::combat::encounter::{generate_opponent, xp_reward};
use crate::combat::engine;
use crate::combat::outcome::{
    AttackOutcome, CaptureOutcome, FleeOutcome, PokemonListing, StartOutcome, SwitchOutcome,
};
use crate::combat::state::{
    Battle, BattleKind, BattleStatus, PokemonChoice, PokemonSnapshot, Turn,
};
use crate::error::StoreError;
use crate::players::{OwnedPokemon, PlayerStore};
use crate::pokeballs::get_pokeball;
use crate::skills::SkillProvider;

/// Owns every live battle and orchestrates the store and move provider
/// around the engine. One `Arc<Mutex<Battle>>` per battle serializes the
/// actions against it; the per-player index enforces the one-active-battle
/// rule at creation time.
pub struct BattleManager {
    active_battles: DashMap<Uuid, Arc<Mutex<Battle>>>,
    battles_by_player: DashMap<String, Uuid>,
    players: Arc<PlayerStore>,
    skills: Arc<SkillProvider>,
}

impl BattleManager {
    pub fn new(players: Arc<PlayerStore>, skills: Arc<SkillProvider>) -> Arc<Self> {
        Arc::new(BattleManager {
            active_battles: DashMap::new(),
            battles_by_player: DashMap::new(),
            players,
            skills,
        })
    }

    /// The player's live battle, if any.
    fn battle_handle(&self, player_id: &str) -> Option<Arc<Mutex<Battle>>> {
        let battle_id = *self.battles_by_player.get(player_id)?;
        self.active_battles.get(&battle_id).map(|b| b.value().clone())
    }

    /// A point-in-time copy of the player's live battle, for rendering.
    pub async fn snapshot(&self, player_id: &str) -> Option<Battle> {
        let handle = self.battle_handle(player_id)?;
        let battle = handle.lock().await;
        Some(battle.clone())
    }

    /// Drop a terminal battle from both maps. Terminal battles are never
    /// resumed; a new fight needs a fresh record.
    fn retire(&self, battle: &Battle) {
        self.active_battles.remove(&battle.battle_id);
        self.battles_by_player
            .remove_if(&battle.player_id, |_, id| *id == battle.battle_id);
        info!(
            "Battle {} for player {} ended with status {:?}",
            battle.battle_id, battle.player_id, battle.status
        );
    }

    /// Start a battle for the player. Fails as a structured outcome when a
    /// battle is already running, the roster is empty, or the Pokémon
    /// choice is missing or doesn't resolve.
    pub async fn start_battle(
        &self,
        player_id: &str,
        choice: PokemonChoice,
        kind: Option<BattleKind>,
    ) -> Result<StartOutcome, StoreError> {
        if self.battles_by_player.contains_key(player_id) {
            return Ok(StartOutcome::AlreadyInBattle);
        }

        let Some(player) = self.players.get_player(player_id).await? else {
            return Ok(StartOutcome::NoPokemon);
        };
        if player.pokemons.is_empty() {
            return Ok(StartOutcome::NoPokemon);
        }

        let index = match choice {
            PokemonChoice::Unspecified => {
                if player.pokemons.len() == 1 {
                    0
                } else {
                    let listings = player
                        .pokemons
                        .iter()
                        .enumerate()
                        .map(|(index, p)| PokemonListing {
                            index,
                            name: p.name.clone(),
                            level: p.level,
                            hp: p.hp,
                            max_hp: p.max_hp,
                        })
                        .collect();
                    return Ok(StartOutcome::MustChoose(listings));
                }
            }
            PokemonChoice::ByIndex(index) => {
                if index >= player.pokemons.len() {
                    return Ok(StartOutcome::UnknownPokemon(format!("#{}", index)));
                }
                index
            }
            PokemonChoice::ByName(ref name) => {
                match player
                    .pokemons
                    .iter()
                    .position(|p| p.name.eq_ignore_ascii_case(name))
                {
                    Some(index) => index,
                    None => return Ok(StartOutcome::UnknownPokemon(name.clone())),
                }
            }
        };

        let kind = kind.unwrap_or_else(|| {
            if thread_rng().gen_bool(0.5) {
                BattleKind::Wild
            } else {
                BattleKind::Trainer
            }
        });
        let opponent = generate_opponent(kind);
        let reward = xp_reward(opponent.pokemon.level, kind);
        let chosen = &player.pokemons[index];
        let skills = self.skills.get_skills(&chosen.name).await;

        let mut battle = Battle {
            battle_id: Uuid::new_v4(),
            player_id: player_id.to_string(),
            kind,
            player_pokemon: PokemonSnapshot::of(chosen),
            pokemon_index: index,
            available_pokemons: (0..player.pokemons.len()).collect(),
            defeated_pokemons: Vec::new(),
            skill_pp: Default::default(),
            opponent: opponent.label,
            opponent_pokemon: opponent.pokemon,
            current_turn: Turn::Player,
            turn_number: 1,
            status: BattleStatus::Active,
            xp_reward: reward,
            created_at: chrono::Utc::now(),
        };
        battle.init_skill_pp(&skills);

        // Claim the per-player slot; a concurrent start loses here.
        match self.battles_by_player.entry(player_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Ok(StartOutcome::AlreadyInBattle)
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(battle.battle_id);
            }
        }

        info!(
            "Battle {} started: player {} ({}) vs {} ({}, level {})",
            battle.battle_id,
            player_id,
            battle.player_pokemon.name,
            battle.opponent,
            battle.opponent_pokemon.name,
            battle.opponent_pokemon.level
        );

        self.active_battles
            .insert(battle.battle_id, Arc::new(Mutex::new(battle.clone())));
        Ok(StartOutcome::Started(battle))
    }

    /// Resolve the player's attack in their active battle. On victory the
    /// XP reward is distributed before the outcome returns.
    pub async fn player_attack(
        &self,
        player_id: &str,
        skill_name: Option<&str>,
    ) -> Result<AttackOutcome, StoreError> {
        let Some(handle) = self.battle_handle(player_id) else {
            return Ok(AttackOutcome::failure(
                "You are not in a battle! Use /battle to start one.",
            ));
        };

        let mut battle = handle.lock().await;
        let skills = self.skills.get_skills(&battle.player_pokemon.name).await;

        let mut outcome = {
            let mut rng = thread_rng();
            engine::resolve_player_attack(&mut battle, &skills, skill_name, &mut rng)
        };

        if outcome.battle_ended && battle.status == BattleStatus::PlayerWon {
            outcome
                .message
                .push_str(&format!("\nYou gained {} XP!", battle.xp_reward));
            // The battle is terminal either way; it must leave the maps even
            // when the reward write fails, or the player's slot stays wedged.
            let payout = self.distribute_xp(&battle).await;
            self.retire(&battle);
            if let Some(leveled) = payout? {
                outcome.message.push_str(&format!(
                    "\n{} leveled up to {}! (HP {}/{})",
                    leveled.name, leveled.level, leveled.hp, leveled.max_hp
                ));
            }
        }

        Ok(outcome)
    }

    /// Resolve the NPC's counter-attack. Called after a player action that
    /// handed the turn over; off-turn calls are a silent no-op.
    pub async fn opponent_attack(&self, player_id: &str) -> Result<AttackOutcome, StoreError> {
        let Some(handle) = self.battle_handle(player_id) else {
            return Ok(AttackOutcome::noop());
        };

        let mut battle = handle.lock().await;
        let skills = self.skills.get_skills(&battle.opponent_pokemon.name).await;

        let outcome = {
            let mut rng = thread_rng();
            engine::resolve_opponent_attack(&mut battle, &skills, &mut rng)
        };

        if outcome.battle_ended {
            self.retire(&battle);
        }

        Ok(outcome)
    }

    /// Attempt to capture the wild opponent. The ball is consumed on every
    /// throw; a failed throw hands the turn over and leaves the
    /// counter-attack to the caller.
    pub async fn attempt_capture(
        &self,
        player_id: &str,
        ball_kind: Option<&str>,
    ) -> Result<CaptureOutcome, StoreError> {
        let Some(handle) = self.battle_handle(player_id) else {
            return Ok(CaptureOutcome::rejection(
                "You are not in a battle! Use /battle to start one.",
            ));
        };

        let mut battle = handle.lock().await;
        if battle.kind != BattleKind::Wild {
            return Ok(CaptureOutcome::rejection(
                "You can only capture wild Pokémon! This is a trainer battle.",
            ));
        }
        if !battle.is_active() {
            return Ok(CaptureOutcome::rejection("The battle is already over!"));
        }
        if battle.current_turn != Turn::Player {
            return Ok(CaptureOutcome::rejection("It's not your turn!"));
        }

        let Some(mut player) = self.players.get_player(player_id).await? else {
            return Ok(CaptureOutcome::rejection(
                "Could not find your trainer record!",
            ));
        };

        let ball = get_pokeball(ball_kind.unwrap_or(crate::pokeballs::DEFAULT_POKEBALL));
        let held = player.pokeball_count(ball.name);
        if held == 0 {
            let kinds = player.held_pokeball_kinds();
            let message = if kinds.is_empty() {
                "You have no pokéballs! Ask a mod for /givepokeball.".to_string()
            } else {
                format!(
                    "You have no {}! Pokéballs available: {}",
                    ball.name,
                    kinds.join(", ")
                )
            };
            return Ok(CaptureOutcome::rejection(message));
        }

        // Roll against a staged copy so a store failure leaves the live
        // battle exactly as it was.
        let mut staged = battle.clone();
        let outcome = {
            let mut rng = thread_rng();
            engine::resolve_capture_roll(&mut staged, ball, &mut rng)
        };

        // The ball is spent whether or not the Pokémon stayed in it.
        player.pokeballs.insert(ball.name.to_string(), held - 1);

        if outcome.success {
            let caught = &staged.opponent_pokemon;
            player.pokemons.push(OwnedPokemon {
                name: caught.name.clone(),
                hp: caught.max_hp,
                max_hp: caught.max_hp,
                level: caught.level,
                xp: 0,
            });
            info!(
                "Player {} captured {} (level {})",
                player_id, caught.name, caught.level
            );
        }

        self.players.save(&player).await?;
        *battle = staged;

        if outcome.battle_ended {
            self.retire(&battle);
        }

        Ok(outcome)
    }

    /// Attempt to flee. A failed roll resolves the opponent's counter
    /// attack synchronously within this same operation.
    pub async fn attempt_flee(&self, player_id: &str) -> Result<FleeOutcome, StoreError> {
        let Some(handle) = self.battle_handle(player_id) else {
            return Ok(FleeOutcome::rejection(
                "You are not in a battle! Use /battle to start one.",
            ));
        };

        let mut battle = handle.lock().await;
        if !battle.is_active() {
            return Ok(FleeOutcome::rejection("The battle is already over!"));
        }

        let fled = {
            let mut rng = thread_rng();
            engine::resolve_flee_roll(&mut battle, &mut rng)
        };

        if fled {
            self.retire(&battle);
            return Ok(FleeOutcome {
                success: true,
                rejected: false,
                message: "You fled from the battle!".to_string(),
                battle_ended: true,
                opponent_attack: None,
            });
        }

        let skills = self.skills.get_skills(&battle.opponent_pokemon.name).await;
        let counter = {
            let mut rng = thread_rng();
            engine::resolve_opponent_attack(&mut battle, &skills, &mut rng)
        };
        let battle_ended = counter.battle_ended;
        if battle_ended {
            self.retire(&battle);
        }

        Ok(FleeOutcome {
            success: false,
            rejected: false,
            message: "You couldn't get away!".to_string(),
            battle_ended,
            opponent_attack: Some(counter),
        })
    }

    /// Switch the active Pokémon to another roster slot. The move-PP table
    /// is reseeded at full base PP for the incoming Pokémon.
    pub async fn switch_pokemon(
        &self,
        player_id: &str,
        new_index: usize,
    ) -> Result<SwitchOutcome, StoreError> {
        let Some(handle) = self.battle_handle(player_id) else {
            return Ok(SwitchOutcome::failure(
                "You are not in a battle! Use /battle to start one.",
            ));
        };

        let mut battle = handle.lock().await;
        if !battle.is_active() {
            return Ok(SwitchOutcome::failure("The battle is already over!"));
        }

        let Some(player) = self.players.get_player(player_id).await? else {
            return Ok(SwitchOutcome::failure("Could not find your Pokémon!"));
        };

        if new_index >= player.pokemons.len() {
            return Ok(SwitchOutcome::failure("Invalid Pokémon index!"));
        }
        if battle.defeated_pokemons.contains(&new_index) {
            return Ok(SwitchOutcome::failure("That Pokémon has already fainted!"));
        }
        if !battle.available_pokemons.contains(&new_index) {
            return Ok(SwitchOutcome::failure("That Pokémon is not available!"));
        }

        let incoming = &player.pokemons[new_index];
        let skills = self.skills.get_skills(&incoming.name).await;
        battle.set_active_pokemon(new_index, incoming, &skills);

        Ok(SwitchOutcome {
            success: true,
            message: format!(
                "You switched to {} (level {}) - HP: {}/{}!",
                incoming.name, incoming.level, incoming.hp, incoming.max_hp
            ),
            pokemon: Some(battle.player_pokemon.clone()),
        })
    }

    /// Pay out the battle reward. Refused as a no-op on anything but a
    /// player victory; callers invoke it exactly once, at the transition.
    async fn distribute_xp(&self, battle: &Battle) -> Result<Option<OwnedPokemon>, StoreError> {
        if battle.status != BattleStatus::PlayerWon {
            warn!(
                "XP distribution refused for battle {} in status {:?}",
                battle.battle_id, battle.status
            );
            return Ok(None);
        }
        self.players
            .apply_xp_reward(&battle.player_id, battle.pokemon_index, battle.xp_reward)
            .await
    }
}
