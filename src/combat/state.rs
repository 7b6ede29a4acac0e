use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::players::OwnedPokemon;
use crate::skills::Skill;

/// Wild encounters allow capture and pay 1.5x XP; trainer battles do
/// neither.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BattleKind {
    Wild,
    Trainer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Player,
    Opponent,
}

/// Status only moves forward: once a battle leaves `Active` it is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Active,
    PlayerWon,
    OpponentWon,
    Finished,
}

/// Copy of a Pokémon's combat stats embedded in the battle, decoupled from
/// the roster entry until a result is explicitly written back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PokemonSnapshot {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub level: u32,
    pub xp: u32,
}

impl PokemonSnapshot {
    pub fn of(pokemon: &OwnedPokemon) -> Self {
        PokemonSnapshot {
            name: pokemon.name.clone(),
            hp: pokemon.hp,
            max_hp: pokemon.max_hp,
            level: pokemon.level,
            xp: pokemon.xp,
        }
    }
}

/// How the player referred to the Pokémon they want to fight with.
/// Resolved once at the command boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PokemonChoice {
    ByName(String),
    ByIndex(usize),
    Unspecified,
}

/// One turn-based encounter between a player's active Pokémon and an
/// opponent. The central mutable aggregate of the battle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battle {
    pub battle_id: Uuid,
    pub player_id: String,
    pub kind: BattleKind,
    pub player_pokemon: PokemonSnapshot,
    /// Index of the active Pokémon in the player's roster.
    pub pokemon_index: usize,
    /// Roster indices eligible to be switched in.
    pub available_pokemons: Vec<usize>,
    /// Roster indices that fainted during this battle.
    pub defeated_pokemons: Vec<usize>,
    /// PP remaining per move name for the active Pokémon.
    pub skill_pp: HashMap<String, u32>,
    /// Trainer name, or "Wild" for wild encounters.
    pub opponent: String,
    pub opponent_pokemon: PokemonSnapshot,
    pub current_turn: Turn,
    pub turn_number: u32,
    pub status: BattleStatus,
    /// Computed at creation, fixed for the battle's lifetime.
    pub xp_reward: u32,
    pub created_at: DateTime<Utc>,
}

impl Battle {
    pub fn is_active(&self) -> bool {
        self.status == BattleStatus::Active
    }

    /// PP left for a move. A name missing from the table reads as the
    /// move's full base PP, never as zero.
    pub fn pp_remaining(&self, skill: &Skill) -> u32 {
        self.skill_pp.get(&skill.name).copied().unwrap_or(skill.pp)
    }

    /// Seed the PP table with every move at full base PP.
    pub fn init_skill_pp(&mut self, skills: &[Skill]) {
        self.skill_pp = skills.iter().map(|s| (s.name.clone(), s.pp)).collect();
    }

    /// Replace the active Pokémon's snapshot, used on switch.
    pub fn set_active_pokemon(&mut self, index: usize, pokemon: &OwnedPokemon, skills: &[Skill]) {
        self.player_pokemon = PokemonSnapshot::of(pokemon);
        self.pokemon_index = index;
        self.init_skill_pp(skills);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::default_skills;

    fn sample_battle() -> Battle {
        Battle {
            battle_id: Uuid::new_v4(),
            player_id: "p1".to_string(),
            kind: BattleKind::Wild,
            player_pokemon: PokemonSnapshot {
                name: "Pikachu".to_string(),
                hp: 50,
                max_hp: 50,
                level: 5,
                xp: 0,
            },
            pokemon_index: 0,
            available_pokemons: vec![0],
            defeated_pokemons: Vec::new(),
            skill_pp: HashMap::new(),
            opponent: "Wild".to_string(),
            opponent_pokemon: PokemonSnapshot {
                name: "Pidgey".to_string(),
                hp: 40,
                max_hp: 40,
                level: 3,
                xp: 0,
            },
            current_turn: Turn::Player,
            turn_number: 1,
            status: BattleStatus::Active,
            xp_reward: 45,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unknown_pp_key_reads_as_full_base_pp() {
        let battle = sample_battle();
        let skills = default_skills();
        assert_eq!(battle.pp_remaining(&skills[0]), skills[0].pp);
    }

    #[test]
    fn init_seeds_every_move_at_base_pp() {
        let mut battle = sample_battle();
        let skills = default_skills();
        battle.init_skill_pp(&skills);

        assert_eq!(battle.skill_pp.len(), skills.len());
        for skill in &skills {
            assert_eq!(battle.skill_pp[&skill.name], skill.pp);
        }
    }

    #[test]
    fn switching_replaces_snapshot_and_refreshes_pp() {
        let mut battle = sample_battle();
        let skills = default_skills();
        battle.init_skill_pp(&skills);
        battle.skill_pp.insert(skills[0].name.clone(), 0);

        let incoming = crate::players::OwnedPokemon::new("Squirtle", 44, 4);
        battle.set_active_pokemon(1, &incoming, &skills);

        assert_eq!(battle.pokemon_index, 1);
        assert_eq!(battle.player_pokemon.name, "Squirtle");
        // Depleted PP does not carry over to the incoming Pokémon.
        assert_eq!(battle.pp_remaining(&skills[0]), skills[0].pp);
    }
}
