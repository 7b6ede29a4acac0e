use rand::Rng;

use crate::combat::state::{BattleKind, PokemonSnapshot};

/// Species a wild or trainer opponent can roll, with base HP.
const SPECIES_POOL: [(&str, u32); 7] = [
    ("Pikachu", 40),
    ("Charmander", 38),
    ("Squirtle", 44),
    ("Bulbasaur", 46),
    ("Pidgey", 30),
    ("Geodude", 52),
    ("Growlithe", 41),
];

const TRAINER_NAMES: [&str; 5] = [
    "Treinador Joey",
    "Lass Ana",
    "Gary",
    "Bug Catcher Leo",
    "Youngster Tim",
];

pub const WILD_OPPONENT: &str = "Wild";

/// A freshly generated opponent: the trainer label and their Pokémon.
#[derive(Debug, Clone)]
pub struct Opponent {
    pub label: String,
    pub pokemon: PokemonSnapshot,
}

/// Roll a random opponent for the given battle kind: random species,
/// level 1-10, HP = base + rand[0,15) + 2*level. Trainer battles also draw
/// a name from the fixed list.
pub fn generate_opponent(kind: BattleKind) -> Opponent {
    let mut rng = rand::thread_rng();

    let (species, base_hp) = SPECIES_POOL[rng.gen_range(0..SPECIES_POOL.len())];
    let level = rng.gen_range(1..=10);
    let hp = base_hp + rng.gen_range(0..15) + 2 * level;

    let label = match kind {
        BattleKind::Wild => WILD_OPPONENT.to_string(),
        BattleKind::Trainer => TRAINER_NAMES[rng.gen_range(0..TRAINER_NAMES.len())].to_string(),
    };

    Opponent {
        label,
        pokemon: PokemonSnapshot {
            name: species.to_string(),
            hp,
            max_hp: hp,
            level,
            xp: 0,
        },
    }
}

/// Base HP for a species in the fixed pool, used when a mod grants a
/// Pokémon by name. Unknown species get a middle-of-the-pool default.
pub fn species_base_hp(name: &str) -> u32 {
    SPECIES_POOL
        .iter()
        .find(|(species, _)| species.eq_ignore_ascii_case(name))
        .map(|(_, hp)| *hp)
        .unwrap_or(40)
}

/// XP paid out for beating an opponent of the given level. Wild battles
/// pay half again as much as trainer battles.
pub fn xp_reward(opponent_level: u32, kind: BattleKind) -> u32 {
    let base = opponent_level * 10;
    let multiplier = match kind {
        BattleKind::Wild => 1.5,
        BattleKind::Trainer => 1.0,
    };
    (base as f64 * multiplier).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wild_reward_is_one_and_a_half_times() {
        assert_eq!(xp_reward(4, BattleKind::Wild), 60);
        assert_eq!(xp_reward(4, BattleKind::Trainer), 40);
        assert_eq!(xp_reward(1, BattleKind::Wild), 15);
        // floor() on the half-XP case
        assert_eq!(xp_reward(3, BattleKind::Wild), 45);
    }

    #[test]
    fn generated_opponents_stay_in_range() {
        for _ in 0..100 {
            let opponent = generate_opponent(BattleKind::Wild);
            assert_eq!(opponent.label, WILD_OPPONENT);
            assert!((1..=10).contains(&opponent.pokemon.level));
            assert_eq!(opponent.pokemon.hp, opponent.pokemon.max_hp);

            let base = species_base_hp(&opponent.pokemon.name);
            let min_hp = base + 2 * opponent.pokemon.level;
            let max_hp = base + 14 + 2 * opponent.pokemon.level;
            assert!((min_hp..=max_hp).contains(&opponent.pokemon.hp));
        }
    }

    #[test]
    fn trainer_battles_draw_a_name() {
        for _ in 0..20 {
            let opponent = generate_opponent(BattleKind::Trainer);
            assert!(TRAINER_NAMES.contains(&opponent.label.as_str()));
        }
    }
}
