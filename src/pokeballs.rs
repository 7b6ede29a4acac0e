use serde::{Deserialize, Serialize};

/// A pokéball kind with its fixed base capture chance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pokeball {
    pub name: &'static str,
    pub rarity: Rarity,
    pub base_chance: f64,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

pub const DEFAULT_POKEBALL: &str = "Pokébola";

const POKEBALL_TYPES: [Pokeball; 4] = [
    Pokeball {
        name: "Pokébola",
        rarity: Rarity::Common,
        base_chance: 0.3,
        description: "A basic, common pokéball",
    },
    Pokeball {
        name: "Super Bola",
        rarity: Rarity::Uncommon,
        base_chance: 0.45,
        description: "An improved pokéball with a better catch rate",
    },
    Pokeball {
        name: "Ultra Bola",
        rarity: Rarity::Rare,
        base_chance: 0.6,
        description: "A high-quality pokéball",
    },
    Pokeball {
        name: "Master Bola",
        rarity: Rarity::Legendary,
        base_chance: 1.0,
        description: "The ultimate pokéball, never fails",
    },
];

/// Look up a pokéball by name, falling back to the basic one for unknown
/// names (matching how the shop treats typos).
pub fn get_pokeball(name: &str) -> &'static Pokeball {
    POKEBALL_TYPES
        .iter()
        .find(|b| b.name == name)
        .unwrap_or(&POKEBALL_TYPES[0])
}

pub fn all_pokeballs() -> &'static [Pokeball] {
    &POKEBALL_TYPES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_ball() {
        let ball = get_pokeball("Ultra Bola");
        assert_eq!(ball.base_chance, 0.6);
        assert_eq!(ball.rarity, Rarity::Rare);
    }

    #[test]
    fn unknown_ball_falls_back_to_default() {
        let ball = get_pokeball("Beast Ball");
        assert_eq!(ball.name, DEFAULT_POKEBALL);
        assert_eq!(ball.base_chance, 0.3);
    }

    #[test]
    fn master_ball_is_guaranteed() {
        assert!(get_pokeball("Master Bola").base_chance >= 1.0);
    }
}
