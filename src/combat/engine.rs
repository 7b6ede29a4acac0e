use rand::Rng;

use crate::combat::outcome::{AttackOutcome, CaptureOutcome};
use crate::combat::state::{Battle, BattleKind, BattleStatus, Turn};
use crate::pokeballs::Pokeball;
use crate::skills::Skill;

/// Capture chance is capped below certainty for every regular ball.
const CAPTURE_CHANCE_CAP: f64 = 0.95;
/// Flee succeeds 9 times out of 10.
const FLEE_CHANCE: f64 = 0.9;

/// Damage for one hit: base power scaled by attacker level, plus variance,
/// never below 1.
pub fn skill_damage(power: u32, attacker_level: u32, rng: &mut impl Rng) -> u32 {
    let level_multiplier = 1.0 + attacker_level as f64 / 10.0;
    let base = (power as f64 * level_multiplier).floor() as i64;
    let variance: i64 = rng.gen_range(-10..10);
    (base + variance).max(1) as u32
}

/// Pick the move to attack with: case-insensitive name match, falling back
/// to the first move both for unknown names and when no name was given.
pub fn select_skill<'a>(skills: &'a [Skill], name: Option<&str>) -> Option<&'a Skill> {
    match name {
        Some(wanted) => skills
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(wanted))
            .or_else(|| skills.first()),
        None => skills.first(),
    }
}

/// Resolve the player's attack. Preconditions (battle active, player's
/// turn, PP left) fail without mutating the battle; a successful attack
/// spends 1 PP, damages the opponent and either ends the battle
/// (`PlayerWon`, reward distribution is the caller's follow-up) or hands
/// the turn over.
pub fn resolve_player_attack(
    battle: &mut Battle,
    skills: &[Skill],
    skill_name: Option<&str>,
    rng: &mut impl Rng,
) -> AttackOutcome {
    if battle.status != BattleStatus::Active || battle.current_turn != Turn::Player {
        return AttackOutcome::failure("It's not your turn, or the battle is already over!");
    }

    let Some(skill) = select_skill(skills, skill_name) else {
        return AttackOutcome::failure(format!(
            "{} has no moves to attack with!",
            battle.player_pokemon.name
        ));
    };

    let current_pp = battle.pp_remaining(skill);
    if current_pp == 0 {
        let usable: Vec<&str> = skills
            .iter()
            .filter(|s| battle.pp_remaining(s) > 0)
            .map(|s| s.name.as_str())
            .collect();

        if usable.is_empty() {
            return AttackOutcome::failure(format!(
                "{} has no PP left on any move!",
                battle.player_pokemon.name
            ));
        }
        return AttackOutcome::failure(format!(
            "{} is out of PP! Moves still usable: {}",
            skill.name,
            usable.join(", ")
        ));
    }

    let pp_after = current_pp - 1;
    battle.skill_pp.insert(skill.name.clone(), pp_after);

    let damage = skill_damage(skill.power, battle.player_pokemon.level, rng);
    battle.opponent_pokemon.hp = battle.opponent_pokemon.hp.saturating_sub(damage);

    let mut message = format!(
        "{} used {} and dealt {} damage! (PP: {}/{})",
        battle.player_pokemon.name, skill.name, damage, pp_after, skill.pp
    );

    let battle_ended = battle.opponent_pokemon.hp == 0;
    if battle_ended {
        battle.status = BattleStatus::PlayerWon;
        message.push_str(&format!(
            "\n{} was defeated! You won!",
            battle.opponent_pokemon.name
        ));
    } else {
        battle.current_turn = Turn::Opponent;
        battle.turn_number += 1;
    }

    AttackOutcome {
        success: true,
        damage,
        skill: Some(skill.name.clone()),
        pp_remaining: Some(pp_after),
        message,
        battle_ended,
    }
}

/// Resolve the NPC's attack: a uniformly random move from its list, no PP
/// tracking on the opponent side. Off-turn calls are a silent no-op. The
/// turn number does not move here; only the player-attack path counts
/// turns.
pub fn resolve_opponent_attack(
    battle: &mut Battle,
    opponent_skills: &[Skill],
    rng: &mut impl Rng,
) -> AttackOutcome {
    if battle.status != BattleStatus::Active || battle.current_turn != Turn::Opponent {
        return AttackOutcome::noop();
    }

    let Some(skill) = opponent_skills.get(rng.gen_range(0..opponent_skills.len().max(1))) else {
        return AttackOutcome::noop();
    };

    let damage = skill_damage(skill.power, battle.opponent_pokemon.level, rng);
    battle.player_pokemon.hp = battle.player_pokemon.hp.saturating_sub(damage);

    let mut message = format!(
        "{} used {} and dealt {} damage!",
        battle.opponent_pokemon.name, skill.name, damage
    );

    let battle_ended = battle.player_pokemon.hp == 0;
    if battle_ended {
        battle.status = BattleStatus::OpponentWon;
        if !battle.defeated_pokemons.contains(&battle.pokemon_index) {
            battle.defeated_pokemons.push(battle.pokemon_index);
        }
        message.push_str(&format!(
            "\n{} was defeated! You lost!",
            battle.player_pokemon.name
        ));
    } else {
        battle.current_turn = Turn::Player;
    }

    AttackOutcome {
        success: true,
        damage,
        skill: Some(skill.name.clone()),
        pp_remaining: None,
        message,
        battle_ended,
    }
}

/// Roll a capture attempt against the battle's opponent. Inventory checks
/// and the roster append happen in the manager; this only decides the roll
/// and applies the battle-side transition. A base chance of 1.0 or more
/// always captures; everything else is capped at 95% even at 1 HP.
pub fn resolve_capture_roll(
    battle: &mut Battle,
    ball: &Pokeball,
    rng: &mut impl Rng,
) -> CaptureOutcome {
    debug_assert_eq!(battle.kind, BattleKind::Wild);

    let captured = if ball.base_chance >= 1.0 {
        true
    } else {
        let hp_ratio = battle.opponent_pokemon.hp as f64 / battle.opponent_pokemon.max_hp as f64;
        let chance = (ball.base_chance + (1.0 - hp_ratio) * 0.5).min(CAPTURE_CHANCE_CAP);
        rng.gen_bool(chance)
    };

    if captured {
        battle.status = BattleStatus::Finished;
        CaptureOutcome {
            success: true,
            rejected: false,
            message: format!(
                "Gotcha! You caught {} with a {}!",
                battle.opponent_pokemon.name, ball.name
            ),
            battle_ended: true,
        }
    } else {
        // Failed throws hand the turn over; the caller resolves the
        // opponent's counter-attack as a follow-up.
        battle.current_turn = Turn::Opponent;
        battle.turn_number += 1;
        CaptureOutcome::failure(format!(
            "{} broke free from the {}! The turn passes to the opponent.",
            battle.opponent_pokemon.name, ball.name
        ))
    }
}

/// Roll a flee attempt. On success the battle finishes; on failure the
/// turn passes to the opponent, whose counter-attack the manager resolves
/// within the same operation.
pub fn resolve_flee_roll(battle: &mut Battle, rng: &mut impl Rng) -> bool {
    let fled = rng.gen_bool(FLEE_CHANCE);
    if fled {
        battle.status = BattleStatus::Finished;
    } else {
        battle.current_turn = Turn::Opponent;
        battle.turn_number += 1;
    }
    fled
}
