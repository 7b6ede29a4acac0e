use std::sync::Arc;

use pokebot_server::combat::{
    BattleKind, BattleManager, BattleStatus, PokemonChoice, StartOutcome, Turn,
};
use pokebot_server::players::{OwnedPokemon, PlayerStore};
use pokebot_server::skills::SkillProvider;

fn manager_with_store() -> (Arc<BattleManager>, Arc<PlayerStore>) {
    let players = PlayerStore::in_memory();
    let skills = SkillProvider::offline();
    let manager = BattleManager::new(players.clone(), skills);
    (manager, players)
}

#[tokio::test]
async fn start_requires_a_roster() {
    let (manager, _players) = manager_with_store();

    let outcome = manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();

    assert!(matches!(outcome, StartOutcome::NoPokemon));
}

#[tokio::test]
async fn only_one_battle_per_player() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 40, 5))
        .await
        .unwrap();

    let first = manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();
    assert!(matches!(first, StartOutcome::Started(_)));

    let second = manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();
    assert!(matches!(second, StartOutcome::AlreadyInBattle));
}

#[tokio::test]
async fn multiple_pokemon_require_a_choice() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 40, 5))
        .await
        .unwrap();
    players
        .give_pokemon("ash", OwnedPokemon::new("Squirtle", 44, 3))
        .await
        .unwrap();

    let outcome = manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();

    match outcome {
        StartOutcome::MustChoose(listings) => {
            assert_eq!(listings.len(), 2);
            assert_eq!(listings[0].name, "Pikachu");
            assert_eq!(listings[1].name, "Squirtle");
        }
        other => panic!("expected MustChoose, got {:?}", other),
    }

    // No battle was created, so the next start is still allowed.
    let retry = manager
        .start_battle("ash", PokemonChoice::ByName("pikachu".to_string()), Some(BattleKind::Wild))
        .await
        .unwrap();
    assert!(matches!(retry, StartOutcome::Started(_)));
}

#[tokio::test]
async fn unknown_pokemon_name_is_rejected() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 40, 5))
        .await
        .unwrap();

    let outcome = manager
        .start_battle(
            "ash",
            PokemonChoice::ByName("Mewtwo".to_string()),
            Some(BattleKind::Wild),
        )
        .await
        .unwrap();

    assert!(matches!(outcome, StartOutcome::UnknownPokemon(name) if name == "Mewtwo"));
}

#[tokio::test]
async fn battle_runs_to_completion_and_pays_xp() {
    let (manager, players) = manager_with_store();
    // Level 50 one-shots any generated opponent, so the player always wins.
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 200, 50))
        .await
        .unwrap();

    let started = manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();
    let battle = match started {
        StartOutcome::Started(battle) => battle,
        other => panic!("expected Started, got {:?}", other),
    };
    assert_eq!(battle.status, BattleStatus::Active);
    assert_eq!(battle.current_turn, Turn::Player);
    let reward = battle.xp_reward;
    assert!(reward > 0);

    let mut ended = false;
    for _ in 0..200 {
        let outcome = manager.player_attack("ash", None).await.unwrap();
        assert!(outcome.success);
        if outcome.battle_ended {
            ended = true;
            break;
        }
        let counter = manager.opponent_attack("ash").await.unwrap();
        if counter.battle_ended {
            ended = true;
            break;
        }
    }
    assert!(ended, "battle never reached a terminal state");
    assert!(manager.snapshot("ash").await.is_none());

    let player = players.get_player("ash").await.unwrap().unwrap();
    assert_eq!(player.xp, reward);
    assert_eq!(player.pokemons[0].xp, reward);
}

#[tokio::test]
async fn capture_without_pokeballs_changes_nothing() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 40, 5))
        .await
        .unwrap();

    manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();
    let before = manager.snapshot("ash").await.unwrap();

    let outcome = manager.attempt_capture("ash", None).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.rejected);
    assert!(!outcome.battle_ended);
    assert!(outcome.message.contains("no pokéballs"));

    let after = manager.snapshot("ash").await.unwrap();
    assert_eq!(after.status, BattleStatus::Active);
    assert_eq!(after.current_turn, before.current_turn);
    assert_eq!(after.turn_number, before.turn_number);

    let player = players.get_player("ash").await.unwrap().unwrap();
    assert_eq!(player.pokemons.len(), 1);
}

#[tokio::test]
async fn master_ball_always_captures() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 40, 5))
        .await
        .unwrap();
    players
        .give_pokeballs("ash", Some("Master Bola"), 1)
        .await
        .unwrap();

    manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();
    let battle = manager.snapshot("ash").await.unwrap();
    let caught_name = battle.opponent_pokemon.name.clone();
    let caught_max_hp = battle.opponent_pokemon.max_hp;

    let outcome = manager.attempt_capture("ash", Some("Master Bola")).await.unwrap();
    assert!(outcome.success);
    assert!(outcome.battle_ended);
    assert!(manager.snapshot("ash").await.is_none());

    let player = players.get_player("ash").await.unwrap().unwrap();
    assert_eq!(player.pokemons.len(), 2);
    let caught = &player.pokemons[1];
    assert_eq!(caught.name, caught_name);
    // Captured Pokémon join the roster at full HP regardless of battle damage.
    assert_eq!(caught.hp, caught_max_hp);
    assert_eq!(player.pokeball_count("Master Bola"), 0);
}

#[tokio::test]
async fn capture_is_refused_in_trainer_battles() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 40, 5))
        .await
        .unwrap();
    players
        .give_pokeballs("ash", Some("Master Bola"), 1)
        .await
        .unwrap();

    manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Trainer))
        .await
        .unwrap();

    let outcome = manager.attempt_capture("ash", Some("Master Bola")).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.rejected);
    assert!(!outcome.battle_ended);

    // The ball is only spent on an actual throw.
    let player = players.get_player("ash").await.unwrap().unwrap();
    assert_eq!(player.pokeball_count("Master Bola"), 1);
}

#[tokio::test]
async fn store_failure_after_victory_frees_the_battle_slot() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 200, 50))
        .await
        .unwrap();

    manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();

    // Level 50 one-shots any generated opponent, so the first attack wins
    // and triggers the reward write against the dead store.
    players.fail_writes(true);
    let result = manager.player_attack("ash", None).await;
    assert!(result.is_err());

    // The finished battle must not stay registered.
    assert!(manager.snapshot("ash").await.is_none());

    players.fail_writes(false);
    let retry = manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();
    assert!(matches!(retry, StartOutcome::Started(_)));
}

#[tokio::test]
async fn store_failure_during_capture_leaves_state_unchanged() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 40, 5))
        .await
        .unwrap();
    players
        .give_pokeballs("ash", Some("Master Bola"), 1)
        .await
        .unwrap();

    manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();
    let before = manager.snapshot("ash").await.unwrap();

    players.fail_writes(true);
    let result = manager.attempt_capture("ash", Some("Master Bola")).await;
    assert!(result.is_err());

    // Battle untouched, ball unspent, roster unchanged.
    let after = manager.snapshot("ash").await.unwrap();
    assert_eq!(after.status, BattleStatus::Active);
    assert_eq!(after.current_turn, before.current_turn);
    assert_eq!(after.turn_number, before.turn_number);
    let player = players.get_player("ash").await.unwrap().unwrap();
    assert_eq!(player.pokeball_count("Master Bola"), 1);
    assert_eq!(player.pokemons.len(), 1);

    // With the store back, the same throw goes through.
    players.fail_writes(false);
    let outcome = manager.attempt_capture("ash", Some("Master Bola")).await.unwrap();
    assert!(outcome.success);
    assert!(manager.snapshot("ash").await.is_none());
}

#[tokio::test]
async fn capture_is_refused_off_turn() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 500, 1))
        .await
        .unwrap();
    players
        .give_pokeballs("ash", Some("Master Bola"), 1)
        .await
        .unwrap();

    // A level 1 attacker rarely one-shots; retry until a battle survives
    // the opening attack, leaving the turn with the opponent.
    let mut checked = false;
    for _ in 0..50 {
        manager
            .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
            .await
            .unwrap();
        let outcome = manager.player_attack("ash", None).await.unwrap();
        if outcome.battle_ended {
            continue;
        }

        let throw = manager.attempt_capture("ash", Some("Master Bola")).await.unwrap();
        assert!(!throw.success);
        assert!(throw.rejected);
        assert!(throw.message.contains("turn"));

        let battle = manager.snapshot("ash").await.unwrap();
        assert_eq!(battle.current_turn, Turn::Opponent);
        let player = players.get_player("ash").await.unwrap().unwrap();
        assert_eq!(player.pokeball_count("Master Bola"), 1);
        checked = true;
        break;
    }
    assert!(checked, "every opening attack knocked the opponent out");
}

#[tokio::test]
async fn switch_validates_the_target_slot() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 40, 5))
        .await
        .unwrap();
    players
        .give_pokemon("ash", OwnedPokemon::new("Squirtle", 44, 3))
        .await
        .unwrap();

    manager
        .start_battle("ash", PokemonChoice::ByIndex(0), Some(BattleKind::Wild))
        .await
        .unwrap();

    let bad = manager.switch_pokemon("ash", 5).await.unwrap();
    assert!(!bad.success);

    let good = manager.switch_pokemon("ash", 1).await.unwrap();
    assert!(good.success);
    let battle = manager.snapshot("ash").await.unwrap();
    assert_eq!(battle.player_pokemon.name, "Squirtle");
    assert_eq!(battle.pokemon_index, 1);
}

#[tokio::test]
async fn flee_eventually_resolves_the_battle_or_counterattacks() {
    let (manager, players) = manager_with_store();
    players
        .give_pokemon("ash", OwnedPokemon::new("Pikachu", 400, 5))
        .await
        .unwrap();

    manager
        .start_battle("ash", PokemonChoice::Unspecified, Some(BattleKind::Wild))
        .await
        .unwrap();

    // 90% odds per attempt; 200 attempts failing is effectively impossible,
    // and a failed roll must come back with the opponent's counter-attack.
    let mut escaped = false;
    for _ in 0..200 {
        let outcome = manager.attempt_flee("ash").await.unwrap();
        if outcome.success {
            assert!(outcome.battle_ended);
            escaped = true;
            break;
        }
        assert!(outcome.opponent_attack.is_some());
        if outcome.battle_ended {
            break;
        }
        let battle = manager.snapshot("ash").await.unwrap();
        assert_eq!(battle.current_turn, Turn::Player);
    }
    assert!(escaped || manager.snapshot("ash").await.is_none());
}
