use crate::combat::BattleManager;
use crate::config::Config;
use crate::players::PlayerStore;
use crate::skills::SkillProvider;
use std::sync::Arc;

// Shared application state
pub struct AppState {
    pub config: Config,
    pub players: Arc<PlayerStore>,
    pub skills: Arc<SkillProvider>,
    pub battles: Arc<BattleManager>,
}

impl AppState {
    pub fn new(
        config: Config,
        players: Arc<PlayerStore>,
        skills: Arc<SkillProvider>,
    ) -> Arc<Self> {
        let battles = BattleManager::new(players.clone(), skills.clone());
        Arc::new(AppState {
            config,
            players,
            skills,
            battles,
        })
    }
}
