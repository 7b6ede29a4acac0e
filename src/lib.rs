// Re-export modules for external use
pub mod app_state;
pub mod combat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod players;
pub mod pokeapi;
pub mod pokeballs;
pub mod skills;
