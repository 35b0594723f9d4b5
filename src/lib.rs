// src/lib.rs
pub mod app;
pub mod config;
pub mod data;
pub mod game;
pub mod pose;
pub mod pose_bridge;
pub mod render;
pub mod schedule;
pub mod session;
pub mod tracking;
pub mod ui;

pub use config::Config;
pub use game::{DrinkMachine, GameRules, GameState};
pub use session::GameSession;
