//! Shared domain types for the Gambit project.

pub mod color;
pub mod config;
pub mod events;
pub mod game;
pub mod matchmaking;
pub mod time_control;

mod errors;

pub use errors::{GambitError, Result};
