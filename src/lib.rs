//! Nebulon & Tetris - two canvas arcade games
//!
//! Core modules:
//! - `sched`: Deterministic timed-action scheduler (virtual clock)
//! - `geom`: Rectangles, overlap and boundary tests
//! - `tetris`: Board, tetromino and game state machine
//! - `nebulon`: Entities, waves and the shooter state machine
//! - `render`: Drawing sink the games call into
//! - `input`: Key tables for both games
//! - `highscores`: Top-10 leaderboard behind a store trait
//! - `settings`: Tuning with difficulty presets
//! - `platform`: Browser canvas host (wasm32 only)

pub mod geom;
pub mod highscores;
pub mod input;
pub mod nebulon;
#[cfg(target_arch = "wasm32")]
pub mod platform;
pub mod render;
pub mod sched;
pub mod settings;
pub mod tetris;

pub use highscores::{HighScoreEntry, HighScoreError, HighScoreStore, HighScores};
pub use nebulon::NebulonGame;
pub use settings::{Difficulty, Settings};
pub use tetris::TetrisGame;

/// Host timing constants
pub mod consts {
    /// Nominal frame length at 60 Hz (ms)
    pub const FRAME_MS: u64 = 16;
    /// Longest frame the headless driver feeds in one step (ms)
    pub const MAX_FRAME_MS: u64 = 100;
}
