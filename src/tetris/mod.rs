//! Tetris
//!
//! - `board`: the fixed-size grid and line clearing
//! - `piece`: tetromino shape tables, movement, rotation and locking
//! - `game`: state machine, scoring and leveling

pub mod board;
pub mod game;
pub mod piece;

pub use board::{Board, Cell};
pub use game::{Scoring, TetrisEvent, TetrisGame, TetrisPhase, drop_interval_ms};
pub use piece::{LockOutcome, MoveOutcome, Position, Shape, Tetromino};
