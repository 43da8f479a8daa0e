//! Keyboard mapping
//!
//! Hosts hand over raw `KeyboardEvent.key` identifiers; these tables turn them
//! into the discrete intents the games understand. Which intents act in which
//! state is decided by the games themselves.

use glam::Vec2;

/// Tetris intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrisIntent {
    Start,
    Pause,
    Resume,
    Retry,
    Quit,
    MoveLeft,
    MoveRight,
    MoveDown,
    Rotate,
    HardDrop,
}

impl TetrisIntent {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "Enter" => TetrisIntent::Start,
            "p" | "P" => TetrisIntent::Pause,
            "c" | "C" => TetrisIntent::Resume,
            "r" | "R" => TetrisIntent::Retry,
            "q" | "Q" | "Escape" => TetrisIntent::Quit,
            "ArrowLeft" | "a" | "A" => TetrisIntent::MoveLeft,
            "ArrowRight" | "d" | "D" => TetrisIntent::MoveRight,
            "ArrowDown" | "s" | "S" => TetrisIntent::MoveDown,
            "ArrowUp" | "w" | "W" => TetrisIntent::Rotate,
            " " => TetrisIntent::HardDrop,
            _ => return None,
        })
    }
}

/// Nebulon keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NebulonKey {
    Left,
    Right,
    Up,
    Down,
    Bomb,
    Power,
    Start,
}

impl NebulonKey {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "ArrowLeft" | "a" | "A" => NebulonKey::Left,
            "ArrowRight" | "d" | "D" => NebulonKey::Right,
            "ArrowUp" | "w" | "W" => NebulonKey::Up,
            "ArrowDown" | "s" | "S" => NebulonKey::Down,
            "z" | "Z" | " " => NebulonKey::Bomb,
            "x" | "X" => NebulonKey::Power,
            "Enter" => NebulonKey::Start,
            _ => return None,
        })
    }
}

/// Input snapshot for one Nebulon frame
///
/// Direction keys are held state; `bomb`, `power` and `start` are one-shot
/// and cleared by the host after the frame consumed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NebulonInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub bomb: bool,
    pub power: bool,
    pub start: bool,
}

impl NebulonInput {
    pub fn key_down(&mut self, key: NebulonKey) {
        match key {
            NebulonKey::Left => self.left = true,
            NebulonKey::Right => self.right = true,
            NebulonKey::Up => self.up = true,
            NebulonKey::Down => self.down = true,
            NebulonKey::Bomb => self.bomb = true,
            NebulonKey::Power => self.power = true,
            NebulonKey::Start => self.start = true,
        }
    }

    pub fn key_up(&mut self, key: NebulonKey) {
        match key {
            NebulonKey::Left => self.left = false,
            NebulonKey::Right => self.right = false,
            NebulonKey::Up => self.up = false,
            NebulonKey::Down => self.down = false,
            NebulonKey::Bomb | NebulonKey::Power | NebulonKey::Start => {}
        }
    }

    /// Unit-axis direction from the held keys (opposites cancel)
    pub fn direction(&self) -> Vec2 {
        let axis = |neg: bool, pos: bool| match (neg, pos) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        Vec2::new(axis(self.left, self.right), axis(self.up, self.down))
    }

    /// Clear one-shot inputs after processing
    pub fn clear_one_shots(&mut self) {
        self.bomb = false;
        self.power = false;
        self.start = false;
    }
}
