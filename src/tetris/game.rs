//! Tetris game state machine
//!
//! `Init -> Playing <-> Paused -> Over -> (NewHighScore) -> Init`.
//! The host calls [`TetrisGame::tick`] once per animation frame with the
//! elapsed time; the piece only falls when the drop timer fires, so the
//! simulation speed is independent of the frame rate.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::board::Board;
use super::piece::{LockOutcome, MoveOutcome, Tetromino};
use crate::geom::Rect;
use crate::highscores::{self, HighScoreEntry, HighScoreError, HighScoreStore};
use crate::input::TetrisIntent;
use crate::render::{Color, Renderer};
use crate::sched::{Scheduler, TimerHandle};
use crate::settings::TetrisSettings;

/// Size of one board cell in canvas units
pub const CELL_SIZE: f32 = 30.0;
/// Gap between the board and the sideboard
const SIDEBOARD_GAP: f32 = 20.0;
/// Longest name accepted on the high score board
pub const MAX_NAME_LEN: usize = 12;

/// Top-level game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TetrisPhase {
    /// Title screen, waiting for start
    Init,
    Playing,
    Paused,
    /// Game lost, score did not make the board
    Over,
    /// Game lost, waiting for the player's name
    NewHighScore,
}

/// Notifications for the host (sounds, name-entry surface, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TetrisEvent {
    Started,
    LinesCleared { rows: u32, points: u64 },
    LevelUp { level: u32 },
    GameOver { score: u64 },
    NewHighScore { score: u64 },
    ScoreSubmitted { rank: Option<usize> },
}

/// Score, lines and level; only ever grow until reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoring {
    pub level: u32,
    pub lines: u32,
    pub score: u64,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            level: 1,
            lines: 0,
            score: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TetrisTimer {
    Drop,
}

/// Drop interval for a level, clamped at the configured minimum
pub fn drop_interval_ms(settings: &TetrisSettings, level: u32) -> u64 {
    let step = settings
        .drop_step_ms
        .saturating_mul(u64::from(level.saturating_sub(1)));
    settings
        .initial_drop_ms
        .saturating_sub(step)
        .max(settings.min_drop_ms)
}

/// A complete Tetris game
pub struct TetrisGame {
    settings: TetrisSettings,
    phase: TetrisPhase,
    board: Board,
    current: Tetromino,
    next: Tetromino,
    scoring: Scoring,
    drop_ms: u64,
    sched: Scheduler<TetrisTimer>,
    drop_timer: Option<TimerHandle>,
    rng: Pcg32,
    store: Box<dyn HighScoreStore>,
    high_scores: Vec<HighScoreEntry>,
    events: Vec<TetrisEvent>,
}

impl TetrisGame {
    pub fn new(settings: TetrisSettings, store: Box<dyn HighScoreStore>, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let current = Tetromino::random(&mut rng);
        let next = Tetromino::random(&mut rng);
        let drop_ms = drop_interval_ms(&settings, 1);
        let board = Board::new(settings.rows, settings.columns);

        let mut game = Self {
            settings,
            phase: TetrisPhase::Init,
            board,
            current,
            next,
            scoring: Scoring::default(),
            drop_ms,
            sched: Scheduler::new(),
            drop_timer: None,
            rng,
            store,
            high_scores: Vec::new(),
            events: Vec::new(),
        };
        game.refresh_high_scores();
        game
    }

    pub fn phase(&self) -> TetrisPhase {
        self.phase
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mutable board access for setting up positions
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn current(&self) -> &Tetromino {
        &self.current
    }

    pub fn next(&self) -> &Tetromino {
        &self.next
    }

    pub fn scoring(&self) -> Scoring {
        self.scoring
    }

    /// Current drop interval (ms)
    pub fn drop_ms(&self) -> u64 {
        self.drop_ms
    }

    /// Cached high score list
    pub fn high_scores(&self) -> &[HighScoreEntry] {
        &self.high_scores
    }

    /// Take pending notifications
    pub fn drain_events(&mut self) -> Vec<TetrisEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance by one animation frame
    pub fn tick(&mut self, dt_ms: u64) {
        if self.phase != TetrisPhase::Playing {
            return;
        }

        self.sched.advance(dt_ms);
        while let Some(fired) = self.sched.pop_due() {
            match fired.action {
                TetrisTimer::Drop => self.drop_step(),
            }
            // A drop may have ended the game
            if self.phase != TetrisPhase::Playing {
                break;
            }
        }
    }

    /// Apply a player intent; intents that make no sense in the current
    /// phase are ignored.
    pub fn handle_intent(&mut self, intent: TetrisIntent) {
        match (self.phase, intent) {
            (TetrisPhase::Init, TetrisIntent::Start) => self.start(),

            (TetrisPhase::Playing, TetrisIntent::Pause) => {
                self.phase = TetrisPhase::Paused;
                log::info!("Paused");
            }
            (TetrisPhase::Playing, TetrisIntent::MoveLeft) => {
                self.current.move_by(&self.board, -1, 0);
            }
            (TetrisPhase::Playing, TetrisIntent::MoveRight) => {
                self.current.move_by(&self.board, 1, 0);
            }
            (TetrisPhase::Playing, TetrisIntent::MoveDown) => self.drop_step(),
            (TetrisPhase::Playing, TetrisIntent::Rotate) => {
                self.current.rotate(&self.board);
            }
            (TetrisPhase::Playing, TetrisIntent::HardDrop) => {
                self.current.hard_drop(&self.board);
                self.settle();
            }

            (TetrisPhase::Paused, TetrisIntent::Resume) => {
                self.phase = TetrisPhase::Playing;
                log::info!("Resumed");
            }
            (TetrisPhase::Paused | TetrisPhase::Over, TetrisIntent::Retry) => self.start(),
            (
                TetrisPhase::Paused | TetrisPhase::Over | TetrisPhase::NewHighScore,
                TetrisIntent::Quit,
            ) => self.quit(),

            _ => {}
        }
    }

    /// Begin (or restart) a game
    pub fn start(&mut self) {
        self.reset();
        self.drop_timer = Some(self.sched.schedule(self.drop_ms, TetrisTimer::Drop));
        self.phase = TetrisPhase::Playing;
        self.events.push(TetrisEvent::Started);
        log::info!("Tetris started (drop interval {} ms)", self.drop_ms);
    }

    /// Back to the title screen
    pub fn quit(&mut self) {
        self.reset();
        self.phase = TetrisPhase::Init;
        log::info!("Returned to title");
    }

    fn reset(&mut self) {
        self.sched.clear();
        self.drop_timer = None;
        self.board.reset();
        self.scoring = Scoring::default();
        self.drop_ms = drop_interval_ms(&self.settings, 1);
        self.current = Tetromino::random(&mut self.rng);
        self.next = Tetromino::random(&mut self.rng);
    }

    /// Move the current piece down one row, settling it if that locks it
    fn drop_step(&mut self) {
        if self.current.move_by(&self.board, 0, 1) == MoveOutcome::Locked {
            self.settle();
        }
    }

    /// Lock the current piece, then promote the next one and score
    fn settle(&mut self) {
        if !self.current.is_locked {
            return;
        }
        match self.current.lock(&mut self.board) {
            LockOutcome::Overflow => self.over(),
            LockOutcome::Stamped => {
                self.promote();
                self.handle_on_score();
            }
            LockOutcome::NotLocked => {}
        }
    }

    fn promote(&mut self) {
        let fresh = Tetromino::random(&mut self.rng);
        self.current = std::mem::replace(&mut self.next, fresh);
    }

    /// Clear full rows and update score, lines and level.
    /// Returns the number of rows cleared.
    pub fn handle_on_score(&mut self) -> u32 {
        let full = self.board.find_full_rows();
        if full.is_empty() {
            return 0;
        }
        self.board.remove_full_rows(&full);
        self.board.insert_empty_rows(full.len());

        let rows = full.len() as u32;
        let index = (full.len().min(self.settings.score_multipliers.len())) - 1;
        let points = self.settings.score_multipliers[index] * u64::from(self.scoring.level);
        self.scoring.score += points;
        self.scoring.lines += rows;
        self.events.push(TetrisEvent::LinesCleared { rows, points });
        log::debug!("Cleared {} rows for {} points", rows, points);

        let level = 1 + self.scoring.lines / self.settings.lines_to_level_up;
        if level > self.scoring.level {
            self.scoring.level = level;
            self.drop_ms = drop_interval_ms(&self.settings, level);
            self.restart_drop_timer();
            self.events.push(TetrisEvent::LevelUp { level });
            log::info!("Level {} (drop interval {} ms)", level, self.drop_ms);
        }
        rows
    }

    fn restart_drop_timer(&mut self) {
        if self.phase != TetrisPhase::Playing {
            return;
        }
        self.sched.cancel_slot(&mut self.drop_timer);
        self.drop_timer = Some(self.sched.schedule(self.drop_ms, TetrisTimer::Drop));
    }

    /// End the game and decide whether the score makes the board
    fn over(&mut self) {
        self.sched.cancel_slot(&mut self.drop_timer);
        self.refresh_high_scores();

        let score = self.scoring.score;
        if highscores::qualifies(&self.high_scores, score) {
            self.phase = TetrisPhase::NewHighScore;
            self.events.push(TetrisEvent::NewHighScore { score });
            log::info!("Game over with new high score {}", score);
        } else {
            self.phase = TetrisPhase::Over;
            self.events.push(TetrisEvent::GameOver { score });
            log::info!("Game over with score {}", score);
        }
    }

    /// Fetch the list from the store, keeping the cached one on failure
    pub fn refresh_high_scores(&mut self) {
        match self.store.get_high_scores() {
            Ok(list) => self.high_scores = list,
            Err(e) => log::warn!("Keeping cached high scores: {}", e),
        }
    }

    /// Submit the player's name for the pending high score.
    ///
    /// The game returns to the title screen whether or not the store
    /// accepted the entry; a store failure is handed back to the caller.
    pub fn submit_name(&mut self, name: &str, date: &str) -> Result<(), HighScoreError> {
        if self.phase != TetrisPhase::NewHighScore {
            return Ok(());
        }

        let trimmed: String = name.trim().chars().take(MAX_NAME_LEN).collect();
        let name = if trimmed.is_empty() {
            "???".to_string()
        } else {
            trimmed
        };
        let score = self.scoring.score;
        let entry = HighScoreEntry::new(name, score, date);

        let result = self.store.post_high_score(entry.clone());
        self.quit();

        match result {
            Ok(list) => {
                // Equal scores keep age order, so the newest match is ours
                let rank = list.iter().rposition(|e| *e == entry).map(|i| i + 1);
                self.high_scores = list;
                self.events.push(TetrisEvent::ScoreSubmitted { rank });
                Ok(())
            }
            Err(e) => {
                log::warn!("High score submission failed: {}", e);
                Err(e)
            }
        }
    }

    /// Draw the whole frame
    pub fn render(&self, renderer: &mut dyn Renderer) {
        let board_w = self.board.columns() as f32 * CELL_SIZE;
        let board_h = self.board.rows() as f32 * CELL_SIZE;
        renderer.clear(Color::Background);

        self.board.draw(renderer, Vec2::ZERO, CELL_SIZE);
        if matches!(self.phase, TetrisPhase::Playing | TetrisPhase::Paused) {
            self.current.draw(renderer, Vec2::ZERO, CELL_SIZE);
        }

        self.render_sideboard(renderer, Vec2::new(board_w + SIDEBOARD_GAP, 0.0));

        let center = Vec2::new(board_w / 2.0, board_h / 2.0);
        match self.phase {
            TetrisPhase::Init => {
                renderer.draw_text("PRESS ENTER", center, 24.0, Color::Text);
                self.render_high_scoreboard(renderer, Vec2::new(center.x, center.y + 40.0));
            }
            TetrisPhase::Paused => {
                renderer.draw_text("PAUSED", center, 24.0, Color::Highlight);
            }
            TetrisPhase::Over => {
                renderer.draw_text("GAME OVER", center, 24.0, Color::Red);
                self.render_high_scoreboard(renderer, Vec2::new(center.x, center.y + 40.0));
            }
            TetrisPhase::NewHighScore => {
                renderer.draw_text("NEW HIGH SCORE!", center, 24.0, Color::Highlight);
            }
            TetrisPhase::Playing => {}
        }
    }

    /// Next piece, score, lines and level
    fn render_sideboard(&self, renderer: &mut dyn Renderer, origin: Vec2) {
        let preview = CELL_SIZE * 0.75;
        renderer.draw_text("NEXT", origin, 18.0, Color::Text);
        renderer.stroke_rect(
            Rect::new(origin.x, origin.y + 24.0, preview * 4.0, preview * 4.0),
            Color::Dim,
        );
        self.next
            .draw_preview(renderer, Vec2::new(origin.x, origin.y + 24.0), preview);

        let mut y = origin.y + 24.0 + preview * 4.0 + 30.0;
        for (label, value) in [
            ("SCORE", self.scoring.score.to_string()),
            ("LINES", self.scoring.lines.to_string()),
            ("LEVEL", self.scoring.level.to_string()),
        ] {
            renderer.draw_text(label, Vec2::new(origin.x, y), 16.0, Color::Dim);
            renderer.draw_text(&value, Vec2::new(origin.x, y + 20.0), 20.0, Color::Text);
            y += 56.0;
        }
    }

    fn render_high_scoreboard(&self, renderer: &mut dyn Renderer, origin: Vec2) {
        if self.high_scores.is_empty() {
            renderer.draw_text("NO HIGH SCORES", origin, 16.0, Color::Dim);
            return;
        }
        for (i, entry) in self.high_scores.iter().enumerate() {
            let line = format!("{:>2}. {:<12} {:>7}", i + 1, entry.name, entry.score);
            renderer.draw_text(
                &line,
                Vec2::new(origin.x, origin.y + i as f32 * 18.0),
                14.0,
                Color::Text,
            );
        }
    }
}
