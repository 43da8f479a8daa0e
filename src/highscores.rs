//! High score leaderboard
//!
//! The leaderboard itself lives behind [`HighScoreStore`], which mirrors the
//! two operations of the remote score service (fetch the list, post a new
//! entry). [`HighScores`] is the in-process implementation; in the browser it
//! persists to LocalStorage.

use serde::{Deserialize, Serialize};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Display date, supplied by the host
    pub date: String,
    /// Player name
    pub name: String,
    /// Final score
    pub score: u64,
}

impl HighScoreEntry {
    pub fn new(name: impl Into<String>, score: u64, date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            name: name.into(),
            score,
        }
    }
}

/// Errors surfaced by a score store
#[derive(Debug, thiserror::Error)]
pub enum HighScoreError {
    #[error("High score service unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed high score payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The high score service as seen by the games
pub trait HighScoreStore {
    /// Current list, highest first, at most [`MAX_HIGH_SCORES`] entries
    fn get_high_scores(&mut self) -> Result<Vec<HighScoreEntry>, HighScoreError>;

    /// Submit an entry; returns the updated list
    fn post_high_score(
        &mut self,
        entry: HighScoreEntry,
    ) -> Result<Vec<HighScoreEntry>, HighScoreError>;
}

/// Whether `score` would enter `entries` (sorted or not)
///
/// While the list has free slots any positive score enters; once full the
/// score has to beat the lowest entry.
pub fn qualifies(entries: &[HighScoreEntry], score: u64) -> bool {
    if score == 0 {
        return false;
    }
    if entries.len() < MAX_HIGH_SCORES {
        return true;
    }
    entries.iter().map(|e| e.score).min().is_none_or(|low| score > low)
}

/// High score leaderboard (sorted descending by score)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "nebulon_tetris_highscores";

    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from an arbitrary list: sorted descending, trimmed to size
    pub fn from_entries(mut entries: Vec<HighScoreEntry>) -> Self {
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_HIGH_SCORES);
        Self { entries }
    }

    /// Parse the service's JSON array payload
    pub fn from_json(json: &str) -> Result<Self, HighScoreError> {
        let entries: Vec<HighScoreEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries))
    }

    pub fn to_json(&self) -> Result<String, HighScoreError> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        qualifies(&self.entries, score)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Add a new entry to the leaderboard (if it qualifies)
    ///
    /// A full board drops its lowest entry to make room. Returns the rank
    /// achieved (1-indexed) or None if the entry didn't qualify.
    pub fn add_score(&mut self, entry: HighScoreEntry) -> Option<usize> {
        if !self.qualifies(entry.score) {
            return None;
        }

        if self.entries.len() >= MAX_HIGH_SCORES {
            self.entries.pop();
        }

        // Find insertion point (sorted descending by score, ties keep age order)
        let pos = self.entries.iter().position(|e| entry.score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        Some(rank)
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Get the lowest score on the board (if any)
    pub fn lowest_score(&self) -> Option<u64> {
        self.entries.last().map(|e| e.score)
    }

    /// Load high scores from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(scores) = Self::from_json(&json) {
                    log::info!("Loaded {} high scores", scores.entries.len());
                    return scores;
                }
            }
        }

        log::info!("No high scores found, starting fresh");
        Self::new()
    }

    /// Save high scores to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("High scores saved ({} entries)", self.entries.len());
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

impl HighScoreStore for HighScores {
    fn get_high_scores(&mut self) -> Result<Vec<HighScoreEntry>, HighScoreError> {
        Ok(self.entries.clone())
    }

    fn post_high_score(
        &mut self,
        entry: HighScoreEntry,
    ) -> Result<Vec<HighScoreEntry>, HighScoreError> {
        let name = entry.name.clone();
        match self.add_score(entry) {
            Some(rank) => {
                log::info!("{} entered the high scores at rank {}", name, rank);
                self.save();
            }
            None => log::debug!("Score from {} did not qualify", name),
        }
        Ok(self.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_board(lowest: u64) -> HighScores {
        let entries = (0..MAX_HIGH_SCORES as u64)
            .map(|i| HighScoreEntry::new(format!("P{i}"), lowest + i * 100, "2024-01-01"))
            .collect();
        HighScores::from_entries(entries)
    }

    #[test]
    fn test_post_replaces_minimum() {
        let mut board = full_board(300);
        assert_eq!(board.lowest_score(), Some(300));

        let list = board
            .post_high_score(HighScoreEntry::new("NEW", 500, "2024-02-02"))
            .unwrap();
        assert_eq!(list.len(), MAX_HIGH_SCORES);
        assert!(list.iter().all(|e| e.score != 300));
        assert!(list.iter().any(|e| e.name == "NEW" && e.score == 500));
        assert!(list.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_post_below_minimum_leaves_list_unchanged() {
        let mut board = full_board(300);
        let before = board.entries.clone();

        let list = board
            .post_high_score(HighScoreEntry::new("LOW", 100, "2024-02-02"))
            .unwrap();
        assert_eq!(list, before);
    }

    #[test]
    fn test_rank_and_fill() {
        let mut board = HighScores::new();
        assert!(!board.qualifies(0));
        assert_eq!(board.add_score(HighScoreEntry::new("A", 100, "d")), Some(1));
        assert_eq!(board.add_score(HighScoreEntry::new("B", 300, "d")), Some(1));
        assert_eq!(board.add_score(HighScoreEntry::new("C", 200, "d")), Some(2));
        assert_eq!(board.top_score(), Some(300));
        assert_eq!(board.potential_rank(150), Some(3));
    }

    #[test]
    fn test_later_lower_score_never_evicts_higher() {
        let mut board = full_board(300);
        assert_eq!(board.add_score(HighScoreEntry::new("X", 1000, "d")), Some(4));
        // Only the true minimum is ever dropped
        assert!(board.entries.iter().any(|e| e.score == 400));
        assert_eq!(board.lowest_score(), Some(400));

        assert_eq!(board.add_score(HighScoreEntry::new("Y", 410, "d")), Some(10));
        assert!(board.entries.iter().any(|e| e.name == "X"));
        assert_eq!(board.lowest_score(), Some(410));
    }

    #[test]
    fn test_json_round_trip_sorts() {
        let json = r#"[
            {"date": "d1", "name": "low", "score": 10},
            {"date": "d2", "name": "high", "score": 90}
        ]"#;
        let board = HighScores::from_json(json).unwrap();
        assert_eq!(board.entries[0].name, "high");
        assert!(HighScores::from_json("{not json").is_err());
    }
}
