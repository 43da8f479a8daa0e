//! Game settings
//!
//! Tuning for both games, passed to each game at construction. Persisted as
//! JSON in LocalStorage on the web.

use serde::{Deserialize, Serialize};

/// Errors while reading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Difficulty preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "norm" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Starting Tetris drop interval (ms)
    pub fn initial_drop_ms(&self) -> u64 {
        match self {
            Difficulty::Easy => 1000,
            Difficulty::Normal => 800,
            Difficulty::Hard => 500,
        }
    }

    /// Nebulon lives per game
    pub fn lives(&self) -> u32 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Normal => 3,
            Difficulty::Hard => 2,
        }
    }
}

/// Tetris tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetrisSettings {
    pub rows: usize,
    pub columns: usize,
    /// Drop interval at level 1 (ms)
    pub initial_drop_ms: u64,
    /// Interval decrease per level (ms)
    pub drop_step_ms: u64,
    /// The interval never goes below this (ms)
    pub min_drop_ms: u64,
    pub lines_to_level_up: u32,
    /// Base points for clearing 1, 2, 3 and 4 rows at once
    pub score_multipliers: [u64; 4],
}

impl Default for TetrisSettings {
    fn default() -> Self {
        Self {
            rows: 20,
            columns: 10,
            initial_drop_ms: 800,
            drop_step_ms: 50,
            min_drop_ms: 50,
            lines_to_level_up: 5,
            score_multipliers: [40, 100, 300, 1200],
        }
    }
}

/// Nebulon tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NebulonSettings {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub lives: u32,
    /// How long the "READY" screen stays up (ms)
    pub ready_ms: u64,
    /// Blink period of the ready label (ms)
    pub ready_blink_ms: u64,
    /// Pause between the player exploding and the next ready screen (ms)
    pub respawn_delay_ms: u64,
    /// Background scroll speed (units per second)
    pub scroll_speed: f32,
    /// Player displacement per movement step
    pub player_speed: f32,
    pub player_health: i32,
    pub player_fire_ms: u64,
    pub bombs_per_life: u32,
    /// Power meter capacity
    pub power_max: u32,
    /// Invincibility granted by a full power meter (ms)
    pub power_duration_ms: u64,
}

impl Default for NebulonSettings {
    fn default() -> Self {
        Self {
            canvas_width: 480.0,
            canvas_height: 640.0,
            lives: 3,
            ready_ms: 2000,
            ready_blink_ms: 250,
            respawn_delay_ms: 1500,
            scroll_speed: 40.0,
            player_speed: 4.0,
            player_health: 3,
            player_fire_ms: 250,
            bombs_per_life: 3,
            power_max: 100,
            power_duration_ms: 5000,
        }
    }
}

/// All settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,
    pub tetris: TetrisSettings,
    pub nebulon: NebulonSettings,
}

impl Settings {
    /// Create settings from a difficulty preset (applies preset defaults)
    pub fn from_preset(preset: Difficulty) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a difficulty preset (updates difficulty-dependent settings)
    pub fn apply_preset(&mut self, preset: Difficulty) {
        self.difficulty = preset;
        self.tetris.initial_drop_ms = preset.initial_drop_ms();
        self.nebulon.lives = preset.lives();
    }

    /// Reject values the games cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let t = &self.tetris;
        if t.rows < 4 || t.columns < 4 {
            return Err(SettingsError::Invalid(format!(
                "board {}x{} is too small",
                t.rows, t.columns
            )));
        }
        if t.lines_to_level_up == 0 {
            return Err(SettingsError::Invalid(
                "lines_to_level_up must be positive".to_string(),
            ));
        }
        if t.min_drop_ms == 0 || t.min_drop_ms > t.initial_drop_ms {
            return Err(SettingsError::Invalid(format!(
                "min_drop_ms {} must be in 1..={}",
                t.min_drop_ms, t.initial_drop_ms
            )));
        }
        let n = &self.nebulon;
        if n.canvas_width <= 0.0 || n.canvas_height <= 0.0 {
            return Err(SettingsError::Invalid("canvas must have area".to_string()));
        }
        if n.lives == 0 {
            return Err(SettingsError::Invalid("lives must be positive".to_string()));
        }
        Ok(())
    }

    /// Parse and validate settings JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "nebulon_tetris_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Settings::default().validate().is_ok());
        for preset in [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard] {
            assert!(Settings::from_preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str("norm"), Some(Difficulty::Normal));
        assert_eq!(Difficulty::from_str("nightmare"), None);
        assert_eq!(Difficulty::Easy.as_str(), "Easy");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{"nebulon": {"lives": 5}}"#).unwrap();
        assert_eq!(settings.nebulon.lives, 5);
        assert_eq!(settings.nebulon.ready_ms, NebulonSettings::default().ready_ms);
        assert_eq!(settings.tetris, TetrisSettings::default());
        assert_eq!(settings.difficulty, Difficulty::default());
    }

    #[test]
    fn test_json_round_trip_and_validation() {
        let settings = Settings::from_preset(Difficulty::Hard);
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);

        let mut bad = Settings::default();
        bad.tetris.lines_to_level_up = 0;
        let json = bad.to_json().unwrap();
        assert!(matches!(
            Settings::from_json(&json),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_json("42"),
            Err(SettingsError::Parse(_))
        ));
    }
}
