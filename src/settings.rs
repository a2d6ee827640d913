//! Simulation settings
//!
//! Loaded from JSON; every field has a default so partial files work.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::director::{SpawnWindow, default_schedule};

/// Difficulty presets
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

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "med" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Enemy hp multiplier
    pub fn hp_scale(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    /// Spawn interval multiplier (lower spawns faster)
    pub fn spawn_interval_scale(&self) -> f32 {
        match self {
            Difficulty::Easy => 1.3,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 0.7,
        }
    }
}

/// Why a settings file was rejected
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,

    // === Arena ===
    /// The arena spans [-extent, extent] on both axes
    pub world_half_extent: f32,
    /// Spatial index cell size
    pub grid_cell_size: f32,
    /// Enemies appear this far from the player
    pub spawn_radius: f32,
    /// Regular spawns are skipped at this many live enemies
    pub max_enemies: usize,

    // === Combat ===
    /// Seconds a tethered projectile survives without its owner
    pub orphan_grace: f32,
    /// Multiplier on area damage
    pub area_damage_factor: f32,

    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
    /// Ordered, non-overlapping spawn windows
    pub schedule: Vec<SpawnWindow>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,

            world_half_extent: WORLD_HALF_EXTENT,
            grid_cell_size: GRID_CELL_SIZE,
            spawn_radius: SPAWN_RADIUS,
            max_enemies: 300,

            orphan_grace: ORPHAN_GRACE,
            area_damage_factor: 1.0,

            seed: None,
            schedule: default_schedule(),
        }
    }
}

impl Settings {
    /// Parse and validate settings JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load settings, falling back to defaults when the file is missing or bad
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(err) => {
                log::warn!("Using default settings ({err})");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("world_half_extent", self.world_half_extent),
            ("grid_cell_size", self.grid_cell_size),
            ("spawn_radius", self.spawn_radius),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.orphan_grace.is_finite() && self.orphan_grace >= 0.0) {
            return Err(SettingsError::Invalid(format!(
                "orphan_grace must be non-negative, got {}",
                self.orphan_grace
            )));
        }
        if !(self.area_damage_factor.is_finite() && self.area_damage_factor >= 0.0) {
            return Err(SettingsError::Invalid(format!(
                "area_damage_factor must be non-negative, got {}",
                self.area_damage_factor
            )));
        }

        for (i, window) in self.schedule.iter().enumerate() {
            if !(window.interval.is_finite() && window.interval > 0.0) {
                return Err(SettingsError::Invalid(format!("window {i} interval must be positive")));
            }
            if !(window.start.is_finite() && window.end.is_finite() && window.start < window.end) {
                return Err(SettingsError::Invalid(format!("window {i} must start before it ends")));
            }
        }
        for (i, pair) in self.schedule.windows(2).enumerate() {
            if pair[1].start < pair[0].end {
                return Err(SettingsError::Invalid(format!(
                    "window {} overlaps or precedes window {i}",
                    i + 1
                )));
            }
        }
        Ok(())
    }
}
