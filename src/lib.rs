//! Tailstorm - arena survival with a weapon-bearing tail
//!
//! Core modules:
//! - `sim`: Simulation core (entities, behaviors, combat, spawning)
//! - `settings`: Data-driven simulation configuration
//!
//! World space uses screen orientation: +x right, +y down.

pub mod settings;
pub mod sim;

pub use settings::{Difficulty, Settings, SettingsError};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one tick per rendered frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Half-size of the square arena (world spans [-extent, extent] on both axes)
    pub const WORLD_HALF_EXTENT: f32 = 2000.0;
    /// Projectiles this far outside the arena are discarded
    pub const OUT_OF_BOUNDS_MARGIN: f32 = 200.0;

    /// Spatial index cell size
    pub const GRID_CELL_SIZE: f32 = 500.0;
    /// Largest enemy radius; pads index queries so big bodies are not missed
    pub const MAX_ENEMY_RADIUS: f32 = 48.0;

    /// Distance from the player at which enemies appear
    pub const SPAWN_RADIUS: f32 = 900.0;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 16.0;
    pub const PLAYER_BASE_SPEED: f32 = 200.0;
    pub const PLAYER_BASE_HP: f32 = 100.0;
    pub const PLAYER_PICKUP_RANGE: f32 = 90.0;
    /// Invulnerability after taking contact damage (seconds)
    pub const PLAYER_IFRAMES: f32 = 0.5;

    /// Tail segments keep this distance from their leader
    pub const SEGMENT_SPACING: f32 = 36.0;
    pub const SEGMENT_RADIUS: f32 = 12.0;
    /// Highest tier a segment can be promoted to
    pub const MAX_TIER: u8 = 3;

    /// Tethered projectiles survive this long without an owner (seconds)
    pub const ORPHAN_GRACE: f32 = 0.5;

    /// Shortest interval any weapon may fire at (seconds)
    pub const MIN_FIRE_INTERVAL: f32 = 0.05;

    /// Movement multiplier while frozen
    pub const FREEZE_SPEED_FACTOR: f32 = 0.3;

    pub const MAX_WEAPON_LEVEL: u8 = 8;
    pub const MAX_PASSIVE_LEVEL: u8 = 5;
    pub const MAX_WEAPONS: usize = 6;
    pub const MAX_PASSIVES: usize = 6;
    pub const LEVEL_UP_CHOICES: usize = 3;

    /// XP gems home in at this speed once attracted
    pub const GEM_SPEED: f32 = 420.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Heading of a vector in radians
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Turn `current` toward `target` by at most `max_delta` radians
pub fn rotate_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = normalize_angle(target - current);
    normalize_angle(current + delta.clamp(-max_delta, max_delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-4);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-6);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
    }

    #[test]
    fn test_rotate_toward_clamps_turn() {
        let turned = rotate_toward(0.0, PI / 2.0, 0.1);
        assert!((turned - 0.1).abs() < 1e-6);

        // Shortest way round crosses the ±π seam
        let turned = rotate_toward(PI - 0.05, -PI + 0.05, 1.0);
        assert!((normalize_angle(turned - (-PI + 0.05))).abs() < 1e-4);
    }
}
