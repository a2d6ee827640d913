//! Tailstorm simulation core
//!
//! `GameState` owns every entity; `tick` advances it by a fixed `dt` in a
//! strict phase order. Randomness comes from the run's seeded `Pcg32`.
//! The spatial grid is walked in cell order and callers sort candidate ids
//! before acting on them, so a seed and a `dt` replay the same run.
//! Nothing in here renders, reads input devices or touches the clock.

pub mod behavior;
pub mod combat;
pub mod director;
pub mod entities;
pub mod merge;
pub mod progression;
pub mod projectile;
pub mod spatial;
pub mod state;
pub mod stats;
pub mod status;
pub mod tick;
pub mod weapons;

pub use director::{Director, SpawnWindow, default_schedule};
pub use entities::{
    ActiveWeapon, Collectible, CollectibleKind, Enemy, EnemyKind, EntityStore, Player, Stats, TailSegment, XpGem,
};
pub use merge::{Merge, evolution, find_merge, synergy};
pub use progression::LevelUpChoice;
pub use projectile::{Area, AreaBehavior, Projectile, ProjectileBehavior};
pub use spatial::SpatialIndex;
pub use state::{GamePhase, GameState, STARTING_WEAPON, SimEvent};
pub use status::{StatusEffect, StatusKind};
pub use tick::{TickInput, tick};
pub use weapons::{Element, PassiveKind, WeaponKind, WeaponStats};
