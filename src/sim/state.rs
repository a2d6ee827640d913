//! Simulation context
//!
//! Everything one run needs lives in [`GameState`]: the entity store, the
//! spatial index, the director, the RNG and the outgoing event buffer. There
//! is no global state, so any number of simulations can run side by side.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::director::Director;
use super::entities::{ActiveWeapon, Collectible, Enemy, EnemyKind, EntityStore, Player, TailSegment, XpGem};
use super::progression::LevelUpChoice;
use super::projectile::{Area, Projectile};
use super::spatial::SpatialIndex;
use super::weapons::{Element, WeaponKind};
use crate::settings::Settings;

/// Weapon every run starts with
pub const STARTING_WEAPON: WeaponKind = WeaponKind::MagicWand;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Waiting for a level-up choice
    LevelUp,
    /// Run ended
    GameOver,
}

/// Fire-and-forget notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    DamageNumber { pos: Vec2, amount: f32, element: Element },
    ImpactVfx { pos: Vec2, element: Element },
    DeathVfx { pos: Vec2, kind: EnemyKind },
    EnemyKilled { id: u32, kind: EnemyKind },
    BossSpawned { id: u32 },
    PlayerHurt { amount: f32 },
    LevelUp { level: u32 },
    SegmentMerged { kind: WeaponKind, tier: u8 },
    PlayerRevived,
    GameOver,
}

/// Complete simulation state for one run
#[derive(Debug, Clone)]
pub struct GameState {
    pub settings: Settings,
    /// Run seed for reproducibility
    pub seed: u64,
    pub phase: GamePhase,
    /// Simulated seconds since the run started (frozen while paused)
    pub time: f32,
    pub score: u64,
    pub kills: u32,
    pub entities: EntityStore,
    /// Enemy positions as of the last rebuild
    pub index: SpatialIndex,
    pub director: Director,
    /// Choices on offer while in `LevelUp`
    pub level_up_choices: Vec<LevelUpChoice>,
    /// Level-ups earned but not yet offered
    pub pending_level_ups: u32,
    pub(crate) events: Vec<SimEvent>,
    pub(crate) rng: Pcg32,
}

impl GameState {
    /// Create a new run from `settings`
    pub fn new(settings: Settings) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let director = Director::new(settings.schedule.clone(), settings.difficulty.spawn_interval_scale());
        let index = SpatialIndex::new(settings.grid_cell_size);
        let mut state = Self {
            settings,
            seed,
            phase: GamePhase::Playing,
            time: 0.0,
            score: 0,
            kills: 0,
            entities: EntityStore::new(Vec2::ZERO),
            index,
            director,
            level_up_choices: Vec::new(),
            pending_level_ups: 0,
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
        };
        state.reset();
        state
    }

    /// Start a fresh run with the same settings and seed
    pub fn reset(&mut self) {
        self.phase = GamePhase::Playing;
        self.time = 0.0;
        self.score = 0;
        self.kills = 0;
        self.entities = EntityStore::new(Vec2::ZERO);
        self.entities.player.weapons.push(ActiveWeapon::new(STARTING_WEAPON));
        self.index.clear();
        self.director.reset();
        self.level_up_choices.clear();
        self.pending_level_ups = 0;
        self.events.clear();
        self.rng = Pcg32::seed_from_u64(self.seed);
        log::info!("New run (seed {})", self.seed);
    }

    /// Hand buffered events to the caller
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    #[inline]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn player(&self) -> &Player {
        &self.entities.player
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.entities.enemies
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.entities.projectiles
    }

    pub fn areas(&self) -> &[Area] {
        &self.entities.areas
    }

    pub fn collectibles(&self) -> &[Collectible] {
        &self.entities.collectibles
    }

    pub fn gems(&self) -> &[XpGem] {
        &self.entities.gems
    }

    pub fn tail(&self) -> &[TailSegment] {
        &self.entities.tail
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[inline]
    pub fn gold(&self) -> u64 {
        self.entities.player.stats.gold
    }

    /// Elapsed play time in seconds
    #[inline]
    pub fn play_time(&self) -> f32 {
        self.director.play_time()
    }

    #[inline]
    pub fn is_level_up_pending(&self) -> bool {
        self.phase == GamePhase::LevelUp
    }

    pub fn level_up_choices(&self) -> &[LevelUpChoice] {
        &self.level_up_choices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Settings {
        Settings {
            seed: Some(7),
            ..Settings::default()
        }
    }

    #[test]
    fn test_new_run_has_starting_weapon() {
        let state = GameState::new(seeded());
        assert_eq!(state.phase(), GamePhase::Playing);
        assert_eq!(state.player().weapons.len(), 1);
        assert_eq!(state.player().weapons[0].kind, STARTING_WEAPON);
        assert!(state.enemies().is_empty());
        assert_eq!(state.play_time(), 0.0);
    }

    #[test]
    fn test_reset_clears_progress() {
        let mut state = GameState::new(seeded());
        state.score = 500;
        state.entities.spawn_enemy(EnemyKind::Basic, Vec2::ZERO, 1.0);
        state.events.push(SimEvent::GameOver);
        state.phase = GamePhase::GameOver;

        state.reset();
        assert_eq!(state.score(), 0);
        assert!(state.enemies().is_empty());
        assert!(state.drain_events().is_empty());
        assert_eq!(state.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_drain_empties_buffer() {
        let mut state = GameState::new(seeded());
        state.events.push(SimEvent::PlayerRevived);
        assert_eq!(state.drain_events(), vec![SimEvent::PlayerRevived]);
        assert!(state.drain_events().is_empty());
    }
}
