//! Projectile and area state machines
//!
//! One update function per behavior, grouped by family:
//! - [`ballistic`]: straight, gravity and edge-bouncing motion, returners, thrown bottles
//! - [`homing`]: target-seeking patterns (homing, bat, chakram, gravity orb, chain)
//! - [`tether`]: owner-relative orbit, stab and dash-and-chain machines
//! - [`continuous`]: beams and flame particles
//! - [`area`]: persistent zones
//!
//! Behaviors read the world through a [`BehaviorCtx`] and never touch enemies
//! directly; damage they decide on is returned as [`Strike`]s and applied by
//! the combat pass. Time advances only through `dt`, except tether phase which
//! reads the shared simulation clock so sibling orbiters stay evenly spaced.

pub mod area;
pub mod ballistic;
pub mod continuous;
pub mod homing;
pub mod tether;

use glam::Vec2;

use super::entities::{EnemyLookup, WorldView};
use super::projectile::{Area, Projectile, ProjectileBehavior, StatusPayload};
use super::spatial::SpatialIndex;
use super::weapons::Element;

pub use area::update_area;

/// Per-behavior tuning values
pub mod tuning {
    use std::f32::consts::PI;

    /// Fallback target search radius for weapons without a range
    pub const DEFAULT_SEARCH_RADIUS: f32 = 450.0;
    /// Extra radius when reading last tick's index, covers enemy movement since
    pub const INDEX_SLACK: f32 = 40.0;

    /// Angle between fanned projectiles (radians)
    pub const SPREAD_STEP: f32 = 0.2;
    /// Sideways gap between parallel knives
    pub const KNIFE_LANE_GAP: f32 = 12.0;

    pub const ARC_LAUNCH_SPEED: f32 = 420.0;
    pub const ARC_GRAVITY: f32 = 600.0;
    /// Arc projectiles expire this far below their launch height
    pub const ARC_DROP_LIMIT: f32 = 600.0;

    pub const HOMING_TURN_RATE: f32 = 4.0;
    pub const BAT_TURN_RATE: f32 = 3.0;
    pub const BAT_FLUTTER_FREQ: f32 = 9.0;
    pub const BAT_FLUTTER_AMPLITUDE: f32 = 0.6;
    pub const CHAKRAM_TURN_RATE: f32 = 5.0;
    pub const GRAVITY_ORB_TURN_RATE: f32 = 1.5;
    pub const CHAIN_TURN_RATE: f32 = 4.0 * PI;

    /// Vortex pull toward the center (units per second)
    pub const VORTEX_PULL: f32 = 90.0;

    pub const BOTTLE_FLIGHT_TIME: f32 = 0.6;
    pub const BOTTLE_RADIUS: f32 = 8.0;
    pub const BOTTLE_PEAK_HEIGHT: f32 = 80.0;

    /// A returning projectile is caught within this distance of its owner
    pub const RETURN_CATCH_RADIUS: f32 = 20.0;

    pub const STAB_ORBIT_RADIUS: f32 = 45.0;
    /// Added to enemy radius for the stab sweep test
    pub const STAB_HITBOX_PAD: f32 = 20.0;
    pub const STAB_THRUST_SPEED: f32 = 900.0;
    pub const STAB_RECOVER_SPEED: f32 = 450.0;
    pub const STAB_BASE_COOLDOWN: f32 = 0.8;

    pub const BLOSSOM_ORBIT_RADIUS: f32 = 55.0;
    /// Added to enemy radius for the dash contact test
    pub const BLOSSOM_HITBOX_PAD: f32 = 15.0;
    pub const BLOSSOM_DASH_SPEED: f32 = 700.0;
    pub const BLOSSOM_BASE_COOLDOWN: f32 = 1.2;
    /// Distance from the orbit anchor at which a returning dasher re-docks
    pub const BLOSSOM_DOCK_RADIUS: f32 = 8.0;

    /// Default re-hit delay for orbiting projectiles
    pub const ORBIT_REHIT_DELAY: f32 = 0.5;
    pub const MIN_TICK_INTERVAL: f32 = 0.05;

    pub const BEAM_TURN_RATE: f32 = 2.5;

    /// Half-angle of the flamethrower cone (radians)
    pub const FLAME_CONE: f32 = 0.25;
    /// Fraction of velocity lost per second
    pub const FLAME_DRAG: f32 = 2.5;
    /// Upward drift acceleration
    pub const FLAME_RISE: f32 = 60.0;
    /// Radius growth over the full lifetime (1.0 doubles it)
    pub const FLAME_GROWTH: f32 = 1.5;
    /// Lifetime fraction after which flames fade out
    pub const FLAME_FADE_START: f32 = 0.7;

    pub const DRIFT_SWAY_FREQ: f32 = 2.0;
    pub const DRIFT_SWAY_AMPLITUDE: f32 = 40.0;
}

/// Read-only inputs shared by every behavior update
pub struct BehaviorCtx<'a> {
    pub dt: f32,
    /// Simulation clock (seconds since the run started)
    pub time: f32,
    pub half_extent: f32,
    pub orphan_grace: f32,
    pub world: WorldView<'a>,
    /// Enemy index as of the last combat pass
    pub index: &'a SpatialIndex,
}

impl BehaviorCtx<'_> {
    #[inline]
    pub fn out_of_bounds(&self, pos: Vec2) -> bool {
        let limit = self.half_extent + crate::consts::OUT_OF_BOUNDS_MARGIN;
        pos.x.abs() > limit || pos.y.abs() > limit
    }

    #[inline]
    pub fn nearest_enemy(&self, center: Vec2, radius: f32, filter: impl FnMut(u32) -> bool) -> Option<(u32, Vec2)> {
        find_nearest_enemy(&self.world.enemies, self.index, center, radius, filter)
    }
}

/// Direct damage decided by a state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub target: u32,
    pub damage: f32,
    pub element: Element,
    pub status: StatusPayload,
    pub is_area: bool,
}

/// What behavior updates produced this tick
#[derive(Debug, Default)]
pub struct BehaviorOutput {
    pub strikes: Vec<Strike>,
    /// Areas spawned by conversions (bottle puddles, gravity vortices)
    pub areas: Vec<Area>,
}

/// Nearest live enemy within `radius` of `center` accepted by `filter`.
///
/// The index may be one tick old, so candidates come from a padded query and
/// are confirmed against live positions.
pub fn find_nearest_enemy(
    enemies: &EnemyLookup<'_>,
    index: &SpatialIndex,
    center: Vec2,
    radius: f32,
    mut filter: impl FnMut(u32) -> bool,
) -> Option<(u32, Vec2)> {
    let radius_sq = radius * radius;
    let mut best: Option<(u32, Vec2, f32)> = None;
    index.for_each_in_radius(center, radius + tuning::INDEX_SLACK, |entry, _| {
        let Some(enemy) = enemies.get(entry.id) else {
            return;
        };
        let dist_sq = enemy.pos.distance_squared(center);
        if dist_sq > radius_sq {
            return;
        }
        // Ties go to the lower id so results do not depend on bucket order
        let better = best.is_none_or(|(id, _, d)| dist_sq < d || (dist_sq == d && entry.id < id));
        if better && filter(entry.id) {
            best = Some((entry.id, enemy.pos, dist_sq));
        }
    });
    best.map(|(id, pos, _)| (id, pos))
}

/// Advance one projectile by `ctx.dt`
pub fn update_projectile(p: &mut Projectile, ctx: &BehaviorCtx<'_>, out: &mut BehaviorOutput) {
    if p.expired {
        return;
    }
    p.age += ctx.dt;
    p.tick_hits(ctx.dt);
    if p.lifetime.is_some_and(|life| p.age >= life) {
        p.expired = true;
        return;
    }

    let behavior = p.behavior();
    match behavior {
        ProjectileBehavior::Normal
        | ProjectileBehavior::Linear
        | ProjectileBehavior::Arc
        | ProjectileBehavior::Bounce
        | ProjectileBehavior::Return
        | ProjectileBehavior::Bottle => ballistic::update(p, ctx, out),
        ProjectileBehavior::Homing
        | ProjectileBehavior::Bat
        | ProjectileBehavior::Chakram
        | ProjectileBehavior::GravityOrb
        | ProjectileBehavior::Chain => homing::update(p, ctx, out),
        ProjectileBehavior::Orbit | ProjectileBehavior::OrbitStab | ProjectileBehavior::Blossom => {
            tether::update(p, ctx, out)
        }
        ProjectileBehavior::Beam | ProjectileBehavior::Flame => continuous::update(p, ctx),
    }

    if !behavior.is_tethered() && ctx.out_of_bounds(p.pos) {
        p.expired = true;
    }
}

/// Contact reaction after the combat pass struck `enemy_id` at `enemy_pos`.
/// Only the patterns whose flight changes on impact do anything here.
pub fn on_hit(
    p: &mut Projectile,
    enemy_pos: Vec2,
    enemies: &EnemyLookup<'_>,
    index: &SpatialIndex,
    areas: &mut Vec<Area>,
) {
    match p.behavior() {
        ProjectileBehavior::Chakram => homing::chakram_rebound(p, enemy_pos, enemies, index),
        ProjectileBehavior::GravityOrb => {
            if let Some(area) = homing::collapse_gravity_orb(p) {
                areas.push(area);
            }
        }
        ProjectileBehavior::Chain => homing::chain_jump(p, enemy_pos, enemies, index),
        ProjectileBehavior::Normal
        | ProjectileBehavior::Linear
        | ProjectileBehavior::Arc
        | ProjectileBehavior::Bounce
        | ProjectileBehavior::Homing
        | ProjectileBehavior::Bat
        | ProjectileBehavior::Return
        | ProjectileBehavior::Bottle
        | ProjectileBehavior::Orbit
        | ProjectileBehavior::OrbitStab
        | ProjectileBehavior::Blossom
        | ProjectileBehavior::Beam
        | ProjectileBehavior::Flame => {}
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use glam::Vec2;

    use super::BehaviorCtx;
    use crate::sim::entities::{Enemy, EnemyKind, EnemyLookup, Player, TailSegment, WorldView};
    use crate::sim::spatial::SpatialIndex;

    /// Owns everything a [`BehaviorCtx`] borrows
    pub struct World {
        pub player: Player,
        pub tail: Vec<TailSegment>,
        pub enemies: Vec<Enemy>,
        pub slots: HashMap<u32, usize>,
        pub index: SpatialIndex,
    }

    impl World {
        pub fn new() -> Self {
            Self {
                player: Player::new(1, Vec2::ZERO),
                tail: Vec::new(),
                enemies: Vec::new(),
                slots: HashMap::new(),
                index: SpatialIndex::default(),
            }
        }

        pub fn enemy(&mut self, id: u32, pos: Vec2) -> &mut Self {
            self.slots.insert(id, self.enemies.len());
            self.enemies.push(Enemy::new(id, EnemyKind::Basic, pos, 1.0));
            self.index.insert(id, pos);
            self
        }

        pub fn ctx(&self, dt: f32, time: f32) -> BehaviorCtx<'_> {
            BehaviorCtx {
                dt,
                time,
                half_extent: crate::consts::WORLD_HALF_EXTENT,
                orphan_grace: crate::consts::ORPHAN_GRACE,
                world: WorldView {
                    player: &self.player,
                    tail: &self.tail,
                    enemies: EnemyLookup::new(&self.enemies, &self.slots),
                },
                index: &self.index,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::World;
    use super::*;
    use crate::sim::projectile::ProjectileState;
    use crate::sim::weapons::WeaponKind;

    #[test]
    fn test_nearest_prefers_live_and_close() {
        let mut world = World::new();
        world.enemy(10, Vec2::new(50.0, 0.0)).enemy(11, Vec2::new(80.0, 0.0));
        world.enemies[0].hp = 0.0;
        let ctx = world.ctx(0.0, 0.0);
        assert_eq!(ctx.nearest_enemy(Vec2::ZERO, 100.0, |_| true).map(|(id, _)| id), Some(11));
        assert!(ctx.nearest_enemy(Vec2::ZERO, 60.0, |_| true).is_none());
    }

    #[test]
    fn test_lifetime_and_bounds_expire() {
        let world = World::new();
        let ctx = world.ctx(0.1, 0.0);
        let mut out = BehaviorOutput::default();

        let mut p = Projectile::new(WeaponKind::Knife, Element::Physical, Vec2::ZERO, 0.0, 10.0, 4.0, 1.0, 1, ProjectileState::Linear)
            .with_lifetime(0.15);
        update_projectile(&mut p, &ctx, &mut out);
        assert!(!p.expired);
        update_projectile(&mut p, &ctx, &mut out);
        assert!(p.expired);

        let mut far = Projectile::new(WeaponKind::Knife, Element::Physical, Vec2::new(5000.0, 0.0), 0.0, 10.0, 4.0, 1.0, 1, ProjectileState::Linear);
        update_projectile(&mut far, &ctx, &mut out);
        assert!(far.expired);
    }
}
