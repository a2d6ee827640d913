//! Target-seeking patterns
//!
//! Each tick a seeker keeps its cached target while it is alive, otherwise it
//! asks the index for the nearest live enemy within its search radius. The
//! heading turns toward the target at a bounded rate before moving forward.

use glam::Vec2;

use super::{find_nearest_enemy, tuning, BehaviorCtx, BehaviorOutput};
use crate::sim::combat::reflect_velocity;
use crate::sim::entities::EnemyLookup;
use crate::sim::projectile::{Area, AreaState, Projectile, ProjectileState, Seeker};
use crate::sim::spatial::SpatialIndex;
use crate::{heading, rotate_toward};

pub fn update(p: &mut Projectile, ctx: &BehaviorCtx<'_>, out: &mut BehaviorOutput) {
    let dt = ctx.dt;
    let step = p.speed * dt;
    let pos = p.pos;
    let hits = &p.hits;
    let unhit = |id: u32| !hits.iter().any(|h| h.enemy == id);
    let mut collapse = false;

    match &mut p.state {
        ProjectileState::Homing { seek } => {
            if let Some(target) = acquire(seek, pos, ctx, unhit) {
                p.angle = rotate_toward(p.angle, heading(target - pos), seek.turn_rate * dt);
            }
            p.pos += Vec2::from_angle(p.angle) * step;
        }
        ProjectileState::Bat { seek, flutter } => {
            if let Some(target) = acquire(seek, pos, ctx, unhit) {
                p.angle = rotate_toward(p.angle, heading(target - pos), seek.turn_rate * dt);
            }
            *flutter += tuning::BAT_FLUTTER_FREQ * dt;
            let wobble = flutter.sin() * tuning::BAT_FLUTTER_AMPLITUDE;
            p.pos += Vec2::from_angle(p.angle + wobble) * step;
        }
        ProjectileState::Chakram { seek, .. } => {
            if let Some(target) = acquire(seek, pos, ctx, unhit) {
                p.angle = rotate_toward(p.angle, heading(target - pos), seek.turn_rate * dt);
            }
            p.pos += Vec2::from_angle(p.angle) * step;
        }
        ProjectileState::GravityOrb {
            seek,
            traveled,
            max_range,
            ..
        } => {
            if let Some(target) = acquire(seek, pos, ctx, unhit) {
                p.angle = rotate_toward(p.angle, heading(target - pos), seek.turn_rate * dt);
            }
            p.pos += Vec2::from_angle(p.angle) * step;
            *traveled += step;
            collapse = *max_range > 0.0 && *traveled >= *max_range;
        }
        ProjectileState::Chain { seek, .. } => {
            // A bolt never switches to an unrelated enemy mid-flight
            let Some(target) = seek.target.and_then(|id| ctx.world.enemies.get(id)).map(|e| e.pos) else {
                p.expired = true;
                return;
            };
            p.angle = rotate_toward(p.angle, heading(target - pos), seek.turn_rate * dt);
            let to_target = target - pos;
            if to_target.length() <= step {
                p.pos = target;
            } else {
                p.pos += Vec2::from_angle(p.angle) * step;
            }
        }
        // Other families are dispatched elsewhere
        ProjectileState::Normal { .. }
        | ProjectileState::Linear
        | ProjectileState::Arc { .. }
        | ProjectileState::Bounce { .. }
        | ProjectileState::Return { .. }
        | ProjectileState::Bottle { .. }
        | ProjectileState::Orbit { .. }
        | ProjectileState::OrbitStab { .. }
        | ProjectileState::Blossom { .. }
        | ProjectileState::Beam { .. }
        | ProjectileState::Flame { .. } => {}
    }

    if collapse {
        if let Some(area) = collapse_gravity_orb(p) {
            out.areas.push(area);
        }
    }
}

/// Position of the seeker's target, re-acquiring when the cached one is gone
fn acquire(seek: &mut Seeker, pos: Vec2, ctx: &BehaviorCtx<'_>, filter: impl FnMut(u32) -> bool) -> Option<Vec2> {
    if let Some(enemy) = seek.target.and_then(|id| ctx.world.enemies.get(id)) {
        return Some(enemy.pos);
    }
    let found = ctx.nearest_enemy(pos, seek.search_radius, filter);
    seek.target = found.map(|(id, _)| id);
    found.map(|(_, target)| target)
}

/// Reflect off the struck enemy and spend a bounce
pub fn chakram_rebound(p: &mut Projectile, enemy_pos: Vec2, enemies: &EnemyLookup<'_>, index: &SpatialIndex) {
    let velocity = p.direction();
    let normal = (p.pos - enemy_pos).try_normalize().unwrap_or(-velocity);
    let reflected = reflect_velocity(velocity, normal);
    if reflected.length_squared() > 0.0 {
        p.angle = heading(reflected);
    }

    let hits = &p.hits;
    let next = match &p.state {
        ProjectileState::Chakram { seek, .. } => {
            find_nearest_enemy(enemies, index, p.pos, seek.search_radius, |id| !hits.iter().any(|h| h.enemy == id))
        }
        _ => return,
    };
    if let ProjectileState::Chakram { seek, bounces_left } = &mut p.state {
        seek.target = next.map(|(id, _)| id);
        *bounces_left = bounces_left.saturating_sub(1);
        if *bounces_left == 0 {
            p.expired = true;
        }
    }
}

/// Turn a gravity orb into its vortex; `None` when already spent
pub fn collapse_gravity_orb(p: &mut Projectile) -> Option<Area> {
    if p.expired {
        return None;
    }
    let ProjectileState::GravityOrb { vortex, .. } = &p.state else {
        return None;
    };
    p.expired = true;
    Some(
        Area::new(
            p.source,
            p.element,
            p.pos,
            vortex.radius,
            p.damage,
            vortex.duration,
            vortex.tick_interval.max(tuning::MIN_TICK_INTERVAL),
            AreaState::Vortex { pull: vortex.pull },
        )
        .with_status(p.status),
    )
}

/// Hop to the nearest enemy this bolt has not struck yet, or fizzle
pub fn chain_jump(p: &mut Projectile, enemy_pos: Vec2, enemies: &EnemyLookup<'_>, index: &SpatialIndex) {
    let hits = &p.hits;
    let next = match &p.state {
        ProjectileState::Chain {
            hops_left, chain_range, ..
        } if *hops_left > 0 => {
            find_nearest_enemy(enemies, index, enemy_pos, *chain_range, |id| !hits.iter().any(|h| h.enemy == id))
        }
        _ => None,
    };
    let Some((next_id, _)) = next else {
        p.expired = true;
        return;
    };
    if let ProjectileState::Chain { seek, hops_left, .. } = &mut p.state {
        seek.target = Some(next_id);
        *hops_left -= 1;
    }
    p.pos = enemy_pos;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::behavior::test_support::World;
    use crate::sim::projectile::{AreaBehavior, VortexSpec};
    use crate::sim::weapons::{Element, WeaponKind};

    fn seeker(state: ProjectileState) -> Projectile {
        Projectile::new(WeaponKind::MagicWand, Element::Arcane, Vec2::ZERO, 0.0, 300.0, 8.0, 10.0, 1, state)
    }

    #[test]
    fn test_homing_turns_toward_target() {
        let mut world = World::new();
        world.enemy(5, Vec2::new(0.0, 200.0));
        let ctx = world.ctx(1.0 / 60.0, 0.0);
        let mut out = BehaviorOutput::default();
        let mut p = seeker(ProjectileState::Homing {
            seek: Seeker::new(None, tuning::HOMING_TURN_RATE, 400.0),
        });

        update(&mut p, &ctx, &mut out);
        let ProjectileState::Homing { seek } = &p.state else {
            panic!("state changed");
        };
        assert_eq!(seek.target, Some(5));
        // Bounded turn: one tick cannot swing a full quarter turn
        assert!(p.angle > 0.0 && p.angle < 0.1);
    }

    #[test]
    fn test_homing_without_target_flies_straight() {
        let world = World::new();
        let ctx = world.ctx(0.1, 0.0);
        let mut out = BehaviorOutput::default();
        let mut p = seeker(ProjectileState::Homing {
            seek: Seeker::new(None, tuning::HOMING_TURN_RATE, 400.0),
        });
        update(&mut p, &ctx, &mut out);
        assert!((p.pos - Vec2::new(30.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_chakram_reflects_and_spends_bounce() {
        let mut world = World::new();
        world.enemy(1, Vec2::new(10.0, 0.0)).enemy(2, Vec2::new(-150.0, 0.0));
        let lookup = EnemyLookup::new(&world.enemies, &world.slots);
        let mut p = seeker(ProjectileState::Chakram {
            seek: Seeker::new(Some(1), tuning::CHAKRAM_TURN_RATE, 400.0),
            bounces_left: 2,
        });
        p.remember_hit(1);

        chakram_rebound(&mut p, Vec2::new(10.0, 0.0), &lookup, &world.index);
        assert!(p.direction().x < -0.99, "head-on hit reverses heading");
        assert!(!p.expired);
        let ProjectileState::Chakram { seek, bounces_left } = &p.state else {
            panic!("state changed");
        };
        assert_eq!(*bounces_left, 1);
        assert_eq!(seek.target, Some(2));

        chakram_rebound(&mut p, Vec2::new(-150.0, 0.0), &lookup, &world.index);
        assert!(p.expired);
    }

    #[test]
    fn test_gravity_orb_collapses_at_range() {
        let world = World::new();
        let ctx = world.ctx(0.5, 0.0);
        let mut out = BehaviorOutput::default();
        let mut p = seeker(ProjectileState::GravityOrb {
            seek: Seeker::new(None, 1.0, 100.0),
            traveled: 0.0,
            max_range: 200.0,
            vortex: VortexSpec { radius: 120.0, duration: 2.0, tick_interval: 0.4, pull: 50.0 },
        });
        update(&mut p, &ctx, &mut out);
        assert!(!p.expired);
        update(&mut p, &ctx, &mut out);
        assert!(p.expired);
        assert_eq!(out.areas.len(), 1);
        assert_eq!(out.areas[0].behavior(), AreaBehavior::Vortex);
        assert_eq!(collapse_gravity_orb(&mut p).map(|a| a.id), None);
    }

    #[test]
    fn test_chain_hops_to_unhit_neighbours() {
        let mut world = World::new();
        world
            .enemy(1, Vec2::new(0.0, 0.0))
            .enemy(2, Vec2::new(60.0, 0.0))
            .enemy(3, Vec2::new(500.0, 0.0));
        let lookup = EnemyLookup::new(&world.enemies, &world.slots);
        let mut p = seeker(ProjectileState::Chain {
            seek: Seeker::new(Some(1), tuning::CHAIN_TURN_RATE, 400.0),
            hops_left: 2,
            chain_range: 100.0,
        });

        p.remember_hit(1);
        chain_jump(&mut p, Vec2::ZERO, &lookup, &world.index);
        assert!(!p.expired);
        assert!(matches!(p.state, ProjectileState::Chain { seek: Seeker { target: Some(2), .. }, hops_left: 1, .. }));

        // Enemy 3 is out of chain range
        p.remember_hit(2);
        chain_jump(&mut p, Vec2::new(60.0, 0.0), &lookup, &world.index);
        assert!(p.expired);
    }

    #[test]
    fn test_chain_fizzles_when_target_dies() {
        let mut world = World::new();
        world.enemy(1, Vec2::new(100.0, 0.0));
        world.enemies[0].hp = 0.0;
        let ctx = world.ctx(1.0 / 60.0, 0.0);
        let mut out = BehaviorOutput::default();
        let mut p = seeker(ProjectileState::Chain {
            seek: Seeker::new(Some(1), tuning::CHAIN_TURN_RATE, 400.0),
            hops_left: 2,
            chain_range: 100.0,
        });
        update(&mut p, &ctx, &mut out);
        assert!(p.expired);
    }
}
