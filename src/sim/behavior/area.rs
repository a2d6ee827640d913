//! Persistent zone updates
//!
//! Areas move and decide *when* they pulse here; the combat pass decides *who*
//! they hit. Traps never pulse: they wait for an enemy inside the trigger
//! radius and detonate once in combat.

use glam::Vec2;

use super::{tuning, BehaviorCtx};
use crate::sim::projectile::{Area, AreaState};

pub fn update_area(a: &mut Area, ctx: &BehaviorCtx<'_>) {
    if a.expired {
        return;
    }
    let dt = ctx.dt;
    a.pulse_ready = false;
    a.remaining -= dt;
    if a.remaining <= 0.0 {
        a.expired = true;
        return;
    }

    match &mut a.state {
        AreaState::Static | AreaState::Vortex { .. } => {}
        AreaState::Follow { owner, orphan_time } => match ctx.world.owner_position(*owner) {
            Some(pos) => {
                *orphan_time = 0.0;
                a.pos = pos;
            }
            None => {
                *orphan_time += dt;
                if *orphan_time >= ctx.orphan_grace {
                    a.expired = true;
                    return;
                }
            }
        },
        AreaState::Drift { vel, sway } => {
            *sway += tuning::DRIFT_SWAY_FREQ * dt;
            let side = vel.perp().normalize_or_zero() * sway.sin() * tuning::DRIFT_SWAY_AMPLITUDE;
            a.pos += (*vel + side) * dt;
            let limit = ctx.half_extent;
            if a.pos.x.abs() > limit {
                vel.x = -vel.x;
            }
            if a.pos.y.abs() > limit {
                vel.y = -vel.y;
            }
            a.pos = a.pos.clamp(Vec2::splat(-limit), Vec2::splat(limit));
        }
        AreaState::Trap { .. } => return,
    }

    a.since_tick += dt;
    if a.since_tick >= a.tick_interval {
        a.since_tick -= a.tick_interval;
        a.pulse_ready = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::behavior::test_support::World;
    use crate::sim::weapons::{Element, WeaponKind};

    fn zone(state: AreaState, duration: f32, tick: f32) -> Area {
        Area::new(WeaponKind::Garlic, Element::Poison, Vec2::ZERO, 50.0, 4.0, duration, tick, state)
    }

    #[test]
    fn test_first_pulse_is_immediate_then_interval() {
        let world = World::new();
        let ctx = world.ctx(0.1, 0.0);
        let mut a = zone(AreaState::Static, 5.0, 0.5);
        let mut pulses = Vec::new();
        for i in 0..11 {
            update_area(&mut a, &ctx);
            if a.pulse_ready {
                pulses.push(i);
            }
        }
        assert_eq!(pulses.first(), Some(&0));
        assert!((2..=3).contains(&pulses.len()), "pulses at {pulses:?}");
    }

    #[test]
    fn test_area_expires_with_duration() {
        let world = World::new();
        let ctx = world.ctx(0.25, 0.0);
        let mut a = zone(AreaState::Static, 0.6, 0.5);
        for _ in 0..3 {
            update_area(&mut a, &ctx);
        }
        assert!(a.expired);
    }

    #[test]
    fn test_follow_tracks_owner_and_orphans() {
        let mut world = World::new();
        world.player.pos = Vec2::new(10.0, -20.0);
        let owner = world.player.id;
        let ctx = world.ctx(0.1, 0.0);
        let mut a = zone(AreaState::Follow { owner, orphan_time: 0.0 }, 10.0, 0.5);
        update_area(&mut a, &ctx);
        assert_eq!(a.pos, Vec2::new(10.0, -20.0));

        let mut lost = zone(AreaState::Follow { owner: 77, orphan_time: 0.0 }, 10.0, 0.5);
        for _ in 0..6 {
            update_area(&mut lost, &ctx);
        }
        assert!(lost.expired);
    }

    #[test]
    fn test_trap_never_pulses() {
        let world = World::new();
        let ctx = world.ctx(0.5, 0.0);
        let mut a = zone(AreaState::Trap { trigger_radius: 40.0, blast_radius: 120.0 }, 10.0, 0.1);
        for _ in 0..5 {
            update_area(&mut a, &ctx);
            assert!(!a.pulse_ready);
        }
    }

    #[test]
    fn test_drift_stays_in_world() {
        let world = World::new();
        let ctx = world.ctx(0.5, 0.0);
        let edge = crate::consts::WORLD_HALF_EXTENT;
        let mut a = zone(AreaState::Drift { vel: Vec2::new(300.0, 0.0), sway: 0.0 }, 100.0, 0.5);
        a.pos = Vec2::new(edge - 10.0, 0.0);
        for _ in 0..4 {
            update_area(&mut a, &ctx);
            assert!(a.pos.x <= edge);
        }
        assert!(matches!(a.state, AreaState::Drift { vel, .. } if vel.x < 0.0));
    }
}
