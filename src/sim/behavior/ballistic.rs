//! Straight and gravity-driven motion

use std::f32::consts::PI;

use super::{tuning, BehaviorCtx, BehaviorOutput};
use crate::heading;
use crate::sim::projectile::{Area, AreaState, Projectile, ProjectileState};

pub fn update(p: &mut Projectile, ctx: &BehaviorCtx<'_>, out: &mut BehaviorOutput) {
    let dt = ctx.dt;
    let step = p.speed * dt;
    let dir = p.direction();

    match &mut p.state {
        ProjectileState::Normal { traveled, max_range } => {
            p.pos += dir * step;
            *traveled += step;
            if *max_range > 0.0 && *traveled >= *max_range {
                p.expired = true;
            }
        }
        ProjectileState::Linear => {
            p.pos += dir * step;
        }
        ProjectileState::Arc { vel, floor_y } => {
            vel.y += tuning::ARC_GRAVITY * dt;
            p.pos += *vel * dt;
            p.angle = heading(*vel);
            if p.pos.y > *floor_y {
                p.expired = true;
            }
        }
        ProjectileState::Bounce { bounces_left } => {
            p.pos += dir * step;
            let limit = ctx.half_extent;
            let mut bounced = false;
            if p.pos.x.abs() > limit {
                p.pos.x = p.pos.x.clamp(-limit, limit);
                p.angle = PI - p.angle;
                bounced = true;
            }
            if p.pos.y.abs() > limit {
                p.pos.y = p.pos.y.clamp(-limit, limit);
                p.angle = -p.angle;
                bounced = true;
            }
            if bounced {
                *bounces_left = bounces_left.saturating_sub(1);
                if *bounces_left == 0 {
                    p.expired = true;
                }
            }
        }
        ProjectileState::Return {
            traveled,
            max_range,
            returning,
        } => {
            if !*returning {
                p.pos += dir * step;
                *traveled += step;
                if *traveled >= *max_range {
                    *returning = true;
                    // The way back may strike the same enemies again
                    p.hits.clear();
                }
                return;
            }
            let Some(home) = p.owner.and_then(|id| ctx.world.owner_position(id)) else {
                // Nobody to return to: keep flying until lifetime or bounds
                p.pos += dir * step;
                return;
            };
            let to_home = home - p.pos;
            if to_home.length() <= tuning::RETURN_CATCH_RADIUS.max(step) {
                p.expired = true;
                return;
            }
            p.angle = heading(to_home);
            p.pos += to_home.normalize_or_zero() * step;
        }
        ProjectileState::Bottle {
            from,
            to,
            flight,
            elapsed,
            height,
            puddle,
        } => {
            *elapsed += dt;
            let t = (*elapsed / flight.max(f32::EPSILON)).min(1.0);
            p.pos = from.lerp(*to, t);
            *height = 4.0 * tuning::BOTTLE_PEAK_HEIGHT * t * (1.0 - t);
            if t >= 1.0 {
                p.expired = true;
                out.areas.push(
                    Area::new(
                        p.source,
                        p.element,
                        *to,
                        puddle.radius,
                        p.damage,
                        puddle.duration,
                        puddle.tick_interval.max(tuning::MIN_TICK_INTERVAL),
                        AreaState::Static,
                    )
                    .with_status(p.status),
                );
            }
        }
        // Other families are dispatched elsewhere
        ProjectileState::Homing { .. }
        | ProjectileState::Bat { .. }
        | ProjectileState::Chakram { .. }
        | ProjectileState::GravityOrb { .. }
        | ProjectileState::Chain { .. }
        | ProjectileState::Orbit { .. }
        | ProjectileState::OrbitStab { .. }
        | ProjectileState::Blossom { .. }
        | ProjectileState::Beam { .. }
        | ProjectileState::Flame { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    use crate::sim::behavior::test_support::World;
    use crate::sim::projectile::{AreaBehavior, PuddleSpec, Seeker};
    use crate::sim::weapons::{Element, WeaponKind};

    fn shot(state: ProjectileState, pos: Vec2, angle: f32, speed: f32) -> Projectile {
        Projectile::new(WeaponKind::Knife, Element::Physical, pos, angle, speed, 6.0, 5.0, 1, state)
    }

    #[test]
    fn test_normal_expires_at_range() {
        let world = World::new();
        let ctx = world.ctx(0.5, 0.0);
        let mut out = BehaviorOutput::default();
        let mut p = shot(ProjectileState::Normal { traveled: 0.0, max_range: 150.0 }, Vec2::ZERO, 0.0, 100.0);
        update(&mut p, &ctx, &mut out);
        assert!(!p.expired);
        assert!((p.pos.x - 50.0).abs() < 1e-4);
        update(&mut p, &ctx, &mut out);
        update(&mut p, &ctx, &mut out);
        assert!(p.expired);
    }

    #[test]
    fn test_foreign_family_is_left_alone() {
        let world = World::new();
        let ctx = world.ctx(0.5, 0.0);
        let mut out = BehaviorOutput::default();
        let mut p = shot(
            ProjectileState::Homing { seek: Seeker::new(None, 5.0, 300.0) },
            Vec2::new(10.0, 0.0),
            0.0,
            100.0,
        );
        update(&mut p, &ctx, &mut out);
        assert_eq!(p.pos, Vec2::new(10.0, 0.0));
        assert!(!p.expired);
        assert!(out.areas.is_empty());
    }

    #[test]
    fn test_arc_falls_and_expires_below_floor() {
        let world = World::new();
        let ctx = world.ctx(1.0 / 60.0, 0.0);
        let mut out = BehaviorOutput::default();
        let mut p = shot(
            ProjectileState::Arc { vel: Vec2::new(100.0, -tuning::ARC_LAUNCH_SPEED), floor_y: tuning::ARC_DROP_LIMIT },
            Vec2::ZERO,
            0.0,
            100.0,
        );
        let mut min_y = 0.0f32;
        for _ in 0..600 {
            update(&mut p, &ctx, &mut out);
            min_y = min_y.min(p.pos.y);
            if p.expired {
                break;
            }
        }
        assert!(p.expired);
        assert!(min_y < -100.0, "should rise first, min_y = {min_y}");
    }

    #[test]
    fn test_bounce_reflects_and_counts_down() {
        let world = World::new();
        let ctx = world.ctx(0.1, 0.0);
        let mut out = BehaviorOutput::default();
        let edge = crate::consts::WORLD_HALF_EXTENT;
        let mut p = shot(ProjectileState::Bounce { bounces_left: 2 }, Vec2::new(edge - 5.0, 0.0), 0.0, 100.0);

        update(&mut p, &ctx, &mut out);
        assert!(p.direction().x < 0.0, "heading should flip");
        assert!(!p.expired);
        assert_eq!(p.state, ProjectileState::Bounce { bounces_left: 1 });

        p.pos.x = -edge + 5.0;
        update(&mut p, &ctx, &mut out);
        assert!(p.expired);
    }

    #[test]
    fn test_return_comes_home() {
        let world = World::new();
        let ctx = world.ctx(0.05, 0.0);
        let mut out = BehaviorOutput::default();
        let mut p = shot(
            ProjectileState::Return { traveled: 0.0, max_range: 100.0, returning: false },
            Vec2::ZERO,
            0.0,
            400.0,
        )
        .with_owner(world.player.id);
        p.remember_hit(3);

        for _ in 0..100 {
            update(&mut p, &ctx, &mut out);
            if p.expired {
                break;
            }
        }
        assert!(p.expired);
        assert!(p.can_hit(3), "hits reset when turning back");
    }

    #[test]
    fn test_bottle_lands_as_puddle() {
        let world = World::new();
        let ctx = world.ctx(0.1, 0.0);
        let mut out = BehaviorOutput::default();
        let puddle = PuddleSpec { radius: 50.0, duration: 3.0, tick_interval: 0.5 };
        let mut p = shot(
            ProjectileState::Bottle { from: Vec2::ZERO, to: Vec2::new(100.0, 0.0), flight: 0.3, elapsed: 0.0, height: 0.0, puddle },
            Vec2::ZERO,
            0.0,
            0.0,
        );
        for _ in 0..5 {
            update(&mut p, &ctx, &mut out);
            if p.expired {
                break;
            }
        }
        assert!(p.expired);
        assert_eq!(out.areas.len(), 1);
        assert_eq!(out.areas[0].behavior(), AreaBehavior::Static);
        assert_eq!(out.areas[0].pos, Vec2::new(100.0, 0.0));
    }
}
