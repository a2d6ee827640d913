//! Beams and flame particles

use glam::Vec2;

use super::{tuning, BehaviorCtx};
use crate::sim::projectile::{Projectile, ProjectileState};
use crate::{heading, rotate_toward};

pub fn update(p: &mut Projectile, ctx: &BehaviorCtx<'_>) {
    let dt = ctx.dt;
    let life = p.lifetime.unwrap_or(1.0).max(f32::EPSILON);
    let fraction = (p.age / life).clamp(0.0, 1.0);

    match &mut p.state {
        ProjectileState::Beam {
            owner,
            orphan_time,
            length,
            tick_interval,
            since_tick,
            firing,
            turn_rate,
            ..
        } => {
            *firing = false;
            let Some(origin) = ctx.world.owner_position(*owner) else {
                *orphan_time += dt;
                if *orphan_time >= ctx.orphan_grace {
                    p.expired = true;
                }
                return;
            };
            *orphan_time = 0.0;
            p.pos = origin;

            if let Some((_, target)) = ctx.nearest_enemy(origin, *length, |_| true) {
                p.angle = rotate_toward(p.angle, heading(target - origin), *turn_rate * dt);
            }

            *since_tick += dt;
            if *since_tick >= *tick_interval {
                *since_tick -= *tick_interval;
                *firing = true;
            }
        }
        ProjectileState::Flame {
            vel,
            drag,
            rise,
            base_radius,
            growth,
            opacity,
        } => {
            *vel *= (1.0 - *drag * dt).max(0.0);
            // Screen space: up is -y
            vel.y -= *rise * dt;
            p.pos += *vel * dt;
            if vel.length_squared() > 0.0 {
                p.angle = heading(*vel);
            }
            p.radius = *base_radius * (1.0 + *growth * fraction);
            *opacity = if fraction > tuning::FLAME_FADE_START {
                1.0 - (fraction - tuning::FLAME_FADE_START) / (1.0 - tuning::FLAME_FADE_START)
            } else {
                1.0
            };
        }
        // Other families are dispatched elsewhere
        ProjectileState::Normal { .. }
        | ProjectileState::Linear
        | ProjectileState::Arc { .. }
        | ProjectileState::Bounce { .. }
        | ProjectileState::Homing { .. }
        | ProjectileState::Bat { .. }
        | ProjectileState::Chakram { .. }
        | ProjectileState::GravityOrb { .. }
        | ProjectileState::Return { .. }
        | ProjectileState::Chain { .. }
        | ProjectileState::Bottle { .. }
        | ProjectileState::Orbit { .. }
        | ProjectileState::OrbitStab { .. }
        | ProjectileState::Blossom { .. } => {}
    }
}

/// Far end of a beam's ray
pub fn beam_end(p: &Projectile) -> Option<Vec2> {
    match p.state {
        ProjectileState::Beam { length, .. } => Some(p.pos + p.direction() * length),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::behavior::test_support::World;
    use crate::sim::weapons::{Element, WeaponKind};

    fn beam(owner: u32) -> Projectile {
        let state = ProjectileState::Beam {
            owner,
            orphan_time: 0.0,
            length: 500.0,
            width: 10.0,
            tick_interval: 0.2,
            since_tick: 0.0,
            firing: false,
            turn_rate: tuning::BEAM_TURN_RATE,
        };
        Projectile::new(WeaponKind::Laser, Element::Light, Vec2::ZERO, 0.0, 0.0, 10.0, 6.0, 1, state)
            .with_owner(owner)
            .with_lifetime(2.0)
    }

    #[test]
    fn test_beam_fires_on_interval_and_tracks_owner() {
        let mut world = World::new();
        world.player.pos = Vec2::new(30.0, 40.0);
        let owner = world.player.id;
        let ctx = world.ctx(0.05, 0.0);
        let mut p = beam(owner);

        let mut fired = 0;
        for _ in 0..20 {
            update(&mut p, &ctx);
            if matches!(p.state, ProjectileState::Beam { firing: true, .. }) {
                fired += 1;
            }
        }
        // 1 second at a 0.2s interval
        assert!((4..=5).contains(&fired), "fired {fired}");
        assert_eq!(p.pos, Vec2::new(30.0, 40.0));
        assert_eq!(beam_end(&p), Some(Vec2::new(530.0, 40.0)));
    }

    #[test]
    fn test_beam_orphan_expires() {
        let world = World::new();
        let ctx = world.ctx(0.1, 0.0);
        let mut p = beam(4242);
        for _ in 0..6 {
            update(&mut p, &ctx);
        }
        assert!(p.expired);
    }

    #[test]
    fn test_flame_slows_rises_grows_and_fades() {
        let world = World::new();
        let mut p = Projectile::new(
            WeaponKind::Flamethrower,
            Element::Fire,
            Vec2::ZERO,
            0.0,
            300.0,
            8.0,
            4.0,
            1,
            ProjectileState::Flame {
                vel: Vec2::new(300.0, 0.0),
                drag: tuning::FLAME_DRAG,
                rise: tuning::FLAME_RISE,
                base_radius: 8.0,
                growth: tuning::FLAME_GROWTH,
                opacity: 1.0,
            },
        )
        .with_lifetime(1.0);

        let dt = 0.05;
        let ctx = world.ctx(dt, 0.0);
        for _ in 0..18 {
            p.age += dt;
            update(&mut p, &ctx);
        }
        let ProjectileState::Flame { vel, opacity, .. } = p.state else {
            panic!("state changed");
        };
        assert!(vel.x < 300.0 * 0.2);
        assert!(vel.y < 0.0, "drifts upward");
        assert!(p.radius > 8.0);
        assert!(opacity < 0.5 && opacity > 0.0);
    }
}
