//! Owner-relative patterns: plain orbit, orbit-stab and blossom dash-and-chain
//!
//! The owner is resolved by id every tick. While it cannot be resolved the
//! projectile holds still and an orphan timer runs; once the timer passes the
//! grace period the projectile expires.
//!
//! Stab: `Orbit` -> `Stab` (radial thrust, damage on first contact along the
//! swept path) -> `Recover` (pull back to the orbit path) -> `Orbit` with a
//! cooldown. Blossom: `Orbit` -> `Dash` (pursue, strike, chain to the next
//! unhit enemy) -> `Return` -> `Orbit` with a cooldown.

use glam::Vec2;

use super::{tuning, BehaviorCtx, BehaviorOutput, Strike};
use crate::heading;
use crate::sim::combat::point_segment_distance_squared;
use crate::sim::projectile::{
    BlossomPhase, BlossomSpec, Projectile, ProjectileState, StabPhase, StabSpec, StatusPayload, Tether,
};
use crate::sim::weapons::Element;

pub fn update(p: &mut Projectile, ctx: &BehaviorCtx<'_>, out: &mut BehaviorOutput) {
    let Some(tether) = tether_mut(&mut p.state) else {
        return;
    };
    let Some(owner_pos) = resolve_owner(tether, ctx) else {
        if tether.orphan_time >= ctx.orphan_grace {
            p.expired = true;
        }
        return;
    };
    let anchor = tether.anchor(owner_pos, ctx.time);
    let slot_angle = tether.slot_angle(ctx.time);

    let hit = Hit {
        damage: p.damage,
        radius: p.radius,
        element: p.element,
        status: p.status,
    };

    match &mut p.state {
        ProjectileState::Orbit { .. } => {
            p.pos = anchor;
            p.angle = slot_angle + std::f32::consts::FRAC_PI_2;
        }
        ProjectileState::OrbitStab {
            phase, cooldown, spec, ..
        } => {
            *cooldown = (*cooldown - ctx.dt).max(0.0);
            let (pos, angle) = step_stab(phase, cooldown, spec, anchor, owner_pos, &hit, ctx, out);
            p.pos = pos;
            if let Some(angle) = angle {
                p.angle = angle;
            }
        }
        ProjectileState::Blossom {
            phase, cooldown, spec, ..
        } => {
            *cooldown = (*cooldown - ctx.dt).max(0.0);
            let (pos, angle) = step_blossom(phase, cooldown, spec, p.pos, anchor, owner_pos, &hit, ctx, out);
            p.pos = pos;
            if let Some(angle) = angle {
                p.angle = angle;
            }
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
        | ProjectileState::Beam { .. }
        | ProjectileState::Flame { .. } => {}
    }
}

/// Damage fields copied out of the projectile so its state can be borrowed
struct Hit {
    damage: f32,
    radius: f32,
    element: Element,
    status: StatusPayload,
}

impl Hit {
    fn strike(&self, target: u32) -> Strike {
        Strike {
            target,
            damage: self.damage,
            element: self.element,
            status: self.status,
            is_area: false,
        }
    }
}

fn tether_mut(state: &mut ProjectileState) -> Option<&mut Tether> {
    match state {
        ProjectileState::Orbit { tether }
        | ProjectileState::OrbitStab { tether, .. }
        | ProjectileState::Blossom { tether, .. } => Some(tether),
        _ => None,
    }
}

/// Owner position, or `None` while orphaned (advancing the orphan timer)
fn resolve_owner(tether: &mut Tether, ctx: &BehaviorCtx<'_>) -> Option<Vec2> {
    match ctx.world.owner_position(tether.owner) {
        Some(pos) => {
            tether.orphan_time = 0.0;
            Some(pos)
        }
        None => {
            tether.orphan_time += ctx.dt;
            None
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn step_stab(
    phase: &mut StabPhase,
    cooldown: &mut f32,
    spec: &StabSpec,
    anchor: Vec2,
    owner_pos: Vec2,
    hit: &Hit,
    ctx: &BehaviorCtx<'_>,
    out: &mut BehaviorOutput,
) -> (Vec2, Option<f32>) {
    match *phase {
        StabPhase::Orbit => {
            if *cooldown <= 0.0 {
                if let Some((target, target_pos)) = ctx.nearest_enemy(owner_pos, spec.trigger_radius, |_| true) {
                    let dir = (target_pos - anchor).try_normalize().unwrap_or((anchor - owner_pos).normalize_or_zero());
                    *phase = StabPhase::Stab { target, dir, extended: 0.0 };
                    return (anchor, Some(heading(dir)));
                }
            }
            (anchor, None)
        }
        StabPhase::Stab { target, dir, extended } => {
            let start = anchor + dir * extended;
            let extended = (extended + spec.thrust_speed * ctx.dt).min(spec.reach);
            let tip = anchor + dir * extended;

            if let Some(struck) = first_contact(start, tip, hit.radius, ctx) {
                out.strikes.push(hit.strike(struck));
                *phase = StabPhase::Recover { dir, extended };
            } else if extended >= spec.reach {
                *phase = StabPhase::Recover { dir, extended };
            } else {
                *phase = StabPhase::Stab { target, dir, extended };
            }
            (tip, Some(heading(dir)))
        }
        StabPhase::Recover { dir, extended } => {
            let extended = extended - spec.recover_speed * ctx.dt;
            if extended <= 0.0 {
                *phase = StabPhase::Orbit;
                *cooldown = spec.base_cooldown / spec.attack_speed_mult.max(f32::EPSILON);
                return (anchor, None);
            }
            *phase = StabPhase::Recover { dir, extended };
            (anchor + dir * extended, Some(heading(dir)))
        }
    }
}

/// Nearest-to-start live enemy touched by a tip sweeping from `start` to `end`
fn first_contact(start: Vec2, end: Vec2, radius: f32, ctx: &BehaviorCtx<'_>) -> Option<u32> {
    let mid = (start + end) * 0.5;
    let reach = start.distance(end) * 0.5 + radius + crate::consts::MAX_ENEMY_RADIUS + tuning::STAB_HITBOX_PAD;
    let mut best: Option<(u32, f32)> = None;
    ctx.index.for_each_in_radius(mid, reach + tuning::INDEX_SLACK, |entry, _| {
        let Some(enemy) = ctx.world.enemies.get(entry.id) else {
            return;
        };
        let contact = radius + enemy.radius + tuning::STAB_HITBOX_PAD;
        if point_segment_distance_squared(enemy.pos, start, end) > contact * contact {
            return;
        }
        let along = enemy.pos.distance_squared(start);
        if best.is_none_or(|(id, d)| along < d || (along == d && entry.id < id)) {
            best = Some((entry.id, along));
        }
    });
    best.map(|(id, _)| id)
}

#[allow(clippy::too_many_arguments)]
fn step_blossom(
    phase: &mut BlossomPhase,
    cooldown: &mut f32,
    spec: &BlossomSpec,
    pos: Vec2,
    anchor: Vec2,
    owner_pos: Vec2,
    hit: &Hit,
    ctx: &BehaviorCtx<'_>,
    out: &mut BehaviorOutput,
) -> (Vec2, Option<f32>) {
    let step = spec.dash_speed * ctx.dt;
    match phase {
        BlossomPhase::Orbit => {
            if *cooldown <= 0.0 {
                if let Some((target, _)) = ctx.nearest_enemy(owner_pos, spec.trigger_radius, |_| true) {
                    *phase = BlossomPhase::Dash {
                        target,
                        hits: 0,
                        visited: Vec::new(),
                    };
                }
            }
            (anchor, None)
        }
        BlossomPhase::Dash { target, hits, visited } => {
            let target_enemy = ctx.world.enemies.get(*target).or_else(|| {
                // Target died mid-dash: chain on to the next unhit enemy
                let next = ctx.nearest_enemy(pos, spec.chain_radius, |id| !visited.contains(&id));
                next.and_then(|(id, _)| ctx.world.enemies.get(id))
            });
            let Some(enemy) = target_enemy else {
                *phase = BlossomPhase::Return;
                return (pos, None);
            };
            *target = enemy.id;

            let to_target = enemy.pos - pos;
            let angle = heading(to_target);
            let new_pos = if to_target.length() <= step {
                enemy.pos
            } else {
                pos + to_target.normalize_or_zero() * step
            };

            let contact = hit.radius + enemy.radius + tuning::BLOSSOM_HITBOX_PAD;
            if new_pos.distance_squared(enemy.pos) > contact * contact {
                return (new_pos, Some(angle));
            }

            out.strikes.push(hit.strike(enemy.id));
            *hits += 1;
            visited.push(enemy.id);
            if *hits >= spec.max_chain_hits {
                *phase = BlossomPhase::Return;
                return (new_pos, Some(angle));
            }
            match ctx.nearest_enemy(enemy.pos, spec.chain_radius, |id| !visited.contains(&id)) {
                Some((next, _)) => *target = next,
                None => *phase = BlossomPhase::Return,
            }
            (new_pos, Some(angle))
        }
        BlossomPhase::Return => {
            let to_anchor = anchor - pos;
            if to_anchor.length() <= step.max(tuning::BLOSSOM_DOCK_RADIUS) {
                *phase = BlossomPhase::Orbit;
                *cooldown = spec.base_cooldown / spec.attack_speed_mult.max(f32::EPSILON);
                return (anchor, None);
            }
            (pos + to_anchor.normalize_or_zero() * step, Some(heading(to_anchor)))
        }
    }
}
