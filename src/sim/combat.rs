//! Combat resolution
//!
//! Runs once per tick after the enemy index has been rebuilt. Every damage
//! source funnels through [`hit_enemy`], which skips enemies already at 0 hp
//! so a death is only ever counted once (rewards are paid by the reaping pass).

use glam::Vec2;

use super::behavior::{self, Strike};
use super::entities::{Enemy, EnemyLookup, EntityStore};
use super::projectile::{AreaState, ProjectileState, StatusPayload};
use super::spatial::SpatialIndex;
use super::state::SimEvent;
use super::status::{self, StatusKind};
use super::weapons::Element;
use crate::consts::MAX_ENEMY_RADIUS;

/// Per-tick inputs to hit resolution
///
/// Player attack is already folded into each source's damage by the stat
/// pipeline, so no multiplier for it is applied here.
#[derive(Debug, Clone, Copy)]
pub struct CombatParams {
    pub dt: f32,
    /// Extra factor for area damage
    pub area_factor: f32,
}

impl Default for CombatParams {
    fn default() -> Self {
        Self {
            dt: crate::consts::SIM_DT,
            area_factor: 1.0,
        }
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Squared distance from `point` to the segment `a`-`b`
pub fn point_segment_distance_squared(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return point.distance_squared(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance_squared(a + ab * t)
}

/// True when a circle of `radius` at `pos` overlaps the disc `(center, reach)`
#[inline]
fn within(pos: Vec2, radius: f32, center: Vec2, reach: f32) -> bool {
    let r = reach + radius;
    pos.distance_squared(center) <= r * r
}

/// Element shown for a status damage tick
pub fn status_element(kind: StatusKind) -> Element {
    match kind {
        StatusKind::Burn => Element::Fire,
        StatusKind::Chill | StatusKind::Freeze => Element::Ice,
        StatusKind::Poison => Element::Poison,
        StatusKind::Shock => Element::Lightning,
    }
}

/// Apply one hit. Returns the damage dealt (0 when the enemy was already down).
pub fn hit_enemy(
    enemy: &mut Enemy,
    raw: f32,
    element: Element,
    payload: StatusPayload,
    is_area: bool,
    params: &CombatParams,
    events: &mut Vec<SimEvent>,
) -> f32 {
    if !enemy.is_live() {
        return 0.0;
    }
    let area = if is_area { params.area_factor } else { 1.0 };
    let dealt = status::deal_damage(enemy, raw * area);
    for effect in payload.effects() {
        status::apply(enemy, effect);
    }
    events.push(SimEvent::DamageNumber {
        pos: enemy.pos,
        amount: dealt,
        element,
    });
    if !is_area {
        events.push(SimEvent::ImpactVfx { pos: enemy.pos, element });
    }
    dealt
}

/// Resolve every damage source against the enemy set
pub fn resolve(
    store: &mut EntityStore,
    index: &SpatialIndex,
    strikes: &[Strike],
    params: &CombatParams,
    events: &mut Vec<SimEvent>,
) {
    apply_strikes(store, strikes, params, events);
    projectile_contacts(store, index, params, events);
    beam_sweeps(store, index, params, events);
    area_effects(store, index, params, events);
}

fn apply_strikes(store: &mut EntityStore, strikes: &[Strike], params: &CombatParams, events: &mut Vec<SimEvent>) {
    for strike in strikes {
        let Some(&slot) = store.enemy_slots.get(&strike.target) else {
            continue;
        };
        if let Some(enemy) = store.enemies.get_mut(slot) {
            hit_enemy(enemy, strike.damage, strike.element, strike.status, strike.is_area, params, events);
        }
    }
}

fn projectile_contacts(store: &mut EntityStore, index: &SpatialIndex, params: &CombatParams, events: &mut Vec<SimEvent>) {
    let mut candidates = Vec::new();
    let mut spawned = Vec::new();

    for p in store.projectiles.iter_mut() {
        let behavior = p.behavior();
        if p.expired || !behavior.uses_contact() {
            continue;
        }
        index.query_radius_into(p.pos, p.radius + MAX_ENEMY_RADIUS, &mut candidates);
        // Stable order regardless of grid layout
        candidates.sort_unstable();

        for &id in &candidates {
            let Some(&slot) = store.enemy_slots.get(&id) else {
                continue;
            };
            let Some(enemy) = store.enemies.get_mut(slot) else {
                continue;
            };
            if !enemy.is_live() || !p.can_hit(id) {
                continue;
            }
            let reach = p.radius + enemy.radius;
            if enemy.pos.distance_squared(p.pos) > reach * reach {
                continue;
            }

            hit_enemy(enemy, p.damage, p.element, p.status, false, params, events);
            let enemy_pos = enemy.pos;
            p.remember_hit(id);
            if behavior.consumes_penetration() {
                p.penetration = p.penetration.saturating_sub(1);
                if p.penetration == 0 {
                    p.expired = true;
                }
            }

            let lookup = EnemyLookup::new(&store.enemies, &store.enemy_slots);
            behavior::on_hit(p, enemy_pos, &lookup, index, &mut spawned);
            if p.expired {
                break;
            }
        }
    }

    for area in spawned {
        store.queue_area(area);
    }
}

fn beam_sweeps(store: &mut EntityStore, index: &SpatialIndex, params: &CombatParams, events: &mut Vec<SimEvent>) {
    let mut candidates = Vec::new();
    for p in store.projectiles.iter_mut() {
        let ProjectileState::Beam {
            firing: true,
            length,
            width,
            ..
        } = p.state
        else {
            continue;
        };
        if p.expired {
            continue;
        }
        let start = p.pos;
        let end = start + p.direction() * length;
        let half_width = width * 0.5;
        index.query_radius_into((start + end) * 0.5, length * 0.5 + half_width + MAX_ENEMY_RADIUS, &mut candidates);
        candidates.sort_unstable();

        for &id in &candidates {
            let Some(enemy) = store.enemy_slots.get(&id).and_then(|&slot| store.enemies.get_mut(slot)) else {
                continue;
            };
            let reach = half_width + enemy.radius;
            if point_segment_distance_squared(enemy.pos, start, end) <= reach * reach {
                hit_enemy(enemy, p.damage, p.element, p.status, false, params, events);
            }
        }
    }
}

fn area_effects(store: &mut EntityStore, index: &SpatialIndex, params: &CombatParams, events: &mut Vec<SimEvent>) {
    let mut candidates = Vec::new();

    for a in store.areas.iter_mut() {
        if a.expired {
            continue;
        }
        match a.state {
            AreaState::Trap {
                trigger_radius,
                blast_radius,
            } => {
                index.query_radius_into(a.pos, trigger_radius + MAX_ENEMY_RADIUS, &mut candidates);
                let triggered = candidates.iter().any(|id| {
                    store
                        .enemy_slots
                        .get(id)
                        .and_then(|&slot| store.enemies.get(slot))
                        .is_some_and(|e| e.is_live() && within(e.pos, e.radius, a.pos, trigger_radius))
                });
                if !triggered {
                    continue;
                }
                index.query_radius_into(a.pos, blast_radius + MAX_ENEMY_RADIUS, &mut candidates);
                candidates.sort_unstable();
                for &id in &candidates {
                    let Some(enemy) = store.enemy_slots.get(&id).and_then(|&slot| store.enemies.get_mut(slot)) else {
                        continue;
                    };
                    if within(enemy.pos, enemy.radius, a.pos, blast_radius) {
                        hit_enemy(enemy, a.damage, a.element, a.status, true, params, events);
                    }
                }
                events.push(SimEvent::ImpactVfx {
                    pos: a.pos,
                    element: a.element,
                });
                a.expired = true;
            }
            AreaState::Vortex { pull } => {
                index.query_radius_into(a.pos, a.radius + MAX_ENEMY_RADIUS, &mut candidates);
                candidates.sort_unstable();
                for &id in &candidates {
                    let Some(enemy) = store.enemy_slots.get(&id).and_then(|&slot| store.enemies.get_mut(slot)) else {
                        continue;
                    };
                    if !within(enemy.pos, enemy.radius, a.pos, a.radius) {
                        continue;
                    }
                    if a.pulse_ready {
                        hit_enemy(enemy, a.damage, a.element, a.status, true, params, events);
                    }
                    // Drag toward the center without overshooting
                    let offset = a.pos - enemy.pos;
                    let dist = offset.length();
                    if dist > f32::EPSILON {
                        enemy.pos += offset / dist * (pull * params.dt).min(dist);
                    }
                }
            }
            AreaState::Static | AreaState::Follow { .. } | AreaState::Drift { .. } => {
                if !a.pulse_ready {
                    continue;
                }
                index.query_radius_into(a.pos, a.radius + MAX_ENEMY_RADIUS, &mut candidates);
                candidates.sort_unstable();
                for &id in &candidates {
                    let Some(enemy) = store.enemy_slots.get(&id).and_then(|&slot| store.enemies.get_mut(slot)) else {
                        continue;
                    };
                    if within(enemy.pos, enemy.radius, a.pos, a.radius) {
                        hit_enemy(enemy, a.damage, a.element, a.status, true, params, events);
                    }
                }
            }
        }
    }
}
