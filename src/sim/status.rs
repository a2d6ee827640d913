//! Timed status effects (damage over time and movement modifiers)
//!
//! Effects live on any damageable entity. Applying an effect whose kind is
//! already present merges into it: duration becomes the longer of the two and
//! damage/magnitude the larger, so repeated hits never stack independently.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::FREEZE_SPEED_FACTOR;

/// Status effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Burn,
    Chill,
    Freeze,
    Poison,
    Shock,
}

impl StatusKind {
    /// Default seconds between damage ticks
    pub fn default_tick_interval(self) -> f32 {
        match self {
            StatusKind::Burn => 0.5,
            StatusKind::Poison => 1.0,
            StatusKind::Shock => 0.25,
            StatusKind::Chill | StatusKind::Freeze => 1.0,
        }
    }
}

/// A single timed effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// Damage per tick (0 for pure movement modifiers)
    pub damage: f32,
    /// Seconds remaining
    pub remaining: f32,
    /// Seconds between damage ticks
    pub tick_interval: f32,
    /// Seconds accumulated since the last damage tick
    pub since_tick: f32,
    /// Magnitude, e.g. slow fraction for chill
    pub value: f32,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, damage: f32, duration: f32, value: f32) -> Self {
        Self {
            kind,
            damage: damage.max(0.0),
            remaining: duration.max(0.0),
            tick_interval: kind.default_tick_interval(),
            since_tick: 0.0,
            value,
        }
    }

    pub fn burn(damage: f32, duration: f32) -> Self {
        Self::new(StatusKind::Burn, damage, duration, 0.0)
    }

    pub fn poison(damage: f32, duration: f32) -> Self {
        Self::new(StatusKind::Poison, damage, duration, 0.0)
    }

    pub fn shock(damage: f32, duration: f32) -> Self {
        Self::new(StatusKind::Shock, damage, duration, 0.0)
    }

    /// Slow by `value` (0.3 = 30% slower)
    pub fn chill(value: f32, duration: f32) -> Self {
        Self::new(StatusKind::Chill, 0.0, duration, value.clamp(0.0, 1.0))
    }

    pub fn freeze(duration: f32) -> Self {
        Self::new(StatusKind::Freeze, 0.0, duration, 0.0)
    }

    #[inline]
    pub fn is_damaging(&self) -> bool {
        matches!(self.kind, StatusKind::Burn | StatusKind::Poison | StatusKind::Shock) && self.damage > 0.0
    }
}

/// Anything that can take damage and carry status effects
pub trait Damageable {
    fn position(&self) -> Vec2;
    fn hp(&self) -> f32;
    fn set_hp(&mut self, hp: f32);
    fn defense(&self) -> f32;
    fn effects(&self) -> &[StatusEffect];
    fn effects_mut(&mut self) -> &mut Vec<StatusEffect>;
}

/// Damage left after defense, never below 1
#[inline]
pub fn mitigate(raw: f32, defense: f32) -> f32 {
    (raw - defense.max(0.0)).max(1.0)
}

/// Subtract mitigated damage from hp (floored at 0) and return the amount dealt
pub fn deal_damage<T: Damageable + ?Sized>(target: &mut T, raw: f32) -> f32 {
    let amount = mitigate(raw, target.defense());
    let hp = (target.hp() - amount).max(0.0);
    target.set_hp(hp);
    amount
}

/// Merge-or-insert an effect by kind
pub fn apply<T: Damageable + ?Sized>(target: &mut T, effect: StatusEffect) {
    if effect.remaining <= 0.0 {
        return;
    }
    let effects = target.effects_mut();
    match effects.iter_mut().find(|e| e.kind == effect.kind) {
        Some(existing) => {
            existing.remaining = existing.remaining.max(effect.remaining);
            existing.damage = existing.damage.max(effect.damage);
            existing.value = existing.value.max(effect.value);
        }
        None => effects.push(effect),
    }
}

/// A damage tick produced by [`tick`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusDamage {
    pub kind: StatusKind,
    pub amount: f32,
    pub pos: Vec2,
}

/// Advance effect timers by `dt`, apply due damage ticks and drop expired
/// effects. Every damage tick is reported through `on_damage`.
pub fn tick<T: Damageable + ?Sized>(target: &mut T, dt: f32, mut on_damage: impl FnMut(StatusDamage)) {
    if target.effects().is_empty() {
        return;
    }
    let defense = target.defense();
    let pos = target.position();
    let mut total = 0.0;

    for effect in target.effects_mut().iter_mut() {
        let active = dt.min(effect.remaining);
        effect.remaining -= dt;
        if !effect.is_damaging() {
            continue;
        }
        effect.since_tick += active;
        let interval = effect.tick_interval.max(f32::EPSILON);
        while effect.since_tick >= interval {
            effect.since_tick -= interval;
            let amount = mitigate(effect.damage, defense);
            total += amount;
            on_damage(StatusDamage {
                kind: effect.kind,
                amount,
                pos,
            });
        }
    }

    target.effects_mut().retain(|e| e.remaining > 0.0);
    if total > 0.0 {
        let hp = (target.hp() - total).max(0.0);
        target.set_hp(hp);
    }
}

/// Movement multiplier from the current effects. Freeze wins over chill.
pub fn speed_multiplier(effects: &[StatusEffect]) -> f32 {
    if effects.iter().any(|e| e.kind == StatusKind::Freeze && e.remaining > 0.0) {
        return FREEZE_SPEED_FACTOR;
    }
    effects
        .iter()
        .filter(|e| e.kind == StatusKind::Chill && e.remaining > 0.0)
        .map(|e| 1.0 - e.value.clamp(0.0, 1.0))
        .fold(1.0, f32::min)
}
