//! Weapon stat resolution
//!
//! Turns a catalogue entry into the stat block a weapon actually fires with.
//! Four stages run in a fixed order because later stages scale the totals
//! of earlier ones:
//!
//! 1. level deltas on top of the base block
//! 2. passive items
//! 3. player global stats
//! 4. flat damage bonus from effective attack power
//!
//! Resolution is pure and cheap; it is re-run every time a weapon fires.

use super::entities::Player;
use super::weapons::{PassiveKind, WeaponKind, WeaponStats};
use crate::consts::MAX_WEAPON_LEVEL;

/// Flat damage added per point of attack power above 1.0
pub const ATK_DAMAGE_SCALE: f32 = 10.0;

/// Effective stat block for `kind` at `level` carried by `player`
pub fn resolve(player: &Player, kind: WeaponKind, level: u8) -> WeaponStats {
    let mut stats = level_scaled(kind, level);
    apply_passives(&mut stats, player);
    apply_player_stats(&mut stats, player);

    // Might adds straight to attack power before the bonus is taken
    let might = player.passive_level(PassiveKind::Might);
    let effective_atk = player.stats.atk + PassiveKind::Might.value_at(might);
    stats.damage = (stats.damage + (effective_atk - 1.0) * ATK_DAMAGE_SCALE).max(0.0);

    stats.attack_speed = stats.attack_speed.max(0.0);
    stats
}

/// Stage 1: base block plus the deltas for levels 2..=level
pub fn level_scaled(kind: WeaponKind, level: u8) -> WeaponStats {
    let def = kind.def();
    let mut stats = def.base;
    let level = level.clamp(1, MAX_WEAPON_LEVEL);
    for delta in def.levels.iter().take(level as usize - 1) {
        stats.accumulate(delta);
    }
    stats
}

fn apply_passives(stats: &mut WeaponStats, player: &Player) {
    for passive in &player.passives {
        let value = passive.kind.value_at(passive.level);
        match passive.kind {
            PassiveKind::Cooldown => stats.attack_speed *= 1.0 / (1.0 + value),
            PassiveKind::Duplicator => stats.count += value,
            PassiveKind::Bracer => stats.speed *= 1.0 + value,
            PassiveKind::Spellbinder => stats.duration *= 1.0 + value,
            PassiveKind::Candelabrador => {
                stats.size *= 1.0 + value;
                stats.explosion_radius *= 1.0 + value;
            }
            // Stage 4 or player stat passives
            PassiveKind::Might
            | PassiveKind::Armor
            | PassiveKind::HollowHeart
            | PassiveKind::Pummarola
            | PassiveKind::Wings
            | PassiveKind::Clover
            | PassiveKind::Attractorb => {}
        }
    }
}

fn apply_player_stats(stats: &mut WeaponStats, player: &Player) {
    let p = &player.stats;
    stats.attack_speed *= p.fire_rate * (1.0 + p.cooldown);
    stats.speed *= p.projectile_speed;
    stats.size *= p.area;
    stats.range *= p.area;
    stats.explosion_radius *= p.area;
    stats.duration *= p.duration;
    stats.count += p.amount as f32;
}
