//! Experience, level-ups, pickups and kill rewards

use glam::Vec2;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::entities::{ActiveWeapon, CollectibleKind, EnemyKind, PassiveInstance, Player, Stats, xp_for_level};
use super::state::{GamePhase, GameState, SimEvent};
use super::weapons::{PassiveKind, WeaponKind};
use crate::consts::*;

/// Hp restored by the fallback level-up reward
pub const LEVEL_UP_HEAL: f32 = 30.0;
/// Hp restored by a heal pickup
pub const HEAL_PICKUP: f32 = 20.0;
/// Extra reach for touching a collectible
pub const COLLECTIBLE_RADIUS: f32 = 14.0;
/// Drop chance per regular kill at luck 1.0
pub const DROP_CHANCE: f32 = 0.04;

/// A reward offered on level-up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LevelUpChoice {
    NewWeapon(WeaponKind),
    UpgradeWeapon(WeaponKind),
    NewPassive(PassiveKind),
    UpgradePassive(PassiveKind),
    /// Attach a tier-1 segment bearing this weapon
    Segment(WeaponKind),
    Heal(f32),
}

/// Add xp, rolling over into as many levels as it covers. Returns levels gained.
pub fn gain_xp(stats: &mut Stats, amount: u32) -> u32 {
    stats.xp = stats.xp.saturating_add(amount);
    let mut gained = 0;
    while stats.max_xp > 0 && stats.xp >= stats.max_xp {
        stats.xp -= stats.max_xp;
        stats.level += 1;
        stats.max_xp = xp_for_level(stats.level);
        gained += 1;
    }
    gained
}

fn random_base_weapon<R: Rng + ?Sized>(rng: &mut R) -> WeaponKind {
    WeaponKind::BASE[rng.random_range(0..WeaponKind::BASE.len())]
}

/// Up to [`LEVEL_UP_CHOICES`] distinct rewards for `player`
pub fn roll_choices(player: &Player, rng: &mut impl Rng) -> Vec<LevelUpChoice> {
    let mut pool = Vec::new();

    for w in &player.weapons {
        if w.level < MAX_WEAPON_LEVEL {
            pool.push(LevelUpChoice::UpgradeWeapon(w.kind));
        }
    }
    if player.weapons.len() < MAX_WEAPONS {
        pool.extend(
            WeaponKind::BASE
                .iter()
                .filter(|k| player.weapon(**k).is_none())
                .map(|&k| LevelUpChoice::NewWeapon(k)),
        );
    }
    for p in &player.passives {
        if p.level < MAX_PASSIVE_LEVEL {
            pool.push(LevelUpChoice::UpgradePassive(p.kind));
        }
    }
    if player.passives.len() < MAX_PASSIVES {
        pool.extend(
            PassiveKind::ALL
                .iter()
                .filter(|k| player.passive_level(**k) == 0)
                .map(|&k| LevelUpChoice::NewPassive(k)),
        );
    }
    pool.push(LevelUpChoice::Segment(random_base_weapon(rng)));

    pool.shuffle(rng);
    pool.truncate(LEVEL_UP_CHOICES);
    if pool.is_empty() {
        pool.push(LevelUpChoice::Heal(LEVEL_UP_HEAL));
    }
    pool
}

/// Player stat change from one level of a passive
fn apply_passive_level(stats: &mut Stats, kind: PassiveKind) {
    let step = kind.value_per_level();
    match kind {
        PassiveKind::Armor => stats.def += step,
        PassiveKind::HollowHeart => {
            let bonus = PLAYER_BASE_HP * step;
            stats.max_hp += bonus;
            stats.hp += bonus;
        }
        PassiveKind::Pummarola => stats.hp_regen += step,
        PassiveKind::Wings => stats.move_speed += PLAYER_BASE_SPEED * step,
        PassiveKind::Clover => stats.luck += step,
        PassiveKind::Attractorb => stats.pickup_range += PLAYER_PICKUP_RANGE * step,
        // Resolved per weapon by the stat pipeline
        PassiveKind::Might
        | PassiveKind::Cooldown
        | PassiveKind::Duplicator
        | PassiveKind::Bracer
        | PassiveKind::Spellbinder
        | PassiveKind::Candelabrador => {}
    }
}

/// Apply a level-up reward to the run
pub fn apply_choice(state: &mut GameState, choice: LevelUpChoice) {
    let store = &mut state.entities;
    let player = &mut store.player;
    match choice {
        LevelUpChoice::NewWeapon(kind) => {
            if player.weapon(kind).is_none() && player.weapons.len() < MAX_WEAPONS {
                player.weapons.push(ActiveWeapon::new(kind));
            }
        }
        LevelUpChoice::UpgradeWeapon(kind) => {
            if let Some(w) = player.weapons.iter_mut().find(|w| w.kind == kind) {
                w.level = (w.level + 1).min(MAX_WEAPON_LEVEL);
            }
        }
        LevelUpChoice::NewPassive(kind) => {
            if player.passive_level(kind) == 0 && player.passives.len() < MAX_PASSIVES {
                player.passives.push(PassiveInstance { kind, level: 1 });
                apply_passive_level(&mut player.stats, kind);
            }
        }
        LevelUpChoice::UpgradePassive(kind) => {
            if let Some(p) = player.passives.iter_mut().find(|p| p.kind == kind) {
                if p.level < MAX_PASSIVE_LEVEL {
                    p.level += 1;
                    apply_passive_level(&mut player.stats, kind);
                }
            }
        }
        LevelUpChoice::Segment(kind) => {
            store.add_segment(kind, 1);
        }
        LevelUpChoice::Heal(amount) => {
            player.stats.hp = (player.stats.hp + amount).min(player.stats.max_hp);
        }
    }
}

/// Offer the next pending level-up, if any
pub fn open_level_up(state: &mut GameState) {
    if state.phase != GamePhase::Playing || state.pending_level_ups == 0 {
        return;
    }
    state.level_up_choices = roll_choices(&state.entities.player, &mut state.rng);
    state.phase = GamePhase::LevelUp;
}

/// Take choice `index` from the current offer. Out-of-range is a no-op.
pub fn choose_level_up(state: &mut GameState, index: usize) {
    if state.phase != GamePhase::LevelUp {
        return;
    }
    let Some(&choice) = state.level_up_choices.get(index) else {
        log::debug!(
            "Ignoring level-up choice {index} ({} on offer)",
            state.level_up_choices.len()
        );
        return;
    };
    apply_choice(state, choice);
    log::info!("Level-up reward: {choice:?}");

    state.level_up_choices.clear();
    state.pending_level_ups = state.pending_level_ups.saturating_sub(1);
    state.phase = GamePhase::Playing;
    open_level_up(state);
}

fn award_xp(state: &mut GameState, amount: u32) {
    let stats = &mut state.entities.player.stats;
    let gained = gain_xp(stats, amount);
    for i in 0..gained {
        let level = stats.level - (gained - 1 - i);
        state.events.push(SimEvent::LevelUp { level });
        log::info!("Reached level {level}");
    }
    state.pending_level_ups += gained;
}

/// Move attracted gems and collect anything the player touches
pub fn update_pickups(state: &mut GameState, dt: f32) {
    let player_pos = state.entities.player.pos;
    let player_radius = state.entities.player.radius;
    let pickup_range = state.entities.player.stats.pickup_range;

    let mut taken = Vec::new();
    for c in state.entities.collectibles.iter_mut().filter(|c| !c.expired) {
        if c.pos.distance_squared(player_pos) <= (player_radius + COLLECTIBLE_RADIUS).powi(2) {
            c.expired = true;
            taken.push(c.kind);
        }
    }
    for kind in taken {
        collect(state, kind);
    }

    let mut xp = 0;
    for gem in state.entities.gems.iter_mut().filter(|g| !g.expired) {
        let offset = player_pos - gem.pos;
        if gem.magnetized || offset.length_squared() <= pickup_range * pickup_range {
            gem.magnetized = true;
            let dist = offset.length();
            let step = (GEM_SPEED * dt).min(dist);
            if dist > f32::EPSILON {
                gem.pos += offset / dist * step;
            }
        }
        if gem.pos.distance_squared(player_pos) <= player_radius * player_radius {
            gem.expired = true;
            xp += gem.value;
        }
    }

    if xp > 0 {
        award_xp(state, xp);
    }
}

fn collect(state: &mut GameState, kind: CollectibleKind) {
    let store = &mut state.entities;
    match kind {
        CollectibleKind::Segment(weapon) => {
            store.add_segment(weapon, 1);
        }
        CollectibleKind::Heal(amount) => {
            let stats = &mut store.player.stats;
            stats.hp = (stats.hp + amount).min(stats.max_hp);
        }
        CollectibleKind::Magnet => {
            for gem in &mut store.gems {
                gem.magnetized = true;
            }
        }
    }
}

/// Expire downed enemies exactly once and pay out their rewards
pub fn reap_enemies(state: &mut GameState) {
    let mut downed: Vec<(u32, EnemyKind, Vec2)> = Vec::new();
    for e in state.entities.enemies.iter_mut() {
        if e.hp <= 0.0 && !e.expired {
            e.expired = true;
            downed.push((e.id, e.kind, e.pos));
        }
    }

    for (id, kind, pos) in downed {
        let reward = kind.reward();
        state.score += reward.score;
        state.kills += 1;
        state.entities.player.stats.gold += reward.gold;
        let xp = state.rng.random_range(reward.xp_min..=reward.xp_max.max(reward.xp_min));
        state.entities.spawn_gem(pos, xp);

        if let Some(drop) = roll_drop(kind, state.entities.player.stats.luck, &mut state.rng) {
            state.entities.spawn_collectible(pos, drop);
        }
        if kind == EnemyKind::Boss {
            log::info!("Boss defeated at {:.0}s", state.time);
        }

        state.events.push(SimEvent::DeathVfx { pos, kind });
        state.events.push(SimEvent::EnemyKilled { id, kind });
    }
}

/// Loot for a kill; bosses always drop a segment
fn roll_drop(kind: EnemyKind, luck: f32, rng: &mut impl Rng) -> Option<CollectibleKind> {
    if kind == EnemyKind::Boss {
        return Some(CollectibleKind::Segment(random_base_weapon(rng)));
    }
    if rng.random::<f32>() >= DROP_CHANCE * luck.max(0.0) {
        return None;
    }
    let roll: f32 = rng.random();
    Some(if roll < 0.5 {
        CollectibleKind::Segment(random_base_weapon(rng))
    } else if roll < 0.8 {
        CollectibleKind::Heal(HEAL_PICKUP)
    } else {
        CollectibleKind::Magnet
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn state() -> GameState {
        GameState::new(Settings {
            seed: Some(42),
            ..Settings::default()
        })
    }

    #[test]
    fn test_gain_xp_rolls_over_levels() {
        let mut stats = Stats::default();
        let first = stats.max_xp;
        let gained = gain_xp(&mut stats, first + xp_for_level(2) + 3);
        assert_eq!(gained, 2);
        assert_eq!(stats.level, 3);
        assert_eq!(stats.xp, 3);
        assert_eq!(stats.max_xp, xp_for_level(3));
    }

    #[test]
    fn test_choices_are_distinct_and_bounded() {
        let player = Player::new(1, Vec2::ZERO);
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..20 {
            let choices = roll_choices(&player, &mut rng);
            assert_eq!(choices.len(), LEVEL_UP_CHOICES);
            for (i, a) in choices.iter().enumerate() {
                assert!(choices[i + 1..].iter().all(|b| b != a));
            }
        }
    }

    #[test]
    fn test_out_of_range_choice_is_ignored() {
        let mut state = state();
        state.pending_level_ups = 1;
        open_level_up(&mut state);
        assert!(state.is_level_up_pending());
        let offered = state.level_up_choices().to_vec();

        choose_level_up(&mut state, 99);
        assert!(state.is_level_up_pending());
        assert_eq!(state.level_up_choices(), offered.as_slice());

        choose_level_up(&mut state, 0);
        assert_eq!(state.phase(), GamePhase::Playing);
        assert_eq!(state.pending_level_ups, 0);
    }

    #[test]
    fn test_passive_choice_updates_player_stats() {
        let mut state = state();
        apply_choice(&mut state, LevelUpChoice::NewPassive(PassiveKind::HollowHeart));
        apply_choice(&mut state, LevelUpChoice::UpgradePassive(PassiveKind::HollowHeart));
        let stats = &state.player().stats;
        assert_eq!(stats.max_hp, PLAYER_BASE_HP + 40.0);
        assert_eq!(state.player().passive_level(PassiveKind::HollowHeart), 2);
    }

    #[test]
    fn test_gems_home_in_and_grant_xp() {
        let mut state = state();
        let reach = state.player().stats.pickup_range - 1.0;
        state.entities.spawn_gem(Vec2::new(reach, 0.0), 3);
        state.entities.spawn_gem(Vec2::new(1500.0, 0.0), 3);
        for _ in 0..60 {
            update_pickups(&mut state, 1.0 / 60.0);
        }
        assert_eq!(state.player().stats.xp, 3);
        assert!(!state.gems()[1].expired, "out of range gems stay put");
        assert_eq!(state.gems()[1].pos, Vec2::new(1500.0, 0.0));
    }

    #[test]
    fn test_magnet_pulls_every_gem() {
        let mut state = state();
        state.entities.spawn_gem(Vec2::new(800.0, 0.0), 1);
        state.entities.spawn_collectible(Vec2::ZERO, CollectibleKind::Magnet);
        update_pickups(&mut state, 1.0 / 60.0);
        assert!(state.gems()[0].magnetized);
        assert!(state.gems()[0].pos.x < 800.0);
    }

    #[test]
    fn test_segment_pickup_extends_tail() {
        let mut state = state();
        state
            .entities
            .spawn_collectible(Vec2::new(5.0, 0.0), CollectibleKind::Segment(WeaponKind::Axe));
        update_pickups(&mut state, 1.0 / 60.0);
        assert_eq!(state.tail().len(), 1);
        assert_eq!(state.tail()[0].weapon, WeaponKind::Axe);
    }

    #[test]
    fn test_reap_pays_once() {
        let mut state = state();
        state.entities.spawn_enemy(EnemyKind::Tank, Vec2::new(300.0, 0.0), 1.0);
        state.entities.enemies[0].hp = 0.0;

        reap_enemies(&mut state);
        reap_enemies(&mut state);

        let reward = EnemyKind::Tank.reward();
        assert_eq!(state.score(), reward.score);
        assert_eq!(state.gold(), reward.gold);
        assert_eq!(state.kills, 1);
        assert_eq!(state.gems().len(), 1);
        assert!((reward.xp_min..=reward.xp_max).contains(&state.gems()[0].value));
        let events = state.drain_events();
        assert_eq!(
            events.iter().filter(|e| matches!(e, SimEvent::EnemyKilled { .. })).count(),
            1
        );
    }

    #[test]
    fn test_boss_always_drops_segment() {
        let mut rng = Pcg32::seed_from_u64(9);
        for _ in 0..10 {
            assert!(matches!(
                roll_drop(EnemyKind::Boss, 0.0, &mut rng),
                Some(CollectibleKind::Segment(_))
            ));
        }
        assert!(roll_drop(EnemyKind::Basic, 0.0, &mut rng).is_none());
    }

    #[test]
    fn test_lucky_drops_cover_every_pickup() {
        let mut rng = Pcg32::seed_from_u64(4);
        let (mut segments, mut heals, mut magnets) = (0, 0, 0);
        for _ in 0..1000 {
            // Luck high enough that every roll drops
            match roll_drop(EnemyKind::Basic, 100.0, &mut rng) {
                Some(CollectibleKind::Segment(weapon)) => {
                    assert!(WeaponKind::BASE.contains(&weapon));
                    segments += 1;
                }
                Some(CollectibleKind::Heal(amount)) => {
                    assert_eq!(amount, HEAL_PICKUP);
                    heals += 1;
                }
                Some(CollectibleKind::Magnet) => magnets += 1,
                None => panic!("a guaranteed drop was skipped"),
            }
        }
        assert!(segments > heals && heals > magnets && magnets > 0);
    }
}
