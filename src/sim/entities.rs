//! Entity records and the entity store
//!
//! The store exclusively owns every entity collection. Cross references
//! (projectile owners, homing targets) are plain ids resolved through the
//! store each tick; "not found" is a normal transient state.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::projectile::{Area, Projectile};
use super::status::{Damageable, StatusEffect};
use super::weapons::{Element, PassiveKind, WeaponKind};
use crate::consts::*;

/// Player stat block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub hp: f32,
    pub max_hp: f32,
    /// Attack power; 1.0 is baseline
    pub atk: f32,
    /// Flat damage reduction
    pub def: f32,
    /// Weapon interval multiplier (lower fires faster)
    pub fire_rate: f32,
    pub move_speed: f32,
    pub projectile_speed: f32,
    pub duration: f32,
    pub area: f32,
    /// Signed interval adjustment; -0.1 fires 10% faster
    pub cooldown: f32,
    /// Extra projectiles per volley
    pub amount: u32,
    pub luck: f32,
    /// Remaining revives
    pub revival: u32,
    pub xp: u32,
    pub max_xp: u32,
    pub level: u32,
    pub gold: u64,
    pub pickup_range: f32,
    /// Hp restored per second
    pub hp_regen: f32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            hp: PLAYER_BASE_HP,
            max_hp: PLAYER_BASE_HP,
            atk: 1.0,
            def: 0.0,
            fire_rate: 1.0,
            move_speed: PLAYER_BASE_SPEED,
            projectile_speed: 1.0,
            duration: 1.0,
            area: 1.0,
            cooldown: 0.0,
            amount: 0,
            luck: 1.0,
            revival: 0,
            xp: 0,
            max_xp: xp_for_level(1),
            level: 1,
            gold: 0,
            pickup_range: PLAYER_PICKUP_RANGE,
            hp_regen: 0.0,
        }
    }
}

/// XP needed to advance from `level` to the next
pub fn xp_for_level(level: u32) -> u32 {
    match level {
        0..=19 => 5 + level * 10,
        20..=39 => 5 + level * 13,
        _ => 5 + level * 16,
    }
}

/// A weapon the player carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveWeapon {
    pub kind: WeaponKind,
    /// 1..=8
    pub level: u8,
    /// Seconds accumulated toward the next shot
    pub timer: f32,
    /// Play-time of the last shot
    pub last_fired: f32,
}

impl ActiveWeapon {
    pub fn new(kind: WeaponKind) -> Self {
        Self {
            kind,
            level: 1,
            timer: 0.0,
            last_fired: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveInstance {
    pub kind: PassiveKind,
    /// 1..=5
    pub level: u8,
}

/// The player-controlled head of the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub pos: Vec2,
    pub radius: f32,
    /// Last non-zero movement direction (unit length)
    pub facing: Vec2,
    pub stats: Stats,
    pub weapons: Vec<ActiveWeapon>,
    pub passives: Vec<PassiveInstance>,
    /// Invulnerability seconds left
    pub iframes: f32,
    pub effects: Vec<StatusEffect>,
}

impl Player {
    pub fn new(id: u32, pos: Vec2) -> Self {
        Self {
            id,
            pos,
            radius: PLAYER_RADIUS,
            facing: Vec2::X,
            stats: Stats::default(),
            weapons: Vec::new(),
            passives: Vec::new(),
            iframes: 0.0,
            effects: Vec::new(),
        }
    }

    pub fn weapon(&self, kind: WeaponKind) -> Option<&ActiveWeapon> {
        self.weapons.iter().find(|w| w.kind == kind)
    }

    pub fn passive_level(&self, kind: PassiveKind) -> u8 {
        self.passives.iter().find(|p| p.kind == kind).map_or(0, |p| p.level)
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.stats.hp > 0.0
    }
}

impl Damageable for Player {
    fn position(&self) -> Vec2 {
        self.pos
    }
    fn hp(&self) -> f32 {
        self.stats.hp
    }
    fn set_hp(&mut self, hp: f32) {
        self.stats.hp = hp;
    }
    fn defense(&self) -> f32 {
        self.stats.def
    }
    fn effects(&self) -> &[StatusEffect] {
        &self.effects
    }
    fn effects_mut(&mut self) -> &mut Vec<StatusEffect> {
        &mut self.effects
    }
}

/// A weapon-bearing follower in the player's chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailSegment {
    pub id: u32,
    pub pos: Vec2,
    pub weapon: WeaponKind,
    pub element: Element,
    /// 1..=3
    pub tier: u8,
    pub fire_timer: f32,
    pub expired: bool,
}

impl TailSegment {
    pub fn new(id: u32, pos: Vec2, weapon: WeaponKind, tier: u8) -> Self {
        Self {
            id,
            pos,
            weapon,
            element: weapon.element(),
            tier: tier.clamp(1, MAX_TIER),
            fire_timer: 0.0,
            expired: false,
        }
    }

    /// Effective weapon level a segment of this tier fires at
    #[inline]
    pub fn weapon_level(&self) -> u8 {
        1 + (self.tier.clamp(1, MAX_TIER) - 1) * 3
    }
}

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Basic,
    Fast,
    Tank,
    Boss,
}

/// Base numbers for an enemy archetype
#[derive(Debug, Clone, Copy)]
pub struct EnemyProfile {
    pub hp: f32,
    pub speed: f32,
    pub damage: f32,
    pub defense: f32,
    pub radius: f32,
}

/// What killing an enemy pays out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reward {
    pub score: u64,
    pub gold: u64,
    pub xp_min: u32,
    pub xp_max: u32,
}

impl EnemyKind {
    pub fn profile(self) -> EnemyProfile {
        match self {
            EnemyKind::Basic => EnemyProfile { hp: 10.0, speed: 60.0, damage: 5.0, defense: 0.0, radius: 14.0 },
            EnemyKind::Fast => EnemyProfile { hp: 6.0, speed: 120.0, damage: 4.0, defense: 0.0, radius: 10.0 },
            EnemyKind::Tank => EnemyProfile { hp: 40.0, speed: 35.0, damage: 10.0, defense: 2.0, radius: 22.0 },
            EnemyKind::Boss => EnemyProfile { hp: 1500.0, speed: 45.0, damage: 25.0, defense: 5.0, radius: MAX_ENEMY_RADIUS },
        }
    }

    pub fn reward(self) -> Reward {
        match self {
            EnemyKind::Basic => Reward { score: 10, gold: 1, xp_min: 1, xp_max: 2 },
            EnemyKind::Fast => Reward { score: 15, gold: 1, xp_min: 1, xp_max: 3 },
            EnemyKind::Tank => Reward { score: 30, gold: 3, xp_min: 3, xp_max: 5 },
            EnemyKind::Boss => Reward { score: 500, gold: 50, xp_min: 40, xp_max: 60 },
        }
    }
}

/// A hostile entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub speed: f32,
    pub damage: f32,
    pub defense: f32,
    pub effects: Vec<StatusEffect>,
    pub expired: bool,
}

impl Enemy {
    /// New enemy with hp multiplied by `hp_scale`
    pub fn new(id: u32, kind: EnemyKind, pos: Vec2, hp_scale: f32) -> Self {
        let profile = kind.profile();
        let hp = (profile.hp * hp_scale.max(0.1)).max(1.0);
        Self {
            id,
            kind,
            pos,
            radius: profile.radius,
            hp,
            max_hp: hp,
            speed: profile.speed,
            damage: profile.damage,
            defense: profile.defense,
            effects: Vec::new(),
            expired: false,
        }
    }

    /// Still in play (not expired, not dead-awaiting-reward)
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.expired && self.hp > 0.0
    }
}

impl Damageable for Enemy {
    fn position(&self) -> Vec2 {
        self.pos
    }
    fn hp(&self) -> f32 {
        self.hp
    }
    fn set_hp(&mut self, hp: f32) {
        self.hp = hp;
    }
    fn defense(&self) -> f32 {
        self.defense
    }
    fn effects(&self) -> &[StatusEffect] {
        &self.effects
    }
    fn effects_mut(&mut self) -> &mut Vec<StatusEffect> {
        &mut self.effects
    }
}

/// Ground pickups other than xp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CollectibleKind {
    /// Adds a tail segment bearing this weapon
    Segment(WeaponKind),
    Heal(f32),
    /// Pulls every gem on the field to the player
    Magnet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collectible {
    pub id: u32,
    pub pos: Vec2,
    pub kind: CollectibleKind,
    pub expired: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpGem {
    pub id: u32,
    pub pos: Vec2,
    pub value: u32,
    pub magnetized: bool,
    pub expired: bool,
}

/// Read-only enemy lookup by id
#[derive(Clone, Copy)]
pub struct EnemyLookup<'a> {
    pub enemies: &'a [Enemy],
    slots: &'a HashMap<u32, usize>,
}

impl<'a> EnemyLookup<'a> {
    pub fn new(enemies: &'a [Enemy], slots: &'a HashMap<u32, usize>) -> Self {
        Self { enemies, slots }
    }

    /// Live enemy with this id, if any
    pub fn get(&self, id: u32) -> Option<&'a Enemy> {
        let enemies = self.enemies;
        self.slots
            .get(&id)
            .and_then(|&slot| enemies.get(slot))
            .filter(|e| e.id == id && e.is_live())
    }
}

/// Read-only view over the store handed to behaviors and weapon triggers
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    pub player: &'a Player,
    pub tail: &'a [TailSegment],
    pub enemies: EnemyLookup<'a>,
}

impl WorldView<'_> {
    /// Position of a live owner (the player or a tail segment)
    pub fn owner_position(&self, id: u32) -> Option<Vec2> {
        if id == self.player.id {
            return self.player.is_alive().then_some(self.player.pos);
        }
        self.tail.iter().find(|s| s.id == id && !s.expired).map(|s| s.pos)
    }
}

/// Owner of all entity collections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoredEntities")]
pub struct EntityStore {
    pub player: Player,
    /// Ordered head-to-tail
    pub tail: Vec<TailSegment>,
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub areas: Vec<Area>,
    pub collectibles: Vec<Collectible>,
    pub gems: Vec<XpGem>,
    /// Spawned mid-tick; joins the simulation next tick
    pending_projectiles: Vec<Projectile>,
    pending_areas: Vec<Area>,
    #[serde(skip)]
    pub(crate) enemy_slots: HashMap<u32, usize>,
    next_id: u32,
}

/// Serialized form of [`EntityStore`]; the id lookup is rebuilt on load
#[derive(Deserialize)]
struct StoredEntities {
    player: Player,
    tail: Vec<TailSegment>,
    enemies: Vec<Enemy>,
    projectiles: Vec<Projectile>,
    areas: Vec<Area>,
    collectibles: Vec<Collectible>,
    gems: Vec<XpGem>,
    pending_projectiles: Vec<Projectile>,
    pending_areas: Vec<Area>,
    next_id: u32,
}

impl From<StoredEntities> for EntityStore {
    fn from(stored: StoredEntities) -> Self {
        let mut store = Self {
            player: stored.player,
            tail: stored.tail,
            enemies: stored.enemies,
            projectiles: stored.projectiles,
            areas: stored.areas,
            collectibles: stored.collectibles,
            gems: stored.gems,
            pending_projectiles: stored.pending_projectiles,
            pending_areas: stored.pending_areas,
            enemy_slots: HashMap::new(),
            next_id: stored.next_id,
        };
        store.reindex_slots();
        store
    }
}

impl EntityStore {
    pub fn new(player_pos: Vec2) -> Self {
        let mut store = Self {
            player: Player::new(0, player_pos),
            tail: Vec::new(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            areas: Vec::new(),
            collectibles: Vec::new(),
            gems: Vec::new(),
            pending_projectiles: Vec::new(),
            pending_areas: Vec::new(),
            enemy_slots: HashMap::new(),
            next_id: 1,
        };
        store.player.id = store.next_entity_id();
        store
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn_enemy(&mut self, kind: EnemyKind, pos: Vec2, hp_scale: f32) -> u32 {
        let id = self.next_entity_id();
        self.enemy_slots.insert(id, self.enemies.len());
        self.enemies.push(Enemy::new(id, kind, pos, hp_scale));
        id
    }

    /// Append a segment at the end of the chain
    pub fn add_segment(&mut self, weapon: WeaponKind, tier: u8) -> u32 {
        let id = self.next_entity_id();
        let pos = self.tail.last().map_or(self.player.pos, |s| s.pos);
        self.tail.push(TailSegment::new(id, pos, weapon, tier));
        id
    }

    pub fn spawn_gem(&mut self, pos: Vec2, value: u32) {
        let id = self.next_entity_id();
        self.gems.push(XpGem {
            id,
            pos,
            value,
            magnetized: false,
            expired: false,
        });
    }

    pub fn spawn_collectible(&mut self, pos: Vec2, kind: CollectibleKind) {
        let id = self.next_entity_id();
        self.collectibles.push(Collectible {
            id,
            pos,
            kind,
            expired: false,
        });
    }

    /// Queue a projectile for the next tick
    pub fn queue_projectile(&mut self, mut projectile: Projectile) -> u32 {
        projectile.id = self.next_entity_id();
        let id = projectile.id;
        self.pending_projectiles.push(projectile);
        id
    }

    /// Queue an area for the next tick
    pub fn queue_area(&mut self, mut area: Area) -> u32 {
        area.id = self.next_entity_id();
        let id = area.id;
        self.pending_areas.push(area);
        id
    }

    pub fn enemies(&self) -> EnemyLookup<'_> {
        EnemyLookup::new(&self.enemies, &self.enemy_slots)
    }

    pub fn view(&self) -> WorldView<'_> {
        WorldView {
            player: &self.player,
            tail: &self.tail,
            enemies: self.enemies(),
        }
    }

    /// Live and queued projectiles/areas from `source` owned by `owner`
    pub fn count_owned(&self, owner: u32, source: WeaponKind) -> usize {
        let projectiles = self
            .projectiles
            .iter()
            .chain(&self.pending_projectiles)
            .filter(|p| !p.expired && p.owner == Some(owner) && p.source == source)
            .count();
        let areas = self
            .areas
            .iter()
            .chain(&self.pending_areas)
            .filter(|a| !a.expired && a.owner == Some(owner) && a.source == source)
            .count();
        projectiles + areas
    }

    /// Expire everything `owner` has out from `source` (or any source when `None`)
    pub fn retire_owned(&mut self, owner: u32, source: Option<WeaponKind>) {
        let matches = |o: Option<u32>, s: WeaponKind| o == Some(owner) && source.is_none_or(|src| src == s);
        for p in self.projectiles.iter_mut().chain(self.pending_projectiles.iter_mut()) {
            if matches(p.owner, p.source) {
                p.expired = true;
            }
        }
        for a in self.areas.iter_mut().chain(self.pending_areas.iter_mut()) {
            if matches(a.owner, a.source) {
                a.expired = true;
            }
        }
    }

    /// Remove every expired entity and rebuild the id -> slot map
    pub fn purge_expired(&mut self) {
        self.tail.retain(|s| !s.expired);
        self.enemies.retain(|e| !e.expired);
        self.projectiles.retain(|p| !p.expired);
        self.areas.retain(|a| !a.expired);
        self.collectibles.retain(|c| !c.expired);
        self.gems.retain(|g| !g.expired);
        self.reindex_slots();
    }

    /// Move queued spawns into the live collections
    pub fn flush_pending(&mut self) {
        self.projectiles
            .extend(self.pending_projectiles.drain(..).filter(|p| !p.expired));
        self.areas.extend(self.pending_areas.drain(..).filter(|a| !a.expired));
    }

    pub(crate) fn reindex_slots(&mut self) {
        self.enemy_slots.clear();
        self.enemy_slots
            .extend(self.enemies.iter().enumerate().map(|(slot, e)| (e.id, slot)));
    }
}
