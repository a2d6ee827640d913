//! Projectile and area entities
//!
//! Shared fields (position, damage, penetration, expiry) live on the record;
//! behavior-specific state lives in a per-behavior variant so each state
//! machine only sees the fields it needs. The behavior tag is derived from the
//! variant, never stored separately.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::status::StatusEffect;
use super::weapons::{Element, WeaponKind};
use crate::polar_to_cartesian;

/// Seconds each status from a hit lasts
pub const BURN_DURATION: f32 = 3.0;
pub const POISON_DURATION: f32 = 4.0;
pub const SHOCK_DURATION: f32 = 1.0;
pub const CHILL_DURATION: f32 = 2.0;

/// Projectile update patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileBehavior {
    Normal,
    Linear,
    Arc,
    Bounce,
    Homing,
    Bat,
    Chakram,
    GravityOrb,
    Return,
    Chain,
    Bottle,
    Orbit,
    OrbitStab,
    Blossom,
    Beam,
    Flame,
}

impl ProjectileBehavior {
    /// Tethered patterns follow an owner and never leave by going out of bounds
    pub fn is_tethered(self) -> bool {
        matches!(
            self,
            ProjectileBehavior::Orbit | ProjectileBehavior::OrbitStab | ProjectileBehavior::Blossom | ProjectileBehavior::Beam
        )
    }

    /// Area-like and orbital patterns keep their penetration on contact
    pub fn consumes_penetration(self) -> bool {
        matches!(
            self,
            ProjectileBehavior::Normal
                | ProjectileBehavior::Linear
                | ProjectileBehavior::Arc
                | ProjectileBehavior::Bounce
                | ProjectileBehavior::Homing
                | ProjectileBehavior::Bat
                | ProjectileBehavior::Return
        )
    }

    /// Patterns damaged by plain body contact in the combat pass.
    /// The rest deliver damage through their own state machine.
    pub fn uses_contact(self) -> bool {
        !matches!(
            self,
            ProjectileBehavior::Bottle | ProjectileBehavior::OrbitStab | ProjectileBehavior::Blossom | ProjectileBehavior::Beam
        )
    }
}

/// Area update patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaBehavior {
    Static,
    Follow,
    Vortex,
    Drift,
    Trap,
}

/// Status effects carried by a hit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Burn damage per tick
    pub burn: f32,
    /// Poison damage per tick
    pub poison: f32,
    /// Shock damage per tick
    pub shock: f32,
    /// Slow fraction
    pub chill: f32,
    /// Freeze duration (seconds)
    pub freeze: f32,
}

impl StatusPayload {
    pub fn is_empty(&self) -> bool {
        self.burn <= 0.0 && self.poison <= 0.0 && self.shock <= 0.0 && self.chill <= 0.0 && self.freeze <= 0.0
    }

    pub fn effects(&self) -> impl Iterator<Item = StatusEffect> {
        [
            (self.burn > 0.0).then(|| StatusEffect::burn(self.burn, BURN_DURATION)),
            (self.poison > 0.0).then(|| StatusEffect::poison(self.poison, POISON_DURATION)),
            (self.shock > 0.0).then(|| StatusEffect::shock(self.shock, SHOCK_DURATION)),
            (self.chill > 0.0).then(|| StatusEffect::chill(self.chill, CHILL_DURATION)),
            (self.freeze > 0.0).then(|| StatusEffect::freeze(self.freeze)),
        ]
        .into_iter()
        .flatten()
    }
}

/// Target acquisition for homing patterns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seeker {
    pub target: Option<u32>,
    /// Radians per second
    pub turn_rate: f32,
    pub search_radius: f32,
}

impl Seeker {
    pub fn new(target: Option<u32>, turn_rate: f32, search_radius: f32) -> Self {
        Self {
            target,
            turn_rate,
            search_radius,
        }
    }
}

/// Binding of a tethered projectile to its owner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tether {
    pub owner: u32,
    pub radius: f32,
    /// Radians per second
    pub angular_speed: f32,
    pub slot: u32,
    pub slots: u32,
    /// Seconds the owner has been unresolvable
    pub orphan_time: f32,
}

impl Tether {
    pub fn new(owner: u32, radius: f32, angular_speed: f32, slot: u32, slots: u32) -> Self {
        Self {
            owner,
            radius,
            angular_speed,
            slot,
            slots: slots.max(1),
            orphan_time: 0.0,
        }
    }

    /// Orbit angle from the shared simulation clock, so every instance of a
    /// weapon stays evenly spaced without per-instance drift
    pub fn slot_angle(&self, time: f32) -> f32 {
        let phase = (time * self.angular_speed) % TAU;
        phase + self.slot as f32 * TAU / self.slots as f32
    }

    /// Point on the orbit path for this slot
    pub fn anchor(&self, owner_pos: Vec2, time: f32) -> Vec2 {
        owner_pos + polar_to_cartesian(self.radius, self.slot_angle(time))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VortexSpec {
    pub radius: f32,
    pub duration: f32,
    pub tick_interval: f32,
    /// Units per second enemies are dragged toward the center
    pub pull: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PuddleSpec {
    pub radius: f32,
    pub duration: f32,
    pub tick_interval: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabSpec {
    pub trigger_radius: f32,
    pub reach: f32,
    pub thrust_speed: f32,
    pub recover_speed: f32,
    pub base_cooldown: f32,
    pub attack_speed_mult: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StabPhase {
    Orbit,
    Stab { target: u32, dir: Vec2, extended: f32 },
    Recover { dir: Vec2, extended: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlossomSpec {
    pub trigger_radius: f32,
    pub dash_speed: f32,
    pub chain_radius: f32,
    pub max_chain_hits: u32,
    pub base_cooldown: f32,
    pub attack_speed_mult: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlossomPhase {
    Orbit,
    Dash { target: u32, hits: u32, visited: Vec<u32> },
    Return,
}

/// Per-behavior projectile state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProjectileState {
    Normal { traveled: f32, max_range: f32 },
    Linear,
    Arc { vel: Vec2, floor_y: f32 },
    Bounce { bounces_left: u32 },
    Homing { seek: Seeker },
    Bat { seek: Seeker, flutter: f32 },
    Chakram { seek: Seeker, bounces_left: u32 },
    GravityOrb { seek: Seeker, traveled: f32, max_range: f32, vortex: VortexSpec },
    Return { traveled: f32, max_range: f32, returning: bool },
    Chain { seek: Seeker, hops_left: u32, chain_range: f32 },
    Bottle { from: Vec2, to: Vec2, flight: f32, elapsed: f32, height: f32, puddle: PuddleSpec },
    Orbit { tether: Tether },
    OrbitStab { tether: Tether, phase: StabPhase, cooldown: f32, spec: StabSpec },
    Blossom { tether: Tether, phase: BlossomPhase, cooldown: f32, spec: BlossomSpec },
    Beam {
        owner: u32,
        orphan_time: f32,
        length: f32,
        width: f32,
        tick_interval: f32,
        since_tick: f32,
        /// Set on the tick the beam deals damage
        firing: bool,
        turn_rate: f32,
    },
    Flame { vel: Vec2, drag: f32, rise: f32, base_radius: f32, growth: f32, opacity: f32 },
}

impl ProjectileState {
    pub fn behavior(&self) -> ProjectileBehavior {
        match self {
            ProjectileState::Normal { .. } => ProjectileBehavior::Normal,
            ProjectileState::Linear => ProjectileBehavior::Linear,
            ProjectileState::Arc { .. } => ProjectileBehavior::Arc,
            ProjectileState::Bounce { .. } => ProjectileBehavior::Bounce,
            ProjectileState::Homing { .. } => ProjectileBehavior::Homing,
            ProjectileState::Bat { .. } => ProjectileBehavior::Bat,
            ProjectileState::Chakram { .. } => ProjectileBehavior::Chakram,
            ProjectileState::GravityOrb { .. } => ProjectileBehavior::GravityOrb,
            ProjectileState::Return { .. } => ProjectileBehavior::Return,
            ProjectileState::Chain { .. } => ProjectileBehavior::Chain,
            ProjectileState::Bottle { .. } => ProjectileBehavior::Bottle,
            ProjectileState::Orbit { .. } => ProjectileBehavior::Orbit,
            ProjectileState::OrbitStab { .. } => ProjectileBehavior::OrbitStab,
            ProjectileState::Blossom { .. } => ProjectileBehavior::Blossom,
            ProjectileState::Beam { .. } => ProjectileBehavior::Beam,
            ProjectileState::Flame { .. } => ProjectileBehavior::Flame,
        }
    }
}

/// Recently struck enemy and the time left before it can be struck again
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitMark {
    pub enemy: u32,
    pub cooldown: f32,
}

/// A projectile entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    /// Weapon that fired this projectile
    pub source: WeaponKind,
    pub element: Element,
    pub pos: Vec2,
    /// Heading in radians
    pub angle: f32,
    pub speed: f32,
    pub radius: f32,
    pub damage: f32,
    /// Remaining enemies this projectile may pass through
    pub penetration: u32,
    /// Non-owning back-reference to the player or a tail segment
    pub owner: Option<u32>,
    pub age: f32,
    pub lifetime: Option<f32>,
    pub status: StatusPayload,
    /// Enemies struck recently (or ever, when `rehit_delay` is `None`)
    pub hits: Vec<HitMark>,
    pub rehit_delay: Option<f32>,
    pub expired: bool,
    pub state: ProjectileState,
}

impl Projectile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: WeaponKind,
        element: Element,
        pos: Vec2,
        angle: f32,
        speed: f32,
        radius: f32,
        damage: f32,
        penetration: u32,
        state: ProjectileState,
    ) -> Self {
        Self {
            id: 0,
            source,
            element,
            pos,
            angle,
            speed,
            radius: radius.max(1.0),
            damage,
            penetration: penetration.max(1),
            owner: None,
            age: 0.0,
            lifetime: None,
            status: StatusPayload::default(),
            hits: Vec::new(),
            rehit_delay: None,
            expired: false,
            state,
        }
    }

    pub fn with_owner(mut self, owner: u32) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_lifetime(mut self, seconds: f32) -> Self {
        self.lifetime = Some(seconds.max(0.0));
        self
    }

    pub fn with_status(mut self, status: StatusPayload) -> Self {
        self.status = status;
        self
    }

    pub fn with_rehit(mut self, delay: f32) -> Self {
        self.rehit_delay = Some(delay.max(0.0));
        self
    }

    #[inline]
    pub fn behavior(&self) -> ProjectileBehavior {
        self.state.behavior()
    }

    /// Unit heading vector
    #[inline]
    pub fn direction(&self) -> Vec2 {
        Vec2::new(self.angle.cos(), self.angle.sin())
    }

    #[inline]
    pub fn can_hit(&self, enemy: u32) -> bool {
        !self.hits.iter().any(|h| h.enemy == enemy)
    }

    pub fn remember_hit(&mut self, enemy: u32) {
        let cooldown = self.rehit_delay.unwrap_or(f32::INFINITY);
        match self.hits.iter_mut().find(|h| h.enemy == enemy) {
            Some(mark) => mark.cooldown = cooldown,
            None => self.hits.push(HitMark { enemy, cooldown }),
        }
    }

    /// Count down re-hit timers; only meaningful when `rehit_delay` is set
    pub fn tick_hits(&mut self, dt: f32) {
        if self.rehit_delay.is_none() {
            return;
        }
        for mark in &mut self.hits {
            mark.cooldown -= dt;
        }
        self.hits.retain(|m| m.cooldown > 0.0);
    }
}

/// Per-behavior area state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AreaState {
    Static,
    Follow { owner: u32, orphan_time: f32 },
    Vortex { pull: f32 },
    Drift { vel: Vec2, sway: f32 },
    Trap { trigger_radius: f32, blast_radius: f32 },
}

impl AreaState {
    pub fn behavior(&self) -> AreaBehavior {
        match self {
            AreaState::Static => AreaBehavior::Static,
            AreaState::Follow { .. } => AreaBehavior::Follow,
            AreaState::Vortex { .. } => AreaBehavior::Vortex,
            AreaState::Drift { .. } => AreaBehavior::Drift,
            AreaState::Trap { .. } => AreaBehavior::Trap,
        }
    }
}

/// A persistent damage zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: u32,
    pub source: WeaponKind,
    pub element: Element,
    pub pos: Vec2,
    pub radius: f32,
    /// Damage per pulse (or per detonation for traps)
    pub damage: f32,
    /// Seconds left
    pub remaining: f32,
    pub tick_interval: f32,
    pub since_tick: f32,
    /// Set on the tick the area pulses damage
    pub pulse_ready: bool,
    pub owner: Option<u32>,
    pub status: StatusPayload,
    pub expired: bool,
    pub state: AreaState,
}

impl Area {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: WeaponKind,
        element: Element,
        pos: Vec2,
        radius: f32,
        damage: f32,
        duration: f32,
        tick_interval: f32,
        state: AreaState,
    ) -> Self {
        Self {
            id: 0,
            source,
            element,
            pos,
            radius: radius.max(1.0),
            damage,
            remaining: duration.max(0.0),
            tick_interval: tick_interval.max(f32::EPSILON),
            // First pulse lands immediately
            since_tick: tick_interval,
            pulse_ready: false,
            owner: None,
            status: StatusPayload::default(),
            expired: false,
            state,
        }
    }

    pub fn with_status(mut self, status: StatusPayload) -> Self {
        self.status = status;
        self
    }

    pub fn with_owner(mut self, owner: u32) -> Self {
        self.owner = Some(owner);
        self
    }

    #[inline]
    pub fn behavior(&self) -> AreaBehavior {
        self.state.behavior()
    }
}
