//! Weapon and passive catalogue
//!
//! Every weapon has a base stat block and a list of per-level deltas
//! (entry `i` is added when reaching level `i + 2`). Fields left at zero in a
//! delta are no-ops. Firing turns a resolved stat block into a volley of
//! projectiles or areas; see [`fire`].

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::behavior::{self, tuning};
use super::entities::WorldView;
use super::projectile::{
    Area, AreaBehavior, AreaState, BlossomPhase, BlossomSpec, Projectile, ProjectileBehavior, ProjectileState,
    PuddleSpec, Seeker, StabPhase, StabSpec, StatusPayload, Tether, VortexSpec,
};
use super::spatial::SpatialIndex;
use crate::{heading, polar_to_cartesian};

/// Damage flavour, used for status payloads and impact effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Physical,
    Arcane,
    Fire,
    Ice,
    Lightning,
    Poison,
    Wind,
    Nature,
    Dark,
    Light,
}

/// All weapons: base weapons, 2-input synergies and 3-input evolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    MagicWand,
    Knife,
    Axe,
    RuneTracer,
    Boomerang,
    SpellOrb,
    Spear,
    Blossom,
    Laser,
    Flamethrower,
    Lightning,
    FireBottle,
    Garlic,
    FrostNova,
    Mine,
    BatSwarm,
    Chakram,
    GravityOrb,
    Shotgun,
    Tornado,
    // Synergies
    StormStaff,
    Frostfire,
    Glaive,
    Miasma,
    // Evolutions
    Sunbeam,
    ThousandPetals,
}

impl WeaponKind {
    /// Weapons that can be offered as pickups or level-up rewards
    pub const BASE: [WeaponKind; 20] = [
        WeaponKind::MagicWand,
        WeaponKind::Knife,
        WeaponKind::Axe,
        WeaponKind::RuneTracer,
        WeaponKind::Boomerang,
        WeaponKind::SpellOrb,
        WeaponKind::Spear,
        WeaponKind::Blossom,
        WeaponKind::Laser,
        WeaponKind::Flamethrower,
        WeaponKind::Lightning,
        WeaponKind::FireBottle,
        WeaponKind::Garlic,
        WeaponKind::FrostNova,
        WeaponKind::Mine,
        WeaponKind::BatSwarm,
        WeaponKind::Chakram,
        WeaponKind::GravityOrb,
        WeaponKind::Shotgun,
        WeaponKind::Tornado,
    ];

    pub fn name(self) -> &'static str {
        self.def().name
    }

    pub fn element(self) -> Element {
        self.def().element
    }

    /// Catalogue entry for this weapon
    pub fn def(self) -> WeaponDef {
        use WeaponKind::*;
        let z = WeaponStats::ZERO;
        match self {
            MagicWand => WeaponDef {
                name: "Magic Wand",
                element: Element::Arcane,
                pattern: FirePattern::Projectile(ProjectileBehavior::Homing),
                base: WeaponStats { damage: 10.0, attack_speed: 1.2, count: 1.0, size: 8.0, speed: 350.0, pierce: 1.0, range: 600.0, duration: 3.0, ..z },
                levels: &PROJECTILE_CURVE,
            },
            Knife => WeaponDef {
                name: "Knife",
                element: Element::Physical,
                pattern: FirePattern::Projectile(ProjectileBehavior::Linear),
                base: WeaponStats { damage: 6.5, attack_speed: 1.0, count: 1.0, size: 6.0, speed: 600.0, pierce: 1.0, duration: 2.0, ..z },
                levels: &PROJECTILE_CURVE,
            },
            Axe => WeaponDef {
                name: "Axe",
                element: Element::Physical,
                pattern: FirePattern::Projectile(ProjectileBehavior::Arc),
                base: WeaponStats { damage: 20.0, attack_speed: 2.0, count: 1.0, size: 14.0, speed: 180.0, pierce: 3.0, duration: 4.0, ..z },
                levels: &DAMAGE_CURVE,
            },
            RuneTracer => WeaponDef {
                name: "Rune Tracer",
                element: Element::Arcane,
                pattern: FirePattern::Projectile(ProjectileBehavior::Bounce),
                base: WeaponStats { damage: 8.0, attack_speed: 2.5, count: 1.0, size: 10.0, speed: 300.0, pierce: 50.0, duration: 5.0, bounce_count: 3.0, ..z },
                levels: &BOUNCE_CURVE,
            },
            Boomerang => WeaponDef {
                name: "Boomerang",
                element: Element::Physical,
                pattern: FirePattern::Projectile(ProjectileBehavior::Return),
                base: WeaponStats { damage: 12.0, attack_speed: 1.6, count: 1.0, size: 12.0, speed: 400.0, pierce: 5.0, range: 300.0, duration: 4.0, ..z },
                levels: &PROJECTILE_CURVE,
            },
            SpellOrb => WeaponDef {
                name: "Spell Orb",
                element: Element::Light,
                pattern: FirePattern::Projectile(ProjectileBehavior::Orbit),
                base: WeaponStats { damage: 8.0, attack_speed: 3.0, count: 2.0, size: 14.0, speed: 3.0, range: 90.0, duration: 6.0, tick_interval: 0.5, ..z },
                levels: &ORBIT_CURVE,
            },
            Spear => WeaponDef {
                name: "Spear",
                element: Element::Physical,
                pattern: FirePattern::Projectile(ProjectileBehavior::OrbitStab),
                base: WeaponStats { damage: 18.0, attack_speed: 2.5, count: 1.0, size: 10.0, speed: 2.0, range: 200.0, duration: 20.0, ..z },
                levels: &ORBIT_CURVE,
            },
            Blossom => WeaponDef {
                name: "Blossom",
                element: Element::Nature,
                pattern: FirePattern::Projectile(ProjectileBehavior::Blossom),
                base: WeaponStats { damage: 14.0, attack_speed: 3.0, count: 1.0, size: 10.0, speed: 2.5, range: 250.0, duration: 20.0, chain_count: 3.0, chain_range: 200.0, ..z },
                levels: &CHAIN_CURVE,
            },
            Laser => WeaponDef {
                name: "Laser",
                element: Element::Light,
                pattern: FirePattern::Projectile(ProjectileBehavior::Beam),
                base: WeaponStats { damage: 6.0, attack_speed: 4.0, count: 1.0, size: 10.0, range: 500.0, duration: 2.0, tick_interval: 0.2, ..z },
                levels: &DAMAGE_CURVE,
            },
            Flamethrower => WeaponDef {
                name: "Flamethrower",
                element: Element::Fire,
                pattern: FirePattern::Projectile(ProjectileBehavior::Flame),
                base: WeaponStats { damage: 4.0, attack_speed: 0.8, count: 6.0, size: 8.0, speed: 320.0, pierce: 1.0, duration: 0.7, burn: 2.0, ..z },
                levels: &STATUS_CURVE,
            },
            Lightning => WeaponDef {
                name: "Lightning",
                element: Element::Lightning,
                pattern: FirePattern::Projectile(ProjectileBehavior::Chain),
                base: WeaponStats { damage: 15.0, attack_speed: 1.8, count: 1.0, size: 8.0, speed: 900.0, pierce: 1.0, range: 500.0, duration: 2.0, shock: 1.0, chain_count: 3.0, chain_range: 180.0, ..z },
                levels: &CHAIN_CURVE,
            },
            FireBottle => WeaponDef {
                name: "Fire Bottle",
                element: Element::Fire,
                pattern: FirePattern::Projectile(ProjectileBehavior::Bottle),
                base: WeaponStats { damage: 5.0, attack_speed: 3.0, count: 1.0, size: 50.0, range: 350.0, duration: 3.0, burn: 2.0, tick_interval: 0.5, ..z },
                levels: &AREA_CURVE,
            },
            Garlic => WeaponDef {
                name: "Garlic",
                element: Element::Poison,
                pattern: FirePattern::Area(AreaBehavior::Follow),
                base: WeaponStats { damage: 4.0, attack_speed: 1.0, count: 1.0, size: 70.0, duration: 10.0, poison: 1.0, tick_interval: 0.5, ..z },
                levels: &AREA_CURVE,
            },
            FrostNova => WeaponDef {
                name: "Frost Nova",
                element: Element::Ice,
                pattern: FirePattern::Area(AreaBehavior::Static),
                base: WeaponStats { damage: 6.0, attack_speed: 4.0, count: 1.0, size: 120.0, duration: 0.6, chill: 0.3, freeze: 0.8, tick_interval: 0.3, ..z },
                levels: &STATUS_CURVE,
            },
            Mine => WeaponDef {
                name: "Mine",
                element: Element::Fire,
                pattern: FirePattern::Area(AreaBehavior::Trap),
                base: WeaponStats { damage: 40.0, attack_speed: 3.0, count: 1.0, size: 40.0, range: 150.0, duration: 15.0, explosion_radius: 120.0, ..z },
                levels: &AREA_CURVE,
            },
            BatSwarm => WeaponDef {
                name: "Bat Swarm",
                element: Element::Dark,
                pattern: FirePattern::Projectile(ProjectileBehavior::Bat),
                base: WeaponStats { damage: 7.0, attack_speed: 2.0, count: 3.0, size: 8.0, speed: 260.0, pierce: 2.0, range: 500.0, duration: 4.0, ..z },
                levels: &PROJECTILE_CURVE,
            },
            Chakram => WeaponDef {
                name: "Chakram",
                element: Element::Physical,
                pattern: FirePattern::Projectile(ProjectileBehavior::Chakram),
                base: WeaponStats { damage: 11.0, attack_speed: 2.0, count: 1.0, size: 12.0, speed: 380.0, pierce: 1.0, range: 500.0, duration: 5.0, bounce_count: 4.0, ..z },
                levels: &BOUNCE_CURVE,
            },
            GravityOrb => WeaponDef {
                name: "Gravity Orb",
                element: Element::Dark,
                pattern: FirePattern::Projectile(ProjectileBehavior::GravityOrb),
                base: WeaponStats { damage: 3.0, attack_speed: 5.0, count: 1.0, size: 14.0, speed: 200.0, range: 400.0, duration: 3.0, explosion_radius: 140.0, tick_interval: 0.4, ..z },
                levels: &AREA_CURVE,
            },
            Shotgun => WeaponDef {
                name: "Shotgun",
                element: Element::Physical,
                pattern: FirePattern::Projectile(ProjectileBehavior::Normal),
                base: WeaponStats { damage: 7.0, attack_speed: 1.5, count: 5.0, size: 6.0, speed: 550.0, pierce: 1.0, range: 350.0, duration: 2.0, ..z },
                levels: &PROJECTILE_CURVE,
            },
            Tornado => WeaponDef {
                name: "Tornado",
                element: Element::Wind,
                pattern: FirePattern::Area(AreaBehavior::Drift),
                base: WeaponStats { damage: 5.0, attack_speed: 4.0, count: 1.0, size: 60.0, speed: 120.0, duration: 5.0, tick_interval: 0.4, ..z },
                levels: &AREA_CURVE,
            },
            StormStaff => WeaponDef {
                name: "Storm Staff",
                element: Element::Lightning,
                pattern: FirePattern::Projectile(ProjectileBehavior::Chain),
                base: WeaponStats { damage: 22.0, attack_speed: 1.4, count: 1.0, size: 10.0, speed: 1000.0, pierce: 1.0, range: 600.0, duration: 2.0, shock: 2.0, chain_count: 6.0, chain_range: 240.0, ..z },
                levels: &CHAIN_CURVE,
            },
            Frostfire => WeaponDef {
                name: "Frostfire",
                element: Element::Ice,
                pattern: FirePattern::Area(AreaBehavior::Static),
                base: WeaponStats { damage: 8.0, attack_speed: 3.0, count: 1.0, size: 100.0, range: 400.0, duration: 3.0, burn: 3.0, chill: 0.4, freeze: 0.5, tick_interval: 0.4, ..z },
                levels: &STATUS_CURVE,
            },
            Glaive => WeaponDef {
                name: "Glaive",
                element: Element::Physical,
                pattern: FirePattern::Projectile(ProjectileBehavior::Chakram),
                base: WeaponStats { damage: 18.0, attack_speed: 1.5, count: 2.0, size: 14.0, speed: 450.0, pierce: 1.0, range: 600.0, duration: 6.0, bounce_count: 8.0, ..z },
                levels: &BOUNCE_CURVE,
            },
            Miasma => WeaponDef {
                name: "Miasma",
                element: Element::Poison,
                pattern: FirePattern::Area(AreaBehavior::Drift),
                base: WeaponStats { damage: 7.0, attack_speed: 3.5, count: 2.0, size: 80.0, speed: 100.0, duration: 6.0, poison: 3.0, tick_interval: 0.4, ..z },
                levels: &AREA_CURVE,
            },
            Sunbeam => WeaponDef {
                name: "Sunbeam",
                element: Element::Fire,
                pattern: FirePattern::Projectile(ProjectileBehavior::Beam),
                base: WeaponStats { damage: 12.0, attack_speed: 3.0, count: 2.0, size: 16.0, range: 700.0, duration: 3.0, burn: 4.0, tick_interval: 0.15, ..z },
                levels: &DAMAGE_CURVE,
            },
            ThousandPetals => WeaponDef {
                name: "Thousand Petals",
                element: Element::Nature,
                pattern: FirePattern::Projectile(ProjectileBehavior::Blossom),
                base: WeaponStats { damage: 26.0, attack_speed: 2.0, count: 3.0, size: 12.0, speed: 3.0, range: 300.0, duration: 20.0, chain_count: 8.0, chain_range: 260.0, ..z },
                levels: &CHAIN_CURVE,
            },
        }
    }
}

/// How a weapon delivers its damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirePattern {
    Projectile(ProjectileBehavior),
    Area(AreaBehavior),
}

/// Static description of a weapon
#[derive(Debug, Clone, Copy)]
pub struct WeaponDef {
    pub name: &'static str,
    pub element: Element,
    pub pattern: FirePattern,
    pub base: WeaponStats,
    /// Deltas for levels 2, 3, ... (missing levels add nothing)
    pub levels: &'static [WeaponStats],
}

/// A weapon stat block. Also used as an additive per-level delta.
///
/// `attack_speed` is the interval between shots in seconds (lower is faster).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub damage: f32,
    pub attack_speed: f32,
    pub count: f32,
    pub size: f32,
    pub speed: f32,
    pub pierce: f32,
    pub range: f32,
    pub duration: f32,
    pub burn: f32,
    pub poison: f32,
    pub shock: f32,
    pub chill: f32,
    pub freeze: f32,
    pub chain_count: f32,
    pub chain_range: f32,
    pub explosion_radius: f32,
    pub bounce_count: f32,
    pub tick_interval: f32,
}

impl WeaponStats {
    pub const ZERO: WeaponStats = WeaponStats {
        damage: 0.0,
        attack_speed: 0.0,
        count: 0.0,
        size: 0.0,
        speed: 0.0,
        pierce: 0.0,
        range: 0.0,
        duration: 0.0,
        burn: 0.0,
        poison: 0.0,
        shock: 0.0,
        chill: 0.0,
        freeze: 0.0,
        chain_count: 0.0,
        chain_range: 0.0,
        explosion_radius: 0.0,
        bounce_count: 0.0,
        tick_interval: 0.0,
    };

    /// Add a level delta field by field
    pub fn accumulate(&mut self, delta: &WeaponStats) {
        self.damage += delta.damage;
        self.attack_speed += delta.attack_speed;
        self.count += delta.count;
        self.size += delta.size;
        self.speed += delta.speed;
        self.pierce += delta.pierce;
        self.range += delta.range;
        self.duration += delta.duration;
        self.burn += delta.burn;
        self.poison += delta.poison;
        self.shock += delta.shock;
        self.chill += delta.chill;
        self.freeze += delta.freeze;
        self.chain_count += delta.chain_count;
        self.chain_range += delta.chain_range;
        self.explosion_radius += delta.explosion_radius;
        self.bounce_count += delta.bounce_count;
        self.tick_interval += delta.tick_interval;
    }

    /// Whole projectile count (at least one)
    #[inline]
    pub fn whole_count(&self) -> u32 {
        self.count.floor().max(1.0) as u32
    }

    pub fn status_payload(&self) -> StatusPayload {
        StatusPayload {
            burn: self.burn.max(0.0),
            poison: self.poison.max(0.0),
            shock: self.shock.max(0.0),
            chill: self.chill.clamp(0.0, 0.9),
            freeze: self.freeze.max(0.0),
        }
    }
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self::ZERO
    }
}

const Z: WeaponStats = WeaponStats::ZERO;

const PROJECTILE_CURVE: [WeaponStats; 7] = [
    WeaponStats { count: 1.0, ..Z },
    WeaponStats { damage: 5.0, ..Z },
    WeaponStats { count: 1.0, pierce: 1.0, ..Z },
    WeaponStats { damage: 5.0, ..Z },
    WeaponStats { count: 1.0, attack_speed: -0.1, ..Z },
    WeaponStats { damage: 5.0, pierce: 1.0, ..Z },
    WeaponStats { damage: 10.0, ..Z },
];

const DAMAGE_CURVE: [WeaponStats; 7] = [
    WeaponStats { damage: 5.0, ..Z },
    WeaponStats { count: 1.0, ..Z },
    WeaponStats { damage: 5.0, size: 2.0, ..Z },
    WeaponStats { pierce: 1.0, range: 50.0, ..Z },
    WeaponStats { damage: 5.0, attack_speed: -0.1, ..Z },
    WeaponStats { count: 1.0, ..Z },
    WeaponStats { damage: 10.0, ..Z },
];

const BOUNCE_CURVE: [WeaponStats; 7] = [
    WeaponStats { damage: 3.0, bounce_count: 1.0, ..Z },
    WeaponStats { speed: 40.0, ..Z },
    WeaponStats { count: 1.0, ..Z },
    WeaponStats { damage: 5.0, bounce_count: 1.0, ..Z },
    WeaponStats { duration: 0.5, speed: 40.0, ..Z },
    WeaponStats { count: 1.0, ..Z },
    WeaponStats { damage: 8.0, bounce_count: 2.0, ..Z },
];

const ORBIT_CURVE: [WeaponStats; 7] = [
    WeaponStats { count: 1.0, ..Z },
    WeaponStats { range: 10.0, size: 2.0, ..Z },
    WeaponStats { damage: 5.0, ..Z },
    WeaponStats { count: 1.0, ..Z },
    WeaponStats { damage: 5.0, speed: 0.5, ..Z },
    WeaponStats { count: 1.0, duration: 1.0, ..Z },
    WeaponStats { damage: 10.0, ..Z },
];

const AREA_CURVE: [WeaponStats; 7] = [
    WeaponStats { size: 8.0, ..Z },
    WeaponStats { damage: 3.0, ..Z },
    WeaponStats { size: 8.0, duration: 0.5, ..Z },
    WeaponStats { damage: 3.0, attack_speed: -0.2, ..Z },
    WeaponStats { size: 10.0, count: 1.0, ..Z },
    WeaponStats { damage: 5.0, ..Z },
    WeaponStats { size: 10.0, damage: 5.0, ..Z },
];

const STATUS_CURVE: [WeaponStats; 7] = [
    WeaponStats { damage: 3.0, burn: 1.0, ..Z },
    WeaponStats { duration: 0.2, ..Z },
    WeaponStats { chill: 0.05, size: 10.0, ..Z },
    WeaponStats { damage: 5.0, ..Z },
    WeaponStats { burn: 1.0, freeze: 0.2, ..Z },
    WeaponStats { damage: 5.0, count: 1.0, ..Z },
    WeaponStats { damage: 8.0, burn: 2.0, ..Z },
];

const CHAIN_CURVE: [WeaponStats; 7] = [
    WeaponStats { chain_count: 1.0, ..Z },
    WeaponStats { damage: 5.0, ..Z },
    WeaponStats { chain_range: 30.0, ..Z },
    WeaponStats { chain_count: 1.0, damage: 3.0, ..Z },
    WeaponStats { damage: 5.0, attack_speed: -0.15, ..Z },
    WeaponStats { chain_count: 1.0, count: 1.0, ..Z },
    WeaponStats { damage: 10.0, ..Z },
];

/// Passive items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassiveKind {
    /// +atk (feeds the flat damage bonus)
    Might,
    /// Shorter weapon intervals
    Cooldown,
    /// Extra projectiles
    Duplicator,
    /// Faster projectiles
    Bracer,
    /// Longer durations
    Spellbinder,
    /// Larger areas
    Candelabrador,
    Armor,
    HollowHeart,
    Pummarola,
    Wings,
    Clover,
    Attractorb,
}

impl PassiveKind {
    pub const ALL: [PassiveKind; 12] = [
        PassiveKind::Might,
        PassiveKind::Cooldown,
        PassiveKind::Duplicator,
        PassiveKind::Bracer,
        PassiveKind::Spellbinder,
        PassiveKind::Candelabrador,
        PassiveKind::Armor,
        PassiveKind::HollowHeart,
        PassiveKind::Pummarola,
        PassiveKind::Wings,
        PassiveKind::Clover,
        PassiveKind::Attractorb,
    ];

    /// Strength per passive level
    pub fn value_per_level(self) -> f32 {
        match self {
            PassiveKind::Might => 0.1,
            PassiveKind::Cooldown => 0.08,
            PassiveKind::Duplicator => 0.5,
            PassiveKind::Bracer => 0.1,
            PassiveKind::Spellbinder => 0.1,
            PassiveKind::Candelabrador => 0.1,
            PassiveKind::Armor => 1.0,
            PassiveKind::HollowHeart => 0.2,
            PassiveKind::Pummarola => 0.2,
            PassiveKind::Wings => 0.1,
            PassiveKind::Clover => 0.1,
            PassiveKind::Attractorb => 0.25,
        }
    }

    /// Total strength at `level`
    #[inline]
    pub fn value_at(self, level: u8) -> f32 {
        self.value_per_level() * level as f32
    }
}

/// Where a weapon fires from
#[derive(Debug, Clone, Copy)]
pub struct FireOrigin {
    /// Owning entity (player or tail segment)
    pub owner: u32,
    pub pos: Vec2,
    /// Unit facing used when a weapon has no target
    pub facing: Vec2,
}

/// Everything a single trigger produced
#[derive(Debug, Default)]
pub struct Volley {
    pub projectiles: Vec<Projectile>,
    pub areas: Vec<Area>,
    /// Existing tethered entities of this weapon/owner should be retired
    pub replaces_existing: bool,
}

impl Volley {
    #[inline]
    pub fn fired(&self) -> bool {
        !self.projectiles.is_empty() || !self.areas.is_empty()
    }
}

/// Fire `kind` once. `existing` counts live entities this weapon already has
/// out for this owner. Returns an empty volley (nothing fired) when the weapon
/// needs a target and none is in range, or its persistent set is complete.
pub fn fire(
    kind: WeaponKind,
    stats: &WeaponStats,
    origin: &FireOrigin,
    world: &WorldView<'_>,
    index: &SpatialIndex,
    existing: usize,
    rng: &mut impl Rng,
) -> Volley {
    let mut volley = Volley::default();
    let def = kind.def();
    let count = stats.whole_count();
    let status = stats.status_payload();
    let facing = if origin.facing.length_squared() > 0.0 {
        origin.facing.normalize()
    } else {
        Vec2::X
    };
    let search = stats.range.max(tuning::DEFAULT_SEARCH_RADIUS);
    let target = behavior::find_nearest_enemy(&world.enemies, index, origin.pos, search, |_| true);
    let aim = target
        .map(|(_, pos)| (pos - origin.pos).normalize_or_zero())
        .filter(|d| *d != Vec2::ZERO)
        .unwrap_or(facing);
    let aim_angle = heading(aim);
    let pierce = stats.pierce.max(1.0) as u32;

    let base = |angle: f32, state: ProjectileState| {
        Projectile::new(kind, def.element, origin.pos, angle, stats.speed, stats.size, stats.damage, pierce, state)
            .with_status(status)
    };

    match def.pattern {
        FirePattern::Projectile(behavior) => match behavior {
            ProjectileBehavior::Normal => {
                for i in 0..count {
                    let angle = aim_angle + spread_offset(i, count, tuning::SPREAD_STEP);
                    let state = ProjectileState::Normal {
                        traveled: 0.0,
                        max_range: stats.range,
                    };
                    volley.projectiles.push(base(angle, state).with_lifetime(stats.duration));
                }
            }
            ProjectileBehavior::Linear => {
                let side = facing.perp();
                for i in 0..count {
                    let offset = spread_offset(i, count, tuning::KNIFE_LANE_GAP);
                    let mut p = base(heading(facing), ProjectileState::Linear).with_lifetime(stats.duration);
                    p.pos += side * offset;
                    volley.projectiles.push(p);
                }
            }
            ProjectileBehavior::Arc => {
                for i in 0..count {
                    let dir = if i % 2 == 0 { 1.0 } else { -1.0 };
                    let vx = dir * stats.speed * (1.0 + 0.25 * (i / 2) as f32);
                    let vy = -tuning::ARC_LAUNCH_SPEED - 40.0 * i as f32;
                    let state = ProjectileState::Arc {
                        vel: Vec2::new(vx, vy),
                        floor_y: origin.pos.y + tuning::ARC_DROP_LIMIT,
                    };
                    volley.projectiles.push(base(heading(Vec2::new(vx, vy)), state).with_lifetime(stats.duration));
                }
            }
            ProjectileBehavior::Bounce => {
                for _ in 0..count {
                    let angle = rng.random_range(0.0..TAU);
                    let state = ProjectileState::Bounce {
                        bounces_left: stats.bounce_count.max(0.0) as u32,
                    };
                    volley.projectiles.push(base(angle, state).with_lifetime(stats.duration));
                }
            }
            ProjectileBehavior::Homing | ProjectileBehavior::Bat => {
                for i in 0..count {
                    let (angle, state) = if behavior == ProjectileBehavior::Homing {
                        let seek = Seeker::new(target.map(|(id, _)| id), tuning::HOMING_TURN_RATE, search);
                        (aim_angle + spread_offset(i, count, tuning::SPREAD_STEP), ProjectileState::Homing { seek })
                    } else {
                        let seek = Seeker::new(None, tuning::BAT_TURN_RATE, search);
                        let flutter = rng.random_range(0.0..TAU);
                        (rng.random_range(0.0..TAU), ProjectileState::Bat { seek, flutter })
                    };
                    volley.projectiles.push(base(angle, state).with_lifetime(stats.duration));
                }
            }
            ProjectileBehavior::Chakram => {
                for i in 0..count {
                    let state = ProjectileState::Chakram {
                        seek: Seeker::new(target.map(|(id, _)| id), tuning::CHAKRAM_TURN_RATE, search),
                        bounces_left: stats.bounce_count.max(1.0) as u32,
                    };
                    let angle = aim_angle + spread_offset(i, count, tuning::SPREAD_STEP * 2.0);
                    volley.projectiles.push(base(angle, state).with_lifetime(stats.duration));
                }
            }
            ProjectileBehavior::GravityOrb => {
                for i in 0..count {
                    let state = ProjectileState::GravityOrb {
                        seek: Seeker::new(target.map(|(id, _)| id), tuning::GRAVITY_ORB_TURN_RATE, search),
                        traveled: 0.0,
                        max_range: stats.range,
                        vortex: VortexSpec {
                            radius: stats.explosion_radius,
                            duration: stats.duration,
                            tick_interval: stats.tick_interval,
                            pull: tuning::VORTEX_PULL,
                        },
                    };
                    let angle = aim_angle + spread_offset(i, count, tuning::SPREAD_STEP);
                    volley.projectiles.push(base(angle, state));
                }
            }
            ProjectileBehavior::Return => {
                for i in 0..count {
                    let state = ProjectileState::Return {
                        traveled: 0.0,
                        max_range: stats.range,
                        returning: false,
                    };
                    let angle = aim_angle + spread_offset(i, count, tuning::SPREAD_STEP * 2.0);
                    volley.projectiles.push(base(angle, state).with_owner(origin.owner).with_lifetime(stats.duration));
                }
            }
            ProjectileBehavior::Chain => {
                let Some((target_id, _)) = target else {
                    return volley;
                };
                for i in 0..count {
                    let state = ProjectileState::Chain {
                        seek: Seeker::new(Some(target_id), tuning::CHAIN_TURN_RATE, search),
                        hops_left: stats.chain_count.max(0.0) as u32,
                        chain_range: stats.chain_range,
                    };
                    let angle = aim_angle + spread_offset(i, count, tuning::SPREAD_STEP);
                    volley.projectiles.push(base(angle, state).with_lifetime(stats.duration));
                }
            }
            ProjectileBehavior::Bottle => {
                let Some((_, target_pos)) = target.filter(|(_, pos)| pos.distance_squared(origin.pos) <= stats.range.max(1.0).powi(2)) else {
                    return volley;
                };
                for i in 0..count {
                    let to = target_pos + polar_to_cartesian(40.0 * i as f32, rng.random_range(0.0..TAU));
                    let state = ProjectileState::Bottle {
                        from: origin.pos,
                        to,
                        flight: tuning::BOTTLE_FLIGHT_TIME,
                        elapsed: 0.0,
                        height: 0.0,
                        puddle: PuddleSpec {
                            radius: stats.size,
                            duration: stats.duration,
                            tick_interval: stats.tick_interval,
                        },
                    };
                    let mut p = base(heading(to - origin.pos), state);
                    p.radius = tuning::BOTTLE_RADIUS;
                    volley.projectiles.push(p);
                }
            }
            ProjectileBehavior::Orbit | ProjectileBehavior::OrbitStab | ProjectileBehavior::Blossom => {
                if existing >= count as usize {
                    return volley;
                }
                let attack_speed_mult = def.base.attack_speed.max(f32::EPSILON) / stats.attack_speed.max(f32::EPSILON);
                for slot in 0..count {
                    let radius = match behavior {
                        ProjectileBehavior::Orbit => stats.range,
                        ProjectileBehavior::OrbitStab => tuning::STAB_ORBIT_RADIUS,
                        _ => tuning::BLOSSOM_ORBIT_RADIUS,
                    };
                    let tether = Tether::new(origin.owner, radius, stats.speed, slot, count);
                    let state = match behavior {
                        ProjectileBehavior::Orbit => ProjectileState::Orbit { tether },
                        ProjectileBehavior::OrbitStab => ProjectileState::OrbitStab {
                            tether,
                            phase: StabPhase::Orbit,
                            cooldown: 0.0,
                            spec: StabSpec {
                                trigger_radius: stats.range + tuning::STAB_HITBOX_PAD,
                                reach: stats.range,
                                thrust_speed: tuning::STAB_THRUST_SPEED,
                                recover_speed: tuning::STAB_RECOVER_SPEED,
                                base_cooldown: tuning::STAB_BASE_COOLDOWN,
                                attack_speed_mult,
                            },
                        },
                        _ => ProjectileState::Blossom {
                            tether,
                            phase: BlossomPhase::Orbit,
                            cooldown: 0.0,
                            spec: BlossomSpec {
                                trigger_radius: stats.range,
                                dash_speed: tuning::BLOSSOM_DASH_SPEED,
                                chain_radius: stats.chain_range,
                                max_chain_hits: stats.chain_count.max(1.0) as u32,
                                base_cooldown: tuning::BLOSSOM_BASE_COOLDOWN,
                                attack_speed_mult,
                            },
                        },
                    };
                    let rehit = if stats.tick_interval > 0.0 {
                        stats.tick_interval
                    } else {
                        tuning::ORBIT_REHIT_DELAY
                    };
                    let mut p = base(0.0, state)
                        .with_owner(origin.owner)
                        .with_lifetime(stats.duration)
                        .with_rehit(rehit);
                    p.pos = origin.pos;
                    volley.projectiles.push(p);
                }
                volley.replaces_existing = true;
            }
            ProjectileBehavior::Beam => {
                if existing > 0 || target.is_none() {
                    return volley;
                }
                for i in 0..count {
                    let state = ProjectileState::Beam {
                        owner: origin.owner,
                        orphan_time: 0.0,
                        length: stats.range,
                        width: stats.size,
                        tick_interval: stats.tick_interval.max(tuning::MIN_TICK_INTERVAL),
                        since_tick: stats.tick_interval,
                        firing: false,
                        turn_rate: tuning::BEAM_TURN_RATE,
                    };
                    let angle = aim_angle + spread_offset(i, count, tuning::SPREAD_STEP * 3.0);
                    let mut p = base(angle, state).with_owner(origin.owner).with_lifetime(stats.duration);
                    p.speed = 0.0;
                    volley.projectiles.push(p);
                }
            }
            ProjectileBehavior::Flame => {
                for _ in 0..count {
                    let angle = aim_angle + rng.random_range(-tuning::FLAME_CONE..tuning::FLAME_CONE);
                    let speed = stats.speed * rng.random_range(0.8..1.2);
                    let state = ProjectileState::Flame {
                        vel: polar_to_cartesian(speed, angle),
                        drag: tuning::FLAME_DRAG,
                        rise: tuning::FLAME_RISE,
                        base_radius: stats.size,
                        growth: tuning::FLAME_GROWTH,
                        opacity: 1.0,
                    };
                    volley.projectiles.push(base(angle, state).with_lifetime(stats.duration.max(0.1)));
                }
            }
        },
        FirePattern::Area(behavior) => {
            let tick = stats.tick_interval.max(tuning::MIN_TICK_INTERVAL);
            let area = |pos: Vec2, state: AreaState| {
                Area::new(kind, def.element, pos, stats.size, stats.damage, stats.duration, tick, state).with_status(status)
            };
            match behavior {
                AreaBehavior::Static => {
                    // Targeted statics land on an enemy, the rest burst around the owner
                    let center = if stats.range > 0.0 {
                        match target.filter(|(_, pos)| pos.distance_squared(origin.pos) <= stats.range * stats.range) {
                            Some((_, pos)) => pos,
                            None => return volley,
                        }
                    } else {
                        origin.pos
                    };
                    volley.areas.push(area(center, AreaState::Static));
                }
                AreaBehavior::Follow => {
                    if existing > 0 {
                        return volley;
                    }
                    let state = AreaState::Follow {
                        owner: origin.owner,
                        orphan_time: 0.0,
                    };
                    volley.areas.push(area(origin.pos, state).with_owner(origin.owner));
                }
                AreaBehavior::Drift => {
                    for _ in 0..count {
                        let angle = rng.random_range(0.0..TAU);
                        let state = AreaState::Drift {
                            vel: polar_to_cartesian(stats.speed, angle),
                            sway: rng.random_range(0.0..TAU),
                        };
                        volley.areas.push(area(origin.pos, state));
                    }
                }
                AreaBehavior::Trap => {
                    for _ in 0..count {
                        let offset = polar_to_cartesian(rng.random_range(0.0..stats.range.max(1.0)), rng.random_range(0.0..TAU));
                        let state = AreaState::Trap {
                            trigger_radius: stats.size,
                            blast_radius: stats.explosion_radius.max(stats.size),
                        };
                        volley.areas.push(area(origin.pos + offset, state));
                    }
                }
                AreaBehavior::Vortex => {
                    let state = AreaState::Vortex { pull: tuning::VORTEX_PULL };
                    volley.areas.push(area(origin.pos, state));
                }
            }
        }
    }

    volley
}

/// Symmetric fan offset for element `i` of `n`
#[inline]
fn spread_offset(i: u32, n: u32, step: f32) -> f32 {
    (i as f32 - (n.saturating_sub(1)) as f32 / 2.0) * step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_weapon_has_a_sane_base() {
        for kind in WeaponKind::BASE.iter().copied().chain([
            WeaponKind::StormStaff,
            WeaponKind::Frostfire,
            WeaponKind::Glaive,
            WeaponKind::Miasma,
            WeaponKind::Sunbeam,
            WeaponKind::ThousandPetals,
        ]) {
            let def = kind.def();
            assert!(def.base.damage > 0.0, "{}", def.name);
            assert!(def.base.attack_speed > 0.0, "{}", def.name);
            assert!(def.levels.len() <= 7, "{}", def.name);
        }
    }

    #[test]
    fn test_spread_offset_is_symmetric() {
        assert_eq!(spread_offset(0, 1, 0.2), 0.0);
        assert!((spread_offset(0, 3, 0.2) + 0.2).abs() < 1e-6);
        assert!((spread_offset(2, 3, 0.2) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_status_payload_clamps_chill() {
        let stats = WeaponStats { chill: 2.0, burn: -1.0, ..WeaponStats::ZERO };
        let payload = stats.status_payload();
        assert_eq!(payload.chill, 0.9);
        assert_eq!(payload.burn, 0.0);
    }
}
