//! The player's combat numbers, survival meters, and character sheet.
//!
//! The engine never owns the player: callers derive `PlayerStats` from
//! equipped gear, pass it into each executor, and receive an updated copy
//! back. `Character` is the read-only perk and skill sheet.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ability::Ability;
use crate::actor::Vitals;

/// The weapon family the player currently wields. Keys weapon perks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponClass {
    /// One-handed blade.
    Sword,
    /// Two-handed blade.
    Greatsword,
    /// One-handed blunt weapon.
    Mace,
    /// Two-handed blunt weapon.
    Warhammer,
    /// One-handed axe.
    Axe,
    /// Two-handed axe.
    Battleaxe,
    /// Fast, light blade.
    Dagger,
    /// Ranged weapon.
    Bow,
    /// Bare fists.
    Unarmed,
}

impl WeaponClass {
    /// Perk bonus key for this weapon family, if it has one.
    ///
    /// Blades sharpen crits, blunt weapons punch through armor, and axes
    /// open bleeding wounds. Daggers and bows carry no family bonus.
    pub fn perk_key(&self) -> Option<&'static str> {
        match self {
            Self::Sword | Self::Greatsword => Some("sword_crit"),
            Self::Mace | Self::Warhammer => Some("mace_armor_pen"),
            Self::Axe | Self::Battleaxe => Some("axe_bleed"),
            Self::Unarmed => Some("unarmed_damage"),
            Self::Dagger | Self::Bow => None,
        }
    }
}

impl fmt::Display for WeaponClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sword => write!(f, "sword"),
            Self::Greatsword => write!(f, "greatsword"),
            Self::Mace => write!(f, "mace"),
            Self::Warhammer => write!(f, "warhammer"),
            Self::Axe => write!(f, "axe"),
            Self::Battleaxe => write!(f, "battleaxe"),
            Self::Dagger => write!(f, "dagger"),
            Self::Bow => write!(f, "bow"),
            Self::Unarmed => write!(f, "fists"),
        }
    }
}

/// Hunger, thirst, and fatigue meters, each in `[0, 100]`.
///
/// Zero means fresh; one hundred means starving, parched, or exhausted.
/// Combat raises them in proportion to how long the fight ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SurvivalMeters {
    /// Hunger meter.
    pub hunger: f64,
    /// Thirst meter.
    pub thirst: f64,
    /// Fatigue meter.
    pub fatigue: f64,
}

impl SurvivalMeters {
    /// Apply a delta, clamping every meter to `[0, 100]`.
    pub fn apply(&mut self, delta: &SurvivalDelta) {
        self.hunger = (self.hunger + delta.hunger).clamp(0.0, 100.0);
        self.thirst = (self.thirst + delta.thirst).clamp(0.0, 100.0);
        self.fatigue = (self.fatigue + delta.fatigue).clamp(0.0, 100.0);
    }
}

/// An unclamped change to the survival meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SurvivalDelta {
    /// Hunger change.
    pub hunger: f64,
    /// Thirst change.
    pub thirst: f64,
    /// Fatigue change.
    pub fatigue: f64,
}

impl SurvivalDelta {
    /// Create a delta.
    pub fn new(hunger: f64, thirst: f64, fatigue: f64) -> Self {
        Self {
            hunger,
            thirst,
            fatigue,
        }
    }

    /// Returns true when nothing changes.
    pub fn is_zero(&self) -> bool {
        self.hunger == 0.0 && self.thirst == 0.0 && self.fatigue == 0.0
    }
}

/// The player's combat numbers, derived from equipped gear by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Character level, feeding the damage level bonus and enemy scaling.
    pub level: u32,
    /// Health, magicka, and stamina pools.
    pub vitals: Vitals,
    /// Armor rating from equipped gear.
    pub armor: i32,
    /// Damage of the equipped weapon.
    pub weapon_damage: i32,
    /// Family of the equipped weapon.
    pub weapon_class: WeaponClass,
    /// Critical hit chance in percentage points.
    pub crit_chance: f64,
    /// Dodge rating in percentage points. Feeds flee and crit avoidance.
    pub dodge: f64,
    /// Survival meters, charged at encounter end.
    pub survival: SurvivalMeters,
}

impl PlayerStats {
    /// Create stats at the given level with modest starting numbers.
    pub fn new(level: u32) -> Self {
        Self {
            level,
            vitals: Vitals::new(100).with_magicka(50).with_stamina(50),
            armor: 0,
            weapon_damage: 10,
            weapon_class: WeaponClass::Sword,
            crit_chance: 5.0,
            dodge: 5.0,
            survival: SurvivalMeters::default(),
        }
    }

    /// Set the equipped weapon.
    pub fn with_weapon(mut self, damage: i32, class: WeaponClass) -> Self {
        self.weapon_damage = damage;
        self.weapon_class = class;
        self
    }

    /// Set the armor rating.
    pub fn with_armor(mut self, armor: i32) -> Self {
        self.armor = armor;
        self
    }

    /// Set health, magicka, and stamina maximums (all pools start full).
    pub fn with_pools(mut self, health: i32, magicka: i32, stamina: i32) -> Self {
        self.vitals = Vitals::new(health)
            .with_magicka(magicka)
            .with_stamina(stamina);
        self
    }

    /// Set the crit chance in percentage points.
    pub fn with_crit_chance(mut self, percent: f64) -> Self {
        self.crit_chance = percent;
        self
    }

    /// Set the dodge rating in percentage points.
    pub fn with_dodge(mut self, percent: f64) -> Self {
        self.dodge = percent;
        self
    }

    /// Returns true while health is above zero.
    pub fn is_alive(&self) -> bool {
        self.vitals.is_alive()
    }
}

/// Skill level at or above which bare fists count as a real weapon.
const UNARMED_SKILL_UNLOCK: u32 = 5;

/// The read-only character sheet: perk ranks, skills, and known magic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Perk id to unlocked rank. Absent means rank zero.
    pub perks: HashMap<String, u32>,
    /// Skill name to level.
    pub skills: HashMap<String, u32>,
    /// Spells the player can cast with the `Magic` action.
    pub spells: Vec<Ability>,
    /// Shouts the player can use with the `Shout` action.
    pub shouts: Vec<Ability>,
}

impl Character {
    /// Create an empty sheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a perk rank.
    pub fn with_perk(mut self, id: impl Into<String>, rank: u32) -> Self {
        self.perks.insert(id.into(), rank);
        self
    }

    /// Set a skill level.
    pub fn with_skill(mut self, name: impl Into<String>, level: u32) -> Self {
        self.skills.insert(name.into(), level);
        self
    }

    /// Learn a spell.
    pub fn with_spell(mut self, spell: Ability) -> Self {
        self.spells.push(spell);
        self
    }

    /// Learn a shout.
    pub fn with_shout(mut self, shout: Ability) -> Self {
        self.shouts.push(shout);
        self
    }

    /// Unlocked rank of a perk, zero if not taken.
    pub fn rank(&self, id: &str) -> u32 {
        self.perks.get(id).copied().unwrap_or(0)
    }

    /// Returns true if the perk is ranked at least once.
    pub fn has_perk(&self, id: &str) -> bool {
        self.rank(id) >= 1
    }

    /// Skill level, zero if untrained.
    pub fn skill(&self, name: &str) -> u32 {
        self.skills.get(name).copied().unwrap_or(0)
    }

    /// Look up a known spell by id.
    pub fn spell(&self, id: &str) -> Option<&Ability> {
        self.spells.iter().find(|a| a.id == id)
    }

    /// Look up a known shout by id.
    pub fn shout(&self, id: &str) -> Option<&Ability> {
        self.shouts.iter().find(|a| a.id == id)
    }

    /// Bare fists are a usable weapon once the unarmed skill or the
    /// `unarmed_mastery` perk unlocks them.
    pub fn unarmed_unlocked(&self) -> bool {
        self.skill("unarmed") >= UNARMED_SKILL_UNLOCK || self.has_perk("unarmed_mastery")
    }
}
