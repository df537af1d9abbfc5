//! Damage calculation: base power, level bonus, tier scaling, and armor
//! mitigation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::roll::AttackRoll;

/// Extra multiplier on top of the tier when a blow is critical.
pub const CRIT_MULTIPLIER: f64 = 1.15;

/// Where a blow landed. Derived from the natural roll, narration only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitLocation {
    /// Center of mass.
    Torso,
    /// An arm.
    Arm,
    /// A leg.
    Leg,
    /// The head.
    Head,
}

impl HitLocation {
    /// Derive the location from a natural roll (`natural % 4`).
    pub fn from_natural(natural: u32) -> Self {
        match natural % 4 {
            0 => Self::Torso,
            1 => Self::Arm,
            2 => Self::Leg,
            _ => Self::Head,
        }
    }
}

impl fmt::Display for HitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Torso => write!(f, "torso"),
            Self::Arm => write!(f, "arm"),
            Self::Leg => write!(f, "leg"),
            Self::Head => write!(f, "head"),
        }
    }
}

/// Flat damage bonus from attacker level: `floor(level * 0.2)`.
pub fn level_bonus(level: u32) -> i32 {
    (f64::from(level) * 0.2).floor() as i32
}

/// Fraction of incoming damage an armor rating absorbs:
/// `armor / (armor + 100)`, always in `[0, 1)`.
pub fn mitigation(armor: i32) -> f64 {
    let armor = f64::from(armor.max(0));
    armor / (armor + 100.0)
}

/// Unmitigated damage: `floor((base + level bonus) * tier * crit)`.
///
/// Returns at least 1 when the roll connected and the base power is
/// positive; misses always deal exactly 0.
pub fn raw_damage(base: i32, level: u32, roll: &AttackRoll) -> i32 {
    if !roll.hit {
        return 0;
    }
    let crit = if roll.crit { CRIT_MULTIPLIER } else { 1.0 };
    let scaled = f64::from(base + level_bonus(level)) * roll.tier.multiplier() * crit;
    let damage = scaled.floor() as i32;
    if base > 0 { damage.max(1) } else { damage.max(0) }
}

/// Apply armor mitigation to an already-scaled damage value.
///
/// A landed hit is never mitigated below 1.
pub fn mitigated(damage: i32, armor: i32) -> i32 {
    if damage <= 0 {
        return 0;
    }
    let reduced = (f64::from(damage) * (1.0 - mitigation(armor))).floor() as i32;
    reduced.max(1)
}
