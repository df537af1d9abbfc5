//! Attack roll resolution: d20 to outcome tier.
//!
//! The tier is a pure function of the natural roll, so tests can pin any
//! outcome by passing an explicit die value. Crit chance and dodge only
//! decide whether a hitting tier is upgraded to a critical; armor never
//! touches the roll, it only mitigates damage afterwards.

use std::fmt;

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Discrete outcome bucket of a d20 attack roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollTier {
    /// Natural 1: a botch. The attacker hurts itself.
    Fail,
    /// 2-4: a clean miss.
    Miss,
    /// 5-9: a glancing hit.
    Low,
    /// 10-14: a solid hit.
    Mid,
    /// 15-19: a heavy hit.
    High,
    /// Natural 20 or the lucky 7: a critical hit.
    Crit,
}

impl RollTier {
    /// Map a natural d20 value to its tier.
    ///
    /// A natural 7 counts as a critical alongside the natural 20 (the
    /// lucky seven). This is an intentional rule, not rounding slop.
    pub fn from_natural(natural: u32) -> Self {
        match natural {
            0 | 1 => Self::Fail,
            7 => Self::Crit,
            2..=4 => Self::Miss,
            5..=9 => Self::Low,
            10..=14 => Self::Mid,
            15..=19 => Self::High,
            _ => Self::Crit,
        }
    }

    /// Damage multiplier for this tier.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Fail | Self::Miss => 0.0,
            Self::Low => 0.75,
            Self::Mid => 1.0,
            Self::High => 1.25,
            Self::Crit => 1.75,
        }
    }

    /// Returns true for tiers that connect with the target.
    pub fn is_hit(&self) -> bool {
        !matches!(self, Self::Fail | Self::Miss)
    }
}

impl fmt::Display for RollTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Miss => write!(f, "miss"),
            Self::Low => write!(f, "low"),
            Self::Mid => write!(f, "mid"),
            Self::High => write!(f, "high"),
            Self::Crit => write!(f, "crit"),
        }
    }
}

/// The full result of one attack roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackRoll {
    /// The natural d20 value (1-20).
    pub natural: u32,
    /// Tier the roll landed in.
    pub tier: RollTier,
    /// Whether the attack connects.
    pub hit: bool,
    /// Whether the blow is critical, from the tier or a crit-chance
    /// upgrade.
    pub crit: bool,
}

/// Resolve an attack roll.
///
/// `crit_chance` and `dodge` are percentage points: on a hitting tier an
/// extra d100 below `crit_chance - dodge / 2` upgrades the blow to a
/// critical without changing the tier. An explicit `natural` value (1-20,
/// clamped) replaces the die for deterministic tests.
pub fn resolve_attack(
    rng: &mut StdRng,
    crit_chance: f64,
    dodge: f64,
    natural: Option<u32>,
) -> AttackRoll {
    let natural = match natural {
        Some(n) => n.clamp(1, 20),
        None => rng.random_range(1..=20),
    };
    let tier = RollTier::from_natural(natural);
    let hit = tier.is_hit();

    let mut crit = tier == RollTier::Crit;
    if hit && !crit {
        let threshold = (crit_chance - dodge / 2.0).max(0.0);
        crit = rng.random_range(0.0..100.0) < threshold;
    }

    AttackRoll {
        natural,
        tier,
        hit,
        crit,
    }
}
