//! Timed status effects and summon templates.
//!
//! Every effect is one variant of the closed [`Effect`] union, so the
//! engine can match exhaustively instead of comparing type strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actor::CreatureKind;

/// The derived stat a buff or debuff moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffStat {
    /// Armor rating, folded into damage mitigation.
    Armor,
    /// Outgoing damage.
    Damage,
    /// Stealth rating. Narration only inside combat.
    Stealth,
    /// Speed, folded into dodge-derived chances.
    Speed,
}

impl fmt::Display for BuffStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Armor => write!(f, "armor"),
            Self::Damage => write!(f, "damage"),
            Self::Stealth => write!(f, "stealth"),
            Self::Speed => write!(f, "speed"),
        }
    }
}

/// Blueprint for a conjured ally carried by a summoning ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonTemplate {
    /// Name of the conjured actor.
    pub name: String,
    /// Creature family of the conjured actor.
    pub kind: CreatureKind,
    /// Starting and maximum health.
    pub health: i32,
    /// Armor rating.
    pub armor: i32,
    /// Damage of its single strike.
    pub damage: i32,
    /// Lifetime in player turns before the summon starts decaying.
    pub lifetime: u32,
}

impl SummonTemplate {
    /// Create a summon blueprint.
    pub fn new(
        name: impl Into<String>,
        kind: CreatureKind,
        health: i32,
        armor: i32,
        damage: i32,
        lifetime: u32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            health,
            armor,
            damage,
            lifetime,
        }
    }
}

/// A status effect carried by an ability.
///
/// Timed variants keep a round count and are wrapped in [`ActiveEffect`]
/// once attached; instant variants resolve at application time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    /// Subtracts `amount` health each round for `rounds` rounds.
    DamageOverTime {
        /// Health lost per tick.
        amount: i32,
        /// Duration in rounds.
        rounds: u32,
    },
    /// Raises a derived stat while active.
    Buff {
        /// The stat raised.
        stat: BuffStat,
        /// Flat increase.
        amount: i32,
        /// Duration in rounds.
        rounds: u32,
    },
    /// Lowers a derived stat while active.
    Debuff {
        /// The stat lowered.
        stat: BuffStat,
        /// Flat decrease.
        amount: i32,
        /// Duration in rounds.
        rounds: u32,
    },
    /// Slows the target, sapping its speed-derived chances.
    Slow {
        /// Speed points lost while active.
        amount: i32,
        /// Duration in rounds.
        rounds: u32,
    },
    /// The target loses its turns entirely while stunned.
    Stun {
        /// Duration in rounds.
        rounds: u32,
    },
    /// Saps magicka and stamina each round.
    Drain {
        /// Resource points lost per pool per tick.
        amount: i32,
        /// Duration in rounds.
        rounds: u32,
    },
    /// Restores health immediately.
    Heal {
        /// Health restored.
        amount: i32,
    },
    /// Hits every living actor on the opposing side at once.
    AreaDamage {
        /// Base damage per target before mitigation.
        amount: i32,
    },
    /// Heals every living actor on the friendly side at once.
    AreaHeal {
        /// Health restored per target.
        amount: i32,
    },
    /// Conjures a temporary ally from a template.
    Summon {
        /// Blueprint for the conjured actor.
        template: SummonTemplate,
    },
}

impl Effect {
    /// Duration in rounds for timed effects; zero for instant ones.
    pub fn duration(&self) -> u32 {
        match self {
            Self::DamageOverTime { rounds, .. }
            | Self::Buff { rounds, .. }
            | Self::Debuff { rounds, .. }
            | Self::Slow { rounds, .. }
            | Self::Stun { rounds }
            | Self::Drain { rounds, .. } => *rounds,
            Self::Heal { .. }
            | Self::AreaDamage { .. }
            | Self::AreaHeal { .. }
            | Self::Summon { .. } => 0,
        }
    }

    /// Returns true for effects that resolve fully at application time.
    pub fn is_instant(&self) -> bool {
        self.duration() == 0
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DamageOverTime { amount, .. } => write!(f, "bleeding ({amount}/round)"),
            Self::Buff { stat, amount, .. } => write!(f, "{stat} +{amount}"),
            Self::Debuff { stat, amount, .. } => write!(f, "{stat} -{amount}"),
            Self::Slow { amount, .. } => write!(f, "slowed ({amount})"),
            Self::Stun { .. } => write!(f, "stunned"),
            Self::Drain { amount, .. } => write!(f, "drained ({amount}/round)"),
            Self::Heal { amount } => write!(f, "healed ({amount})"),
            Self::AreaDamage { amount } => write!(f, "area damage ({amount})"),
            Self::AreaHeal { amount } => write!(f, "area heal ({amount})"),
            Self::Summon { template } => write!(f, "summons {}", template.name),
        }
    }
}

/// A timed effect attached to an actor, counting down each of its turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    /// The underlying effect.
    pub effect: Effect,
    /// Rounds left before the effect expires.
    pub rounds_remaining: u32,
}

impl ActiveEffect {
    /// Attach an effect, capturing its duration.
    pub fn new(effect: Effect) -> Self {
        let rounds_remaining = effect.duration();
        Self {
            effect,
            rounds_remaining,
        }
    }

    /// Returns true once the countdown reaches zero.
    pub fn is_expired(&self) -> bool {
        self.rounds_remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_of_timed_and_instant() {
        let dot = Effect::DamageOverTime {
            amount: 4,
            rounds: 3,
        };
        assert_eq!(dot.duration(), 3);
        assert!(!dot.is_instant());

        let heal = Effect::Heal { amount: 20 };
        assert_eq!(heal.duration(), 0);
        assert!(heal.is_instant());
    }

    #[test]
    fn active_effect_captures_duration() {
        let active = ActiveEffect::new(Effect::Stun { rounds: 2 });
        assert_eq!(active.rounds_remaining, 2);
        assert!(!active.is_expired());
    }

    #[test]
    fn effect_serde_is_tagged() {
        let effect = Effect::Buff {
            stat: BuffStat::Armor,
            amount: 10,
            rounds: 3,
        };
        let json = serde_json::to_string(&effect).unwrap();
        assert!(json.contains("\"kind\":\"buff\""));
        let back: Effect = serde_json::from_str(&json).unwrap();
        assert_eq!(back, effect);
    }

    #[test]
    fn display_reads_naturally() {
        let slow = Effect::Slow {
            amount: 15,
            rounds: 2,
        };
        assert_eq!(slow.to_string(), "slowed (15)");
        assert_eq!(Effect::Stun { rounds: 1 }.to_string(), "stunned");
    }
}
