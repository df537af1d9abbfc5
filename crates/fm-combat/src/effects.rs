//! The effect engine: per-turn ticks, derived stat reads, and area
//! fan-out.
//!
//! Effects tick at the start of their owner's turn: damage-over-time and
//! drain land, every countdown drops by one, and expired effects fall
//! off. A stun reported here short-circuits the turn; the owner still
//! spends its action slot.

use fm_core::actor::{Actor, ActorId, Vitals};
use fm_core::effect::{ActiveEffect, BuffStat, Effect};
use serde::{Deserialize, Serialize};

use crate::damage;

/// What happened when an actor's effects ticked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// The owner is stunned and loses this turn.
    pub stunned: bool,
    /// Total health lost to damage-over-time this tick.
    pub dot_damage: i32,
    /// Resource points sapped from each pool by drain this tick.
    pub drained: i32,
    /// Display labels of effects that just wore off.
    pub expired: Vec<String>,
}

impl TickReport {
    /// Returns true when the tick did nothing worth narrating.
    pub fn is_quiet(&self) -> bool {
        !self.stunned && self.dot_damage == 0 && self.drained == 0 && self.expired.is_empty()
    }
}

/// Tick every active effect against the owner's vitals.
pub fn tick(effects: &mut Vec<ActiveEffect>, vitals: &mut Vitals) -> TickReport {
    let mut report = TickReport::default();

    for active in effects.iter_mut() {
        match &active.effect {
            Effect::DamageOverTime { amount, .. } => {
                vitals.damage(*amount);
                report.dot_damage += (*amount).max(0);
            }
            Effect::Drain { amount, .. } => {
                vitals.spend_magicka(*amount);
                vitals.spend_stamina(*amount);
                report.drained += (*amount).max(0);
            }
            Effect::Stun { .. } => report.stunned = true,
            _ => {}
        }
        active.rounds_remaining = active.rounds_remaining.saturating_sub(1);
    }

    effects.retain(|active| {
        if active.is_expired() {
            report.expired.push(active.effect.to_string());
            false
        } else {
            true
        }
    });

    report
}

/// Returns true while a stun is among the active effects.
pub fn is_stunned(effects: &[ActiveEffect]) -> bool {
    effects
        .iter()
        .any(|a| matches!(a.effect, Effect::Stun { .. }))
}

fn stat_modifier(effects: &[ActiveEffect], stat: BuffStat) -> i32 {
    effects
        .iter()
        .map(|a| match &a.effect {
            Effect::Buff { stat: s, amount, .. } if *s == stat => *amount,
            Effect::Debuff { stat: s, amount, .. } if *s == stat => -*amount,
            _ => 0,
        })
        .sum()
}

/// Armor rating with active buffs and debuffs folded in, never negative.
pub fn effective_armor(base: i32, effects: &[ActiveEffect]) -> i32 {
    (base + stat_modifier(effects, BuffStat::Armor)).max(0)
}

/// Outgoing damage with active buffs and debuffs folded in, never
/// negative.
pub fn effective_damage(base: i32, effects: &[ActiveEffect]) -> i32 {
    (base + stat_modifier(effects, BuffStat::Damage)).max(0)
}

/// Dodge rating with speed buffs, debuffs, and slows folded in, never
/// negative. Feeds flee chances and crit avoidance.
pub fn effective_dodge(base: f64, effects: &[ActiveEffect]) -> f64 {
    let slow: i32 = effects
        .iter()
        .map(|a| match &a.effect {
            Effect::Slow { amount, .. } => *amount,
            _ => 0,
        })
        .sum();
    let speed = stat_modifier(effects, BuffStat::Speed);
    (base + f64::from(speed - slow)).max(0.0)
}

/// One recipient of an area effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaHit {
    /// Who was hit or healed.
    pub id: ActorId,
    /// Their name, for narration.
    pub name: String,
    /// Damage dealt or health restored.
    pub amount: i32,
}

/// Deal flat damage to every living actor in the roster, mitigated by
/// each target's armor. Returns one hit per recipient.
pub fn area_damage(roster: &mut [Actor], amount: i32) -> Vec<AreaHit> {
    roster
        .iter_mut()
        .filter(|actor| actor.is_alive())
        .map(|actor| {
            let armor = effective_armor(actor.armor, &actor.active_effects);
            let dealt = damage::mitigated(amount, armor);
            actor.vitals.damage(dealt);
            AreaHit {
                id: actor.id,
                name: actor.name.clone(),
                amount: dealt,
            }
        })
        .collect()
}

/// Heal every living actor in the roster. Returns one entry per
/// recipient.
pub fn area_heal(roster: &mut [Actor], amount: i32) -> Vec<AreaHit> {
    roster
        .iter_mut()
        .filter(|actor| actor.is_alive())
        .map(|actor| {
            actor.vitals.heal(amount);
            AreaHit {
                id: actor.id,
                name: actor.name.clone(),
                amount,
            }
        })
        .collect()
}
