//! Enemy turns: behavior-driven ability choice and attacks scaled
//! against the player.

use fm_core::ability::{Ability, AbilityKind};
use fm_core::actor::{Actor, ActorId, Behavior};
use fm_core::effect::{ActiveEffect, Effect};
use fm_core::log::{LogEntry, RollDetail};
use fm_core::player::PlayerStats;
use fm_core::state::CombatState;
use rand::Rng;
use rand::rngs::StdRng;

use crate::config::EngineConfig;
use crate::damage::{self, HitLocation};
use crate::effects::{self, AreaHit};
use crate::error::{EngineError, EngineResult};
use crate::roll;
use crate::turns::{ActionOutcome, describe_hit, pay_costs, spawn_summon};

/// Crit chance shared by every enemy, trimmed by the player's dodge.
const ENEMY_CRIT_CHANCE: f64 = 5.0;
/// How often a spellcaster with damaging magic reaches for it.
const MAGIC_PREFERENCE: f64 = 0.7;
/// Health fraction below which bosses call for reinforcements.
const BOSS_SUMMON_THRESHOLD: f64 = 0.5;

/// Execute one enemy's turn against the player.
///
/// `roll_override` pins the d20 for deterministic tests. Gameplay dead
/// ends (a stunned or expiring enemy) come back as narration; only a
/// finished encounter or a non-enemy id is an `Err`.
pub fn execute(
    state: &CombatState,
    enemy_id: ActorId,
    player: &PlayerStats,
    config: &EngineConfig,
    rng: &mut StdRng,
    roll_override: Option<u32>,
) -> EngineResult<ActionOutcome> {
    if !state.active {
        return Err(EngineError::CombatOver(state.outcome));
    }
    if !state.is_enemy(enemy_id) {
        return Err(EngineError::UnknownActor(enemy_id));
    }

    let mut state = state.clone();
    let player = player.clone();

    let Some(enemy) = state.actor_mut(enemy_id) else {
        return Err(EngineError::UnknownActor(enemy_id));
    };
    if !enemy.is_alive() {
        let text = format!("The {} lies still.", enemy.name);
        return Ok(ActionOutcome::new(state, player, text));
    }

    let report = effects::tick(&mut enemy.active_effects, &mut enemy.vitals);
    let name = enemy.name.clone();
    if !enemy.is_alive() {
        let text = format!("The {name} succumbs to its wounds.");
        state.log.push(LogEntry::new(state.turn, &name, "perish", "", &text));
        return Ok(ActionOutcome::new(state, player, text));
    }
    if report.stunned {
        let text = format!("The {name} is stunned and cannot act.");
        state.log.push(LogEntry::new(state.turn, &name, "stunned", "", &text));
        return Ok(ActionOutcome::new(state, player, text));
    }
    let prefix = if report.dot_damage > 0 {
        format!("The {name} bleeds for {} damage. ", report.dot_damage)
    } else {
        String::new()
    };

    // Decisions read a snapshot so the mutable borrow can be released.
    let snapshot = enemy.clone();
    let needs_minions = snapshot.boss
        && snapshot.vitals.health.fraction() < BOSS_SUMMON_THRESHOLD
        && !state
            .enemies
            .iter()
            .any(|a| a.is_alive() && a.summoned_by == Some(enemy_id));

    let ability = choose_ability(&snapshot, needs_minions, rng).cloned().unwrap_or_else(|| {
        Ability::new("strike", "Strike", AbilityKind::Melee, snapshot.base_damage)
    });

    let Some(enemy) = state.actor_mut(enemy_id) else {
        return Err(EngineError::UnknownActor(enemy_id));
    };
    let stamina_mult = pay_costs(&mut enemy.vitals, &ability.cost);
    enemy.record_ability(&ability.id);

    if let Some(template) = ability.summons() {
        let minion = spawn_summon(template, enemy_id, snapshot.level, rng);
        let minion_id = minion.id;
        let minion_name = minion.name.clone();
        let mut text = format!("The {name} calls a {minion_name} to its side!");
        if state.add_enemy(minion).is_ok() {
            let at = state
                .turn_order
                .iter()
                .position(|id| *id == enemy_id)
                .map_or(state.turn_order.len(), |i| i + 1);
            state.turn_order.insert(at, minion_id);
        } else {
            text = format!("The {name} gestures, but nothing answers.");
        }
        state.log.push(LogEntry::new(state.turn, &name, &ability.name, "", &text));
        return Ok(prepend(ActionOutcome::new(state, player, text), prefix));
    }

    if ability.is_supportive() {
        let outcome = support_self(state, player, enemy_id, &name, &ability);
        return Ok(prepend(outcome, prefix));
    }

    let strike = Strike {
        ability: &ability,
        stamina_mult,
        roll_override,
    };
    let outcome = attack_player(state, player, &snapshot, &strike, config, rng);
    let mut outcome = prepend(outcome, prefix);
    if !outcome.player.is_alive() {
        outcome.narrative.push_str(" You collapse!");
    }
    Ok(outcome)
}

/// An attack the selector settled on, with its cost outcome.
struct Strike<'a> {
    ability: &'a Ability,
    stamina_mult: f64,
    roll_override: Option<u32>,
}

fn prepend(mut outcome: ActionOutcome, prefix: String) -> ActionOutcome {
    if !prefix.is_empty() {
        outcome.narrative = format!("{prefix}{}", outcome.narrative);
    }
    outcome
}

/// Heals and buffs an enemy casts on itself.
fn support_self(
    mut state: CombatState,
    player: PlayerStats,
    enemy_id: ActorId,
    name: &str,
    ability: &Ability,
) -> ActionOutcome {
    let mut area_heal_amount = None;
    let mut text = format!("The {name} uses {}.", ability.name);

    if let Some(enemy) = state.actor_mut(enemy_id) {
        if ability.heal > 0 {
            enemy.vitals.heal(ability.heal);
            text = format!("The {name} knits its wounds for {} health.", ability.heal);
        }
        for effect in &ability.effects {
            match effect {
                Effect::Heal { amount } => {
                    enemy.vitals.heal(*amount);
                    text = format!("The {name} knits its wounds for {amount} health.");
                }
                Effect::Buff { .. } => {
                    enemy.active_effects.push(ActiveEffect::new(effect.clone()));
                    text = format!("The {name} steels itself.");
                }
                Effect::AreaHeal { amount } => area_heal_amount = Some(*amount),
                _ => {}
            }
        }
    }
    if let Some(amount) = area_heal_amount {
        let healed = effects::area_heal(&mut state.enemies, amount);
        if !healed.is_empty() {
            text = format!("The {name} mends its pack for {amount} health.");
        }
    }

    state.log.push(LogEntry::new(state.turn, name, &ability.name, "", &text));
    ActionOutcome::new(state, player, text)
}

fn attack_player(
    mut state: CombatState,
    mut player: PlayerStats,
    enemy: &Actor,
    strike: &Strike<'_>,
    config: &EngineConfig,
    rng: &mut StdRng,
) -> ActionOutcome {
    let name = &enemy.name;
    let ability = strike.ability;
    let dodge = effects::effective_dodge(player.dodge, &state.player_effects);
    let roll = roll::resolve_attack(rng, ENEMY_CRIT_CHANCE, dodge, strike.roll_override);

    if !roll.hit {
        let text = if roll.natural == 1 {
            format!("The {name} overreaches and stumbles.")
        } else {
            format!("The {name}'s attack misses you.")
        };
        state.log.push(
            LogEntry::new(state.turn, name, &ability.name, "You", &text).with_roll(RollDetail {
                natural: roll.natural,
                tier: roll.tier.to_string(),
                crit: false,
                location: HitLocation::from_natural(roll.natural).to_string(),
            }),
        );
        return ActionOutcome::new(state, player, text);
    }

    let power = f64::from(effects::effective_damage(ability.damage, &enemy.active_effects));
    let base = (power * strike.stamina_mult).floor() as i32;
    let raw = damage::raw_damage(base, enemy.level, &roll);
    let scaled = (f64::from(raw) * player_scaling(&player)).floor() as i32;

    let armor = effects::effective_armor(player.armor, &state.player_effects);
    let mut dealt = damage::mitigated(scaled, armor);
    if state.player_defending {
        dealt = (f64::from(dealt) * (1.0 - config.guard_reduction)).floor() as i32;
    }
    let dealt = dealt.max(1);
    player.vitals.damage(dealt);

    let mut riders = String::new();
    let mut area_hits = Vec::new();
    for effect in &ability.effects {
        match effect {
            Effect::DamageOverTime { .. } => {
                state.player_effects.push(ActiveEffect::new(effect.clone()));
                riders.push_str(" The wound keeps bleeding.");
            }
            Effect::Stun { .. } => {
                state.player_effects.push(ActiveEffect::new(effect.clone()));
                riders.push_str(" You are stunned!");
            }
            Effect::Slow { .. } => {
                state.player_effects.push(ActiveEffect::new(effect.clone()));
                riders.push_str(" Your legs grow heavy.");
            }
            Effect::Debuff { stat, .. } => {
                state.player_effects.push(ActiveEffect::new(effect.clone()));
                riders.push_str(&format!(" Your {stat} is weakened."));
            }
            Effect::Drain { .. } => {
                state.player_effects.push(ActiveEffect::new(effect.clone()));
                riders.push_str(" Your strength drains away.");
            }
            Effect::AreaDamage { amount } => {
                let splash = damage::mitigated(*amount, armor);
                player.vitals.damage(splash);
                area_hits.push(AreaHit {
                    id: ActorId::PLAYER,
                    name: "You".to_string(),
                    amount: splash,
                });
                area_hits.extend(effects::area_damage(&mut state.allies, *amount));
                riders.push_str(&format!(" The blast washes over you for {splash} more."));
            }
            _ => {}
        }
    }

    let location = HitLocation::from_natural(roll.natural);
    let crit_mark = if roll.crit { " Critical hit!" } else { "" };
    let text = if ability.kind == AbilityKind::Melee {
        format!(
            "The {name} {} your {location} for {dealt} damage.{crit_mark}{riders}",
            describe_hit(roll.tier),
        )
    } else {
        format!(
            "The {name}'s {} {} your {location} for {dealt} damage.{crit_mark}{riders}",
            ability.name,
            describe_hit(roll.tier),
        )
    };

    state.log.push(
        LogEntry::new(state.turn, name, &ability.name, "You", &text).with_roll(RollDetail {
            natural: roll.natural,
            tier: roll.tier.to_string(),
            crit: roll.crit,
            location: location.to_string(),
        }),
    );

    let mut outcome = ActionOutcome::new(state, player, text);
    outcome.area_hits = area_hits;
    outcome
}

/// Late-game player pools would trivialize enemy damage without this
/// normalization against max health and level.
fn player_scaling(player: &PlayerStats) -> f64 {
    let health_scale = (f64::from(player.vitals.health.max) / 150.0).clamp(1.0, 2.5);
    let level_scale = (1.0 + f64::from(player.level) * 0.015).clamp(1.0, 1.6);
    health_scale * level_scale
}

/// Pick an ability by behavior, steering away from an immediate repeat
/// when an alternative exists.
fn choose_ability<'a>(
    enemy: &'a Actor,
    needs_minions: bool,
    rng: &mut StdRng,
) -> Option<&'a Ability> {
    let abilities = &enemy.abilities;
    if abilities.is_empty() {
        return None;
    }
    if needs_minions {
        let summon = abilities.iter().find(|a| a.summons().is_some());
        if summon.is_some() {
            return summon;
        }
    }

    let idx = match enemy.behavior {
        Behavior::Aggressive | Behavior::Berserker => {
            let preferred = match best_damaging(abilities, Some(AbilityKind::Magic)) {
                Some(magic) if rng.random_range(0.0..1.0) < MAGIC_PREFERENCE => Some(magic),
                _ => best_damaging(abilities, None),
            };
            preferred.unwrap_or(0)
        }
        Behavior::Defensive => cheapest(abilities),
        Behavior::Tactical => {
            let tricky: Vec<usize> = abilities
                .iter()
                .enumerate()
                .filter(|(_, a)| a.has_effects())
                .map(|(i, _)| i)
                .collect();
            if tricky.is_empty() {
                rng.random_range(0..abilities.len())
            } else {
                tricky[rng.random_range(0..tricky.len())]
            }
        }
        Behavior::Support => rng.random_range(0..abilities.len()),
    };
    Some(&abilities[sidestep_repeat(enemy, idx, rng)])
}

fn best_damaging(abilities: &[Ability], kind: Option<AbilityKind>) -> Option<usize> {
    abilities
        .iter()
        .enumerate()
        .filter(|(_, a)| a.damage > 0 && kind.is_none_or(|k| a.kind == k))
        .max_by_key(|(_, a)| a.damage)
        .map(|(i, _)| i)
}

fn cheapest(abilities: &[Ability]) -> usize {
    abilities
        .iter()
        .enumerate()
        .min_by_key(|(_, a)| a.cost.total())
        .map_or(0, |(i, _)| i)
}

fn sidestep_repeat(enemy: &Actor, idx: usize, rng: &mut StdRng) -> usize {
    let abilities = &enemy.abilities;
    if abilities.len() < 2 || enemy.last_ability() != Some(abilities[idx].id.as_str()) {
        return idx;
    }
    let mut other = rng.random_range(0..abilities.len() - 1);
    if other >= idx {
        other += 1;
    }
    other
}
