//! Companion turns: followers and summons striking alongside the
//! player, either directed or on their own judgment.

use fm_core::ability::{Ability, AbilityKind};
use fm_core::actor::{Actor, ActorId};
use fm_core::log::{LogEntry, RollDetail};
use fm_core::state::CombatState;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::damage::{self, HitLocation};
use crate::effects;
use crate::error::{EngineError, EngineResult};
use crate::roll;
use crate::turns::{describe_hit, pay_costs};

/// Crit chance shared by every companion.
const COMPANION_CRIT_CHANCE: f64 = 5.0;

/// One companion action, directed or automatic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionAction {
    /// Which ally acts.
    pub ally: ActorId,
    /// Ability id for a directed action; ignored when `auto`.
    pub ability: Option<String>,
    /// Explicit enemy target; defaults to the first living enemy.
    pub target: Option<ActorId>,
    /// Let the companion pick its own ability.
    pub auto: bool,
    /// Replaces the d20 for deterministic tests.
    pub roll: Option<u32>,
}

impl CompanionAction {
    /// Direct a companion to use a specific ability.
    pub fn directed(ally: ActorId, ability: impl Into<String>) -> Self {
        Self {
            ally,
            ability: Some(ability.into()),
            target: None,
            auto: false,
            roll: None,
        }
    }

    /// Let the companion act on its own judgment.
    pub fn auto(ally: ActorId) -> Self {
        Self {
            ally,
            ability: None,
            target: None,
            auto: true,
            roll: None,
        }
    }

    /// Aim at a specific actor.
    pub fn with_target(mut self, target: ActorId) -> Self {
        self.target = Some(target);
        self
    }

    /// Pin the d20 to a value (for tests).
    pub fn with_roll(mut self, natural: u32) -> Self {
        self.roll = Some(natural);
        self
    }
}

/// What a companion turn produced.
#[derive(Debug, Clone)]
pub struct CompanionOutcome {
    /// The new authoritative combat state.
    pub state: CombatState,
    /// Human-readable account of the turn.
    pub narrative: String,
    /// False when the companion could not or would not act.
    pub success: bool,
}

impl CompanionOutcome {
    fn acted(state: CombatState, narrative: impl Into<String>) -> Self {
        Self {
            state,
            narrative: narrative.into(),
            success: true,
        }
    }

    fn refused(state: CombatState, narrative: impl Into<String>) -> Self {
        Self {
            state,
            narrative: narrative.into(),
            success: false,
        }
    }
}

/// Execute one companion's turn.
///
/// A companion never strikes a friend: directing a damaging ability at
/// the player or an ally comes back as a refusal, not an `Err`.
pub fn execute(
    state: &CombatState,
    action: &CompanionAction,
    rng: &mut StdRng,
) -> EngineResult<CompanionOutcome> {
    if !state.active {
        return Err(EngineError::CombatOver(state.outcome));
    }
    if !state.allies.iter().any(|a| a.id == action.ally) {
        return Err(EngineError::UnknownActor(action.ally));
    }

    let mut state = state.clone();
    let Some(ally) = state.actor_mut(action.ally) else {
        return Err(EngineError::UnknownActor(action.ally));
    };
    let name = ally.name.clone();
    if !ally.is_alive() {
        let text = format!("{name} is in no state to fight.");
        return Ok(CompanionOutcome::refused(state, text));
    }

    let report = effects::tick(&mut ally.active_effects, &mut ally.vitals);
    if !ally.is_alive() {
        let text = format!("{name} succumbs to their wounds.");
        state.log.push(LogEntry::new(state.turn, &name, "perish", "", &text));
        return Ok(CompanionOutcome::refused(state, text));
    }
    if report.stunned {
        let text = format!("{name} is stunned and cannot act.");
        state.log.push(LogEntry::new(state.turn, &name, "stunned", "", &text));
        return Ok(CompanionOutcome::refused(state, text));
    }

    let snapshot = ally.clone();
    let ability = match select_ability(&snapshot, action) {
        Ok(ability) => ability,
        Err(text) => return Ok(CompanionOutcome::refused(state, text)),
    };

    // A friendly target plus a damaging ability is a refusal.
    if ability.damage > 0 {
        let friendly_target = action.target.is_some_and(|id| state.is_friendly(id));
        if friendly_target {
            let text = format!("{name} refuses to strike an ally.");
            return Ok(CompanionOutcome::refused(state, text));
        }
    }

    if ability.is_supportive() {
        return Ok(support(state, &name, action, &ability));
    }

    let fallback = state.first_living_enemy().map(|a| a.id);
    let target_id = match action.target.filter(|id| state.is_enemy(*id)) {
        Some(id) if state.actor(id).is_some_and(|a| a.is_alive()) => Some(id),
        _ => fallback,
    };
    let Some(target_id) = target_id else {
        let text = format!("{name} finds nothing left to fight.");
        return Ok(CompanionOutcome::refused(state, text));
    };

    if let Some(ally) = state.actor_mut(action.ally) {
        pay_costs(&mut ally.vitals, &ability.cost);
        ally.record_ability(&ability.id);
    }

    let roll = roll::resolve_attack(rng, COMPANION_CRIT_CHANCE, 0.0, action.roll);
    if !roll.hit {
        let text = format!("{name}'s attack goes wide.");
        state.log.push(
            LogEntry::new(state.turn, &name, &ability.name, "", &text).with_roll(RollDetail {
                natural: roll.natural,
                tier: roll.tier.to_string(),
                crit: false,
                location: HitLocation::from_natural(roll.natural).to_string(),
            }),
        );
        return Ok(CompanionOutcome::acted(state, text));
    }

    let base = effects::effective_damage(ability.damage, &snapshot.active_effects);
    let raw = damage::raw_damage(base, snapshot.level, &roll);

    let Some(target) = state.actor_mut(target_id) else {
        let text = format!("{name} finds nothing left to fight.");
        return Ok(CompanionOutcome::refused(state, text));
    };
    let armor = effects::effective_armor(target.armor, &target.active_effects);
    let dealt = damage::mitigated(raw, armor);
    target.vitals.damage(dealt);
    let target_name = target.name.clone();
    let felled = !target.is_alive();

    let location = HitLocation::from_natural(roll.natural);
    let crit_mark = if roll.crit { " Critical hit!" } else { "" };
    let felled_mark = if felled {
        format!(" The {target_name} collapses!")
    } else {
        String::new()
    };
    let text = format!(
        "{name} {} the {target_name}'s {location} for {dealt} damage.{crit_mark}{felled_mark}",
        describe_hit(roll.tier),
    );

    state.log.push(
        LogEntry::new(state.turn, &name, &ability.name, &target_name, &text).with_roll(
            RollDetail {
                natural: roll.natural,
                tier: roll.tier.to_string(),
                crit: roll.crit,
                location: location.to_string(),
            },
        ),
    );

    Ok(CompanionOutcome::acted(state, text))
}

/// Resolve which ability the companion uses, or a refusal narration.
fn select_ability(ally: &Actor, action: &CompanionAction) -> Result<Ability, String> {
    if action.auto {
        let best = ally
            .abilities
            .iter()
            .filter(|a| a.damage > 0)
            .max_by_key(|a| a.damage)
            .cloned();
        return Ok(best.unwrap_or_else(|| {
            Ability::new("strike", "Strike", AbilityKind::Melee, ally.base_damage)
        }));
    }

    let Some(id) = action.ability.as_deref() else {
        return Err(format!("{} waits for a clear order.", ally.name));
    };
    match ally.ability(id) {
        Some(ability) => Ok(ability.clone()),
        None => Err(format!("{} does not know \"{id}\".", ally.name)),
    }
}

/// Self-directed support: companions mend themselves or a named friend.
fn support(
    mut state: CombatState,
    name: &str,
    action: &CompanionAction,
    ability: &Ability,
) -> CompanionOutcome {
    let heal = ability.heal.max(0);
    if heal == 0 {
        let text = format!("{name} uses {}.", ability.name);
        state.log.push(LogEntry::new(state.turn, name, &ability.name, "", &text));
        return CompanionOutcome::acted(state, text);
    }

    let recipient = action
        .target
        .filter(|id| !id.is_player())
        .filter(|id| state.allies.iter().any(|a| a.id == *id && a.is_alive()))
        .unwrap_or(action.ally);
    let text = match state.actor_mut(recipient) {
        Some(target) => {
            target.vitals.heal(heal);
            if recipient == action.ally {
                format!("{name} binds their own wounds for {heal} health.")
            } else {
                format!("{name} mends {} for {heal} health.", target.name)
            }
        }
        None => format!("{name} uses {}.", ability.name),
    };
    state.log.push(LogEntry::new(state.turn, name, &ability.name, "", &text));
    CompanionOutcome::acted(state, text)
}

#[cfg(test)]
mod tests {
    use fm_core::ability::AbilityKind;
    use fm_core::actor::{Actor, CompanionMeta, CreatureKind};
    use fm_core::effect::{ActiveEffect, Effect};
    use fm_core::state::CombatOutcome;
    use rand::SeedableRng;

    use super::*;

    fn brynja() -> Actor {
        Actor::new("Brynja", CreatureKind::Humanoid, 3, 50, 10, 9)
            .with_companion(CompanionMeta::follower())
            .with_ability(Ability::new("strike", "Strike", AbilityKind::Melee, 9))
            .with_ability(Ability::new("smash", "Smash", AbilityKind::Melee, 12))
    }

    fn arena() -> (CombatState, ActorId, ActorId) {
        let mut state = CombatState::new("Frostmarch Pass");
        let enemy = Actor::new("bandit", CreatureKind::Humanoid, 1, 100, 0, 8);
        let enemy_id = enemy.id;
        state.add_enemy(enemy).unwrap();
        let ally = brynja();
        let ally_id = ally.id;
        state.add_ally(ally).unwrap();
        state.turn_order = vec![ActorId::PLAYER, enemy_id, ally_id];
        (state, enemy_id, ally_id)
    }

    fn run(state: &CombatState, action: &CompanionAction, seed: u64) -> CompanionOutcome {
        let mut rng = StdRng::seed_from_u64(seed);
        execute(state, action, &mut rng).unwrap()
    }

    #[test]
    fn auto_reaches_for_the_biggest_hit() {
        let (state, _, ally_id) = arena();
        // A lucky seven crits by definition, so the damage is exact.
        let action = CompanionAction::auto(ally_id).with_roll(7);
        let out = run(&state, &action, 11);

        assert!(out.success);
        assert_eq!(out.state.enemies[0].vitals.health.current, 76);
        assert_eq!(out.state.allies[0].last_ability(), Some("smash"));
    }

    #[test]
    fn directed_abilities_must_be_known() {
        let (state, _, ally_id) = arena();
        let action = CompanionAction::directed(ally_id, "fireball");
        let out = run(&state, &action, 11);

        assert!(!out.success);
        assert!(out.narrative.contains("does not know"), "{}", out.narrative);
        assert_eq!(out.state.enemies[0].vitals.health.current, 100);
    }

    #[test]
    fn companions_refuse_to_strike_allies() {
        let (state, _, ally_id) = arena();
        let action = CompanionAction::directed(ally_id, "strike").with_target(ActorId::PLAYER);
        let out = run(&state, &action, 11);

        assert!(!out.success);
        assert!(out.narrative.contains("refuses"), "{}", out.narrative);
    }

    #[test]
    fn directed_strikes_land_on_the_named_enemy() {
        let (mut state, first_id, ally_id) = arena();
        let second = Actor::new("wolf", CreatureKind::Beast, 1, 40, 0, 6);
        let second_id = second.id;
        state.add_enemy(second).unwrap();

        let action = CompanionAction::directed(ally_id, "strike")
            .with_target(second_id)
            .with_roll(7);
        let out = run(&state, &action, 11);

        assert!(out.success);
        assert_eq!(out.state.actor(first_id).unwrap().vitals.health.current, 100);
        assert_eq!(out.state.actor(second_id).unwrap().vitals.health.current, 22);
    }

    #[test]
    fn stunned_companions_sit_out() {
        let (mut state, _, ally_id) = arena();
        state
            .actor_mut(ally_id)
            .unwrap()
            .active_effects
            .push(ActiveEffect::new(Effect::Stun { rounds: 1 }));
        let action = CompanionAction::auto(ally_id);
        let out = run(&state, &action, 11);

        assert!(!out.success);
        assert!(out.narrative.contains("stunned"), "{}", out.narrative);
    }

    #[test]
    fn downed_companions_cannot_act() {
        let (mut state, _, ally_id) = arena();
        state.actor_mut(ally_id).unwrap().vitals.damage(50);
        let action = CompanionAction::auto(ally_id);
        let out = run(&state, &action, 11);

        assert!(!out.success);
    }

    #[test]
    fn no_target_left_is_a_refusal() {
        let (mut state, enemy_id, ally_id) = arena();
        state.actor_mut(enemy_id).unwrap().vitals.damage(100);
        let action = CompanionAction::auto(ally_id).with_roll(7);
        let out = run(&state, &action, 11);

        assert!(!out.success);
        assert!(out.narrative.contains("nothing left"), "{}", out.narrative);
    }

    #[test]
    fn healers_mend_themselves_by_default() {
        let (mut state, _, ally_id) = arena();
        {
            let ally = state.actor_mut(ally_id).unwrap();
            ally.abilities.push(
                Ability::new("mend", "Mend", AbilityKind::Utility, 0).with_heal(12),
            );
            ally.vitals.damage(20);
        }
        let action = CompanionAction::directed(ally_id, "mend");
        let out = run(&state, &action, 11);

        assert!(out.success);
        assert_eq!(out.state.allies[0].vitals.health.current, 42);
    }

    #[test]
    fn unknown_allies_are_an_error() {
        let (state, _, _) = arena();
        let mut rng = StdRng::seed_from_u64(11);
        let err = execute(&state, &CompanionAction::auto(ActorId::new()), &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::UnknownActor(_)));
    }

    #[test]
    fn finished_combat_rejects_companion_turns() {
        let (mut state, _, ally_id) = arena();
        state.finish(CombatOutcome::Fled);
        let mut rng = StdRng::seed_from_u64(11);
        let err = execute(&state, &CompanionAction::auto(ally_id), &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::CombatOver(CombatOutcome::Fled)));
    }
}
