//! Turn rotation: who acts next, and the per-round bookkeeping that
//! runs when the order wraps.

use fm_core::actor::{Actor, ActorId};
use fm_core::state::CombatState;

use crate::config::EngineConfig;

/// Advance to the next living actor in the turn order.
///
/// Dead entries are skipped in place; they stay in the order until the
/// lifecycle controller removes them. Passing the end of the order
/// counts a full round: the turn number rises, cooldowns and the guard
/// stance tick down, and summon lifetimes age.
pub fn advance_turn(state: &CombatState, config: &EngineConfig) -> CombatState {
    let mut state = state.clone();
    if !state.active || state.turn_order.is_empty() {
        return state;
    }

    let len = state.turn_order.len();
    let start = state
        .turn_order
        .iter()
        .position(|id| *id == state.current)
        .unwrap_or(0);

    let mut idx = start;
    for _ in 0..len {
        idx += 1;
        if idx >= len {
            idx = 0;
            wrap_round(&mut state, config);
        }
        let id = state.turn_order[idx];
        if is_living(&state, id) {
            state.current = id;
            return state;
        }
    }
    state
}

/// The player sentinel always counts as living; the player's pools are
/// tracked outside the roster.
fn is_living(state: &CombatState, id: ActorId) -> bool {
    id.is_player() || state.actor(id).is_some_and(Actor::is_alive)
}

fn wrap_round(state: &mut CombatState, config: &EngineConfig) {
    state.turn += 1;
    state.tick_cooldowns();

    if state.guard_rounds > 0 {
        state.guard_rounds -= 1;
        if state.guard_rounds == 0 {
            state.player_defending = false;
        }
    }

    // Summons already past their span rot first, then fresh expiries
    // are flagged so they keep full health for one more round.
    for ally in &mut state.allies {
        if ally.is_decaying() && ally.is_alive() {
            let loss = (f64::from(ally.vitals.health.current) * config.summon_decay_fraction)
                .floor()
                .max(1.0) as i32;
            ally.vitals.damage(loss);
        }
    }

    let mut expiring = Vec::new();
    for (id, rounds) in &mut state.pending_summons {
        *rounds = rounds.saturating_sub(1);
        if *rounds == 0 {
            expiring.push(*id);
        }
    }
    for id in expiring {
        state.pending_summons.remove(&id);
        if let Some(meta) = state.actor_mut(id).and_then(|a| a.companion.as_mut()) {
            meta.decaying = true;
        }
    }
}
