//! The seeded facade that ties the combat subsystems together.
//!
//! [`CombatEngine`] owns the configuration and a single seeded RNG, so a
//! caller that replays the same actions against the same seed gets the
//! same fight. Every executor call settles the encounter afterwards, so
//! callers never observe a state where the fight is over but still
//! marked active.

use fm_core::actor::ActorId;
use fm_core::player::PlayerStats;
use fm_core::state::CombatState;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::EngineConfig;
use crate::encounter::{self, EncounterSetup};
use crate::error::EngineResult;
use crate::scheduler;
use crate::turns::ActionOutcome;
use crate::turns::companion::{self, CompanionAction, CompanionOutcome};
use crate::turns::enemy;
use crate::turns::player::{self, PlayerAction, PlayerContext};

/// Combat orchestrator with deterministic, seed-driven randomness.
#[derive(Debug)]
pub struct CombatEngine {
    config: EngineConfig,
    rng: StdRng,
}

impl CombatEngine {
    /// Build an engine, seeding the RNG from the configuration.
    pub fn new(config: EngineConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    /// The configuration this engine runs under.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open an encounter from a setup.
    pub fn initialize_combat(&mut self, setup: &EncounterSetup) -> EngineResult<CombatState> {
        encounter::initialize_combat(setup, &self.config, &mut self.rng)
    }

    /// Run one player action, then settle the encounter if it ended.
    pub fn execute_player_action(
        &mut self,
        state: &CombatState,
        ctx: PlayerContext<'_>,
        action: &PlayerAction,
    ) -> EngineResult<ActionOutcome> {
        let mut outcome = player::execute(state, ctx, action, &self.config, &mut self.rng)?;
        outcome.state =
            encounter::check_combat_end(&outcome.state, &outcome.player, &self.config, &mut self.rng);
        Ok(outcome)
    }

    /// Run one enemy turn, then settle the encounter if it ended.
    ///
    /// `roll_override` pins the enemy's d20, for scripted sequences.
    pub fn execute_enemy_turn(
        &mut self,
        state: &CombatState,
        enemy_id: ActorId,
        player: &PlayerStats,
        roll_override: Option<u32>,
    ) -> EngineResult<ActionOutcome> {
        let mut outcome =
            enemy::execute(state, enemy_id, player, &self.config, &mut self.rng, roll_override)?;
        outcome.state =
            encounter::check_combat_end(&outcome.state, &outcome.player, &self.config, &mut self.rng);
        Ok(outcome)
    }

    /// Run one companion action, then settle the encounter if it ended.
    pub fn execute_companion_action(
        &mut self,
        state: &CombatState,
        player: &PlayerStats,
        action: &CompanionAction,
    ) -> EngineResult<CompanionOutcome> {
        let mut outcome = companion::execute(state, action, &mut self.rng)?;
        outcome.state =
            encounter::check_combat_end(&outcome.state, player, &self.config, &mut self.rng);
        Ok(outcome)
    }

    /// Move the scheduler to the next living combatant.
    pub fn advance_turn(&self, state: &CombatState) -> CombatState {
        scheduler::advance_turn(state, &self.config)
    }

    /// Settle the encounter if either side is finished.
    pub fn check_combat_end(&mut self, state: &CombatState, player: &PlayerStats) -> CombatState {
        encounter::check_combat_end(state, player, &self.config, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use fm_core::actor::{Actor, ActorId, CreatureKind};
    use fm_core::perk::PerkCatalog;
    use fm_core::player::{Character, WeaponClass};
    use fm_core::state::CombatOutcome;

    use crate::presets;

    use super::*;

    #[test]
    fn same_seed_means_same_fight() {
        let setup = EncounterSetup::new("Frostmarch Pass")
            .with_enemy(presets::bandit(2))
            .for_level(10);

        let mut first = CombatEngine::new(EngineConfig::default().with_seed(7));
        let mut second = CombatEngine::new(EngineConfig::default().with_seed(7));
        let a = first.initialize_combat(&setup).unwrap();
        let b = second.initialize_combat(&setup).unwrap();

        let ids_a: Vec<ActorId> = a.enemies.iter().map(|e| e.id).collect();
        let ids_b: Vec<ActorId> = b.enemies.iter().map(|e| e.id).collect();
        assert_eq!(a.enemies.len(), 4);
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn killing_blow_settles_the_encounter() {
        let mut engine = CombatEngine::new(EngineConfig::default().without_scaling());
        let rat = Actor::new("rat", CreatureKind::Beast, 1, 1, 0, 1).with_rewards(2, 0);
        let setup = EncounterSetup::new("Granary Cellar").with_enemy(rat);
        let state = engine.initialize_combat(&setup).unwrap();

        let stats = PlayerStats::new(1).with_weapon(10, WeaponClass::Sword);
        let character = Character::new();
        let perks = PerkCatalog::default();
        let ctx = PlayerContext {
            stats: &stats,
            character: &character,
            perks: &perks,
            inventory: None,
        };
        let action = PlayerAction::attack().with_roll(15);
        let outcome = engine.execute_player_action(&state, ctx, &action).unwrap();

        assert_eq!(outcome.state.outcome, CombatOutcome::Victory);
        assert!(!outcome.state.active);
        assert_eq!(outcome.state.pending_rewards.xp, 2);
    }
}
