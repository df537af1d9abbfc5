//! Engine configuration, resolved once and threaded through the engine.
//!
//! Nothing in the engine consults ambient or global state: every knob
//! lives here and is fixed when the [`crate::engine::CombatEngine`] is
//! built.

use serde::{Deserialize, Serialize};

/// Tunable knobs of the combat engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// RNG seed for reproducible encounters.
    pub seed: u64,
    /// Base chance to flee before dodge is added, in `[0, 1]`.
    pub flee_base_chance: f64,
    /// Hard cap on the flee chance, in `[0, 1]`.
    pub flee_chance_cap: f64,
    /// Fraction of incoming damage removed while guarding, in `[0, 1]`.
    pub guard_reduction: f64,
    /// Rounds a guard stance lasts.
    pub guard_duration: u32,
    /// Fraction of current health an expired summon loses per player
    /// turn, in `[0, 1]`.
    pub summon_decay_fraction: f64,
    /// Hunger charged per round of combat.
    pub hunger_per_round: f64,
    /// Thirst charged per round of combat.
    pub thirst_per_round: f64,
    /// Fatigue charged per round of combat.
    pub fatigue_per_round: f64,
    /// Scale under-populated encounters up to a level-appropriate
    /// headcount.
    pub scale_encounters: bool,
    /// Attach minions to boss-tagged enemies at encounter start.
    pub attach_boss_minions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            flee_base_chance: 0.5,
            flee_chance_cap: 0.9,
            guard_reduction: 0.5,
            guard_duration: 3,
            summon_decay_fraction: 0.5,
            hunger_per_round: 1.5,
            thirst_per_round: 1.0,
            fatigue_per_round: 2.0,
            scale_encounters: true,
            attach_boss_minions: true,
        }
    }
}

impl EngineConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the base flee chance (clamped to `[0, 1]`).
    pub fn with_flee_base_chance(mut self, chance: f64) -> Self {
        self.flee_base_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Set the guard stance strength and duration.
    pub fn with_guard(mut self, reduction: f64, duration: u32) -> Self {
        self.guard_reduction = reduction.clamp(0.0, 1.0);
        self.guard_duration = duration;
        self
    }

    /// Set the per-round survival costs.
    pub fn with_survival_costs(mut self, hunger: f64, thirst: f64, fatigue: f64) -> Self {
        self.hunger_per_round = hunger;
        self.thirst_per_round = thirst;
        self.fatigue_per_round = fatigue;
        self
    }

    /// Disable encounter headcount scaling.
    pub fn without_scaling(mut self) -> Self {
        self.scale_encounters = false;
        self
    }

    /// Disable boss minion attachment.
    pub fn without_boss_minions(mut self) -> Self {
        self.attach_boss_minions = false;
        self
    }
}
