//! The Frostmarch combat engine: d20 resolution, turn scheduling, and
//! encounter lifecycle over the `fm-core` data model.
//!
//! The engine never mutates in place. Every executor takes the current
//! [`CombatState`](fm_core::state::CombatState) by reference and hands
//! back a fresh one inside its outcome, so callers keep the previous
//! state for free and can persist or diff the two. Randomness flows
//! from a single seeded RNG owned by [`CombatEngine`]; the same seed
//! and action sequence replay the same fight.

/// Engine tunables with sensible defaults.
pub mod config;
/// Tier multipliers, level bonus, and armor mitigation.
pub mod damage;
/// Status effect ticking and stat modifiers.
pub mod effects;
/// Encounter setup, scaling, and settlement.
pub mod encounter;
/// The seeded facade over the subsystems.
pub mod engine;
/// Error types for structural misuse.
pub mod error;
/// Ready-made enemies, abilities, perks, and items.
pub mod presets;
/// The d20 attack roll.
pub mod roll;
/// Turn order advancement and round upkeep.
pub mod scheduler;
/// Per-actor action executors.
pub mod turns;

/// Re-export the configuration.
pub use config::EngineConfig;
/// Re-export damage math.
pub use damage::{CRIT_MULTIPLIER, HitLocation};
/// Re-export area hit reporting.
pub use effects::AreaHit;
/// Re-export encounter entry points.
pub use encounter::{EncounterSetup, check_combat_end, initialize_combat};
/// Re-export the engine facade.
pub use engine::CombatEngine;
/// Re-export error types.
pub use error::{EngineError, EngineResult};
/// Re-export roll types.
pub use roll::{AttackRoll, RollTier};
/// Re-export the scheduler entry point.
pub use scheduler::advance_turn;
/// Re-export the shared executor outcome.
pub use turns::ActionOutcome;
/// Re-export companion executor types.
pub use turns::companion::{CompanionAction, CompanionOutcome};
/// Re-export player executor types.
pub use turns::player::{PlayerAction, PlayerActionKind, PlayerContext};
