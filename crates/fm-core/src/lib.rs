//! Core types for Frostmarch: actors, abilities, effects, perks, and the
//! combat state aggregate.
//!
//! This crate defines the data model the combat engine operates on. It is
//! independent of the engine: you can construct a [`CombatState`]
//! programmatically or deserialize one from JSON; all dice and rules live
//! in `fm-combat`.

/// Abilities: attacks, spells, shouts, and utility actions.
pub mod ability;
/// Actors, identifiers, vitals, and companion bookkeeping.
pub mod actor;
/// Timed status effects and summon templates.
pub mod effect;
/// Error types used throughout the crate.
pub mod error;
/// Consumable items usable during combat.
pub mod item;
/// The deduplicated combat log and its exports.
pub mod log;
/// Perk definitions and bonus aggregation.
pub mod perk;
/// Player stats, survival meters, and the character sheet.
pub mod player;
/// The combat state aggregate.
pub mod state;

/// Re-export ability types.
pub use ability::{Ability, AbilityCost, AbilityKind, Element};
/// Re-export actor types.
pub use actor::{
    Actor, ActorId, Behavior, CompanionMeta, CreatureKind, HealthState, Hostility, LootDrop, Pool,
    Vitals,
};
/// Re-export effect types.
pub use effect::{ActiveEffect, BuffStat, Effect, SummonTemplate};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export item types.
pub use item::{CombatItem, Inventory, ItemKind};
/// Re-export log types.
pub use log::{CombatLog, LogEntry, RollDetail};
/// Re-export perk types.
pub use perk::{Perk, PerkBonus, PerkCatalog};
/// Re-export player types.
pub use player::{Character, PlayerStats, SurvivalDelta, SurvivalMeters, WeaponClass};
/// Re-export state types.
pub use state::{CombatOutcome, CombatState, Rewards};
