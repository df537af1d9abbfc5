//! Error types for the combat engine.
//!
//! Only structural misuse is an error. Gameplay failures (an unknown
//! ability, a target that is already down, an empty bottle) come back as
//! narration with an unchanged state instead.

use fm_core::actor::ActorId;
use fm_core::error::CoreError;

/// Alias for `Result<T, EngineError>`.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur when driving the combat engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An executor was handed an actor id that is not in the encounter.
    #[error("unknown actor: {0}")]
    UnknownActor(ActorId),

    /// An encounter cannot start without at least one enemy.
    #[error("cannot start combat with an empty enemy roster")]
    EmptyRoster,

    /// An action was attempted after the encounter ended.
    #[error("combat is already over ({0})")]
    CombatOver(fm_core::state::CombatOutcome),

    /// A core data-model operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}
