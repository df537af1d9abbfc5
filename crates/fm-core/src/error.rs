//! Error types for the core data model.

use crate::actor::ActorId;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when manipulating combat data.
///
/// These cover structural misuse only. Gameplay failures (an ability on
/// cooldown, a dead target, an empty bottle) are narration, not errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested actor id does not exist in the combat state.
    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),

    /// An actor with the same id is already part of the encounter.
    #[error("duplicate actor: {0}")]
    DuplicateActor(ActorId),

    /// A generic validation error with a descriptive message.
    #[error("validation error: {0}")]
    Validation(String),
}
