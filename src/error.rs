//! Error types for exploration and recording.
//!
//! Exploration errors are always surfaced synchronously to the caller of the
//! decision; nothing here is retried internally. Recorder failures have their
//! own type and never turn into a failed decision.

use thiserror::Error;

/// Errors raised while building an engine or choosing an action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExploreError {
    /// A required component is missing or empty (explorer, recorder, bag bank, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The resolved action count is zero or does not fit the 32-bit action id space.
    #[error("invalid action space: {num_actions} actions")]
    InvalidActionSpace { num_actions: usize },

    /// The action-count provider could not determine a count for the context.
    #[error("could not determine the number of actions for this context")]
    UnknownActionSpace,

    /// A policy or bag returned an action id outside `1..=num_actions`.
    #[error("action {action} is outside the valid range 1..={num_actions}")]
    OutOfRangeAction { action: u32, num_actions: usize },

    /// A ranking or score vector carried no entries.
    #[error("policy decision must not be empty")]
    EmptyDecision,

    /// A ranking listed the same action more than once.
    #[error("action {action} appears more than once in the ranking")]
    DuplicateAction { action: u32 },

    /// A score vector's length does not match the action count.
    #[error("expected {num_actions} scores, got {scores}")]
    ScoreCountMismatch { scores: usize, num_actions: usize },

    /// A score (softmax) or weight (generic) was unusable.
    #[error("invalid score {score} at index {index}")]
    InvalidScore { index: usize, score: f32 },

    /// A strategy parameter is outside its documented domain.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

impl ExploreError {
    /// True for both a non-positive count and a provider that could not answer.
    #[must_use]
    pub fn is_invalid_action_space(&self) -> bool {
        matches!(
            self,
            ExploreError::InvalidActionSpace { .. } | ExploreError::UnknownActionSpace
        )
    }
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, ExploreError>;

/// A recorder could not persist an interaction.
///
/// The engine logs these and still returns the chosen action.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A writer panicked while holding the recorder's lock.
    #[error("recorder lock was poisoned")]
    LockPoisoned,

    /// The underlying sink failed to write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The recorder refused the interaction; the message says why.
    #[error("recorder rejected interaction: {0}")]
    Rejected(String),
}
