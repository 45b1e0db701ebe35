//! Decision envelopes passed between policy, explorer, and recorder.
//!
//! A policy produces a [`PolicyDecision`]; an explorer turns the policy's value
//! into an [`ExplorerDecision`] carrying the exact selection probability. Both
//! envelopes are plain values created and dropped within a single decision.

use crate::Seed;

/// 1-based action id. `0` is never a valid action.
pub type Action = u32;

/// Ordered list of 1-based action ids, best first, no duplicates.
pub type Ranking = Vec<Action>;

/// Optional state a policy attaches to its decision, forwarded to the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PolicyState {
    /// Identifier of the model snapshot that produced the value.
    Model { id: String },
    /// Free-form annotation (feature hash, experiment arm, ...).
    Custom(String),
}

/// A policy's output plus its optional recording state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolicyDecision<V> {
    pub value: V,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub state: Option<PolicyState>,
}

impl<V> PolicyDecision<V> {
    #[must_use]
    pub fn new(value: V) -> Self {
        Self { value, state: None }
    }

    #[must_use]
    pub fn with_state(value: V, state: PolicyState) -> Self {
        Self {
            value,
            state: Some(state),
        }
    }
}

impl<V> From<V> for PolicyDecision<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

/// Per-strategy record of how a decision was randomized.
///
/// Every variant carries the probability mass the randomized procedure placed
/// on the returned action.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExplorerState {
    /// Strategies with nothing to report beyond the probability.
    Generic { probability: f32 },
    /// Epsilon-greedy; `explored` is true when the uniform branch was taken.
    EpsilonGreedy { probability: f32, explored: bool },
    /// Tau-first; `remaining` is the countdown after this call.
    TauFirst { probability: f32, remaining: u64 },
    /// Bootstrap; which bag was served and how many bags agreed with it.
    Bootstrap {
        probability: f32,
        bag: usize,
        agreeing: usize,
        bags: usize,
    },
}

impl ExplorerState {
    #[must_use]
    pub fn probability(&self) -> f32 {
        match *self {
            ExplorerState::Generic { probability }
            | ExplorerState::EpsilonGreedy { probability, .. }
            | ExplorerState::TauFirst { probability, .. }
            | ExplorerState::Bootstrap { probability, .. } => probability,
        }
    }
}

/// An explorer's output for one decision.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExplorerDecision<O> {
    /// The chosen action (or ranking with the chosen action first).
    pub value: O,
    pub state: ExplorerState,
    /// False only while tau-first is past its exploration window.
    pub should_record: bool,
}

impl<O> ExplorerDecision<O> {
    #[must_use]
    pub fn new(value: O, state: ExplorerState, should_record: bool) -> Self {
        Self {
            value,
            state,
            should_record,
        }
    }

    /// A deterministic, recorded decision with probability 1.
    #[must_use]
    pub fn certain(value: O) -> Self {
        Self::new(value, ExplorerState::Generic { probability: 1.0 }, true)
    }

    #[must_use]
    pub fn probability(&self) -> f32 {
        self.state.probability()
    }

    /// Replace the value, keeping state and recording flag.
    pub fn map<U>(self, f: impl FnOnce(O) -> U) -> ExplorerDecision<U> {
        ExplorerDecision {
            value: f(self.value),
            state: self.state,
            should_record: self.should_record,
        }
    }
}

/// What the engine hands back from `decide*`: the served value plus the
/// exploration metadata that was (or would have been) recorded.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Choice<O> {
    pub value: O,
    pub state: ExplorerState,
    pub recorded: bool,
    pub seed: Seed,
}

impl<O> Choice<O> {
    #[must_use]
    pub fn probability(&self) -> f32 {
        self.state.probability()
    }
}

/// Shapes of explorer output that have a single served "top" action.
pub trait TopAction {
    /// First (served) action, if any.
    fn top_action(&self) -> Option<Action>;
}

impl TopAction for Action {
    fn top_action(&self) -> Option<Action> {
        Some(*self)
    }
}

impl TopAction for Ranking {
    fn top_action(&self) -> Option<Action> {
        self.first().copied()
    }
}
