//! The explorer contract shared by every exploration strategy.
//!
//! ```text
//! explore(prg, policy_value, num_actions) -> ExplorerDecision
//! ```
//!
//! `prg` is seeded once per decision from the event's [`Seed`](crate::Seed), so a
//! strategy's draws replay exactly for the same key. Every strategy also has an
//! exploration toggle: with exploration disabled it must return the policy's top
//! choice with probability 1 and always record.
//!
//! Indices are 1-based at this boundary. The helpers in this module are the
//! single place where policy output is range-checked before any histogram or
//! score slot is touched.

use std::collections::HashSet;
use std::sync::Arc;

use crate::{Action, ExploreError, ExplorerDecision, Prg, Result};

/// One exploration strategy.
///
/// `Input` is the policy value shape the strategy consumes; `Output` is what
/// the caller is served.
pub trait Explorer: Send + Sync {
    type Input;
    type Output;

    fn explore(
        &self,
        prg: &mut Prg,
        input: &Self::Input,
        num_actions: usize,
    ) -> Result<ExplorerDecision<Self::Output>>;

    /// Turn exploration on or off. Visible to subsequent calls.
    fn enable_explore(&self, explore: bool);
}

impl<E> Explorer for Arc<E>
where
    E: Explorer + ?Sized,
{
    type Input = E::Input;
    type Output = E::Output;

    fn explore(
        &self,
        prg: &mut Prg,
        input: &Self::Input,
        num_actions: usize,
    ) -> Result<ExplorerDecision<Self::Output>> {
        (**self).explore(prg, input, num_actions)
    }

    fn enable_explore(&self, explore: bool) {
        (**self).enable_explore(explore);
    }
}

/// A strategy that needs no policy input (used before any policy exists).
pub trait FullExplorer<O>: Send + Sync {
    fn explore_full(&self, prg: &mut Prg, num_actions: usize) -> Result<ExplorerDecision<O>>;
}

impl<O, E> FullExplorer<O> for Arc<E>
where
    E: FullExplorer<O> + ?Sized,
{
    fn explore_full(&self, prg: &mut Prg, num_actions: usize) -> Result<ExplorerDecision<O>> {
        (**self).explore_full(prg, num_actions)
    }
}

/// Object-safe explorer handle for a given input/output shape.
pub type DynExplorer<I, O> = Arc<dyn Explorer<Input = I, Output = O>>;

pub(crate) fn ensure_num_actions(num_actions: usize) -> Result<u32> {
    u32::try_from(crate::validate_num_actions(num_actions)?)
        .map_err(|_| ExploreError::InvalidActionSpace { num_actions })
}

/// Check that `action` is a valid 1-based id for `num_actions`.
pub fn ensure_action(action: Action, num_actions: usize) -> Result<Action> {
    if action == 0 || action as usize > num_actions {
        return Err(ExploreError::OutOfRangeAction {
            action,
            num_actions,
        });
    }
    Ok(action)
}

/// Validate a ranking: non-empty, in range, no duplicates.
pub fn ensure_ranking(ranking: &[Action], num_actions: usize) -> Result<()> {
    if ranking.is_empty() {
        return Err(ExploreError::EmptyDecision);
    }
    // Sized by the ranking, not the action space.
    let mut seen = HashSet::with_capacity(ranking.len());
    for &a in ranking {
        ensure_action(a, num_actions)?;
        if !seen.insert(a) {
            return Err(ExploreError::DuplicateAction { action: a });
        }
    }
    Ok(())
}

/// Validate a score vector's length against the action count.
pub(crate) fn ensure_scores(scores: &[f32], num_actions: usize) -> Result<()> {
    if scores.is_empty() {
        return Err(ExploreError::EmptyDecision);
    }
    if scores.len() != num_actions {
        return Err(ExploreError::ScoreCountMismatch {
            scores: scores.len(),
            num_actions,
        });
    }
    Ok(())
}

/// 1-based index of the highest score; first wins on ties.
pub(crate) fn argmax_action(scores: &[f32]) -> Action {
    let mut best = 0usize;
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] {
            best = i;
        }
    }
    best as Action + 1
}

/// Inverse-CDF sampling against one uniform draw.
///
/// Returns the 1-based action and its probability. If rounding leaves the
/// draw past the total, the last action with non-zero mass absorbs the
/// leftover `1 - total` and reports it as part of its probability, so the
/// reported value is the mass that actually selects it.
pub(crate) fn sample_categorical(probs: &[f32], draw: f32) -> (Action, f32) {
    let mut cdf = 0.0f32;
    for (i, &p) in probs.iter().enumerate() {
        cdf += p;
        if p > 0.0 && draw < cdf {
            return (i as Action + 1, p);
        }
    }
    let leftover = (1.0 - cdf).max(0.0);
    match probs.iter().rposition(|&p| p > 0.0) {
        Some(i) => (i as Action + 1, (probs[i] + leftover).min(1.0)),
        None => (probs.len() as Action, 1.0),
    }
}
