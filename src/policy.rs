//! Policies (context → decision value) and action-count providers.
//!
//! A policy is a pure mapping from a caller context to a value whose shape
//! depends on the explorer consuming it: a single [`Action`](crate::Action),
//! a [`Ranking`](crate::Ranking), or a score vector (`Vec<f32>`). Policies must
//! not depend on hidden mutable state beyond a model snapshot they report via
//! [`PolicyState`](crate::PolicyState).
//!
//! # Example
//!
//! ```rust
//! use propensity::{policy_fn, Policy};
//!
//! struct Ctx { premium: bool }
//!
//! let p = policy_fn(|c: &Ctx| if c.premium { 2u32 } else { 1u32 });
//! assert_eq!(p.map_context(&Ctx { premium: true }).value, 2);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{ExploreError, PolicyDecision, Result};

/// Maps a context to a decision value of shape `V`.
pub trait Policy<C, V>: Send + Sync {
    fn map_context(&self, context: &C) -> PolicyDecision<V>;
}

impl<C, V, P> Policy<C, V> for Arc<P>
where
    P: Policy<C, V> + ?Sized,
{
    fn map_context(&self, context: &C) -> PolicyDecision<V> {
        (**self).map_context(context)
    }
}

/// Adapter turning a closure `Fn(&C) -> V` into a [`Policy`].
pub struct FnPolicy<F, C, V> {
    f: F,
    _marker: PhantomData<fn(&C) -> V>,
}

impl<F, C, V> fmt::Debug for FnPolicy<F, C, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPolicy").finish_non_exhaustive()
    }
}

/// Wrap a closure as a policy.
pub fn policy_fn<F, C, V>(f: F) -> FnPolicy<F, C, V>
where
    F: Fn(&C) -> V + Send + Sync,
{
    FnPolicy {
        f,
        _marker: PhantomData,
    }
}

impl<F, C, V> Policy<C, V> for FnPolicy<F, C, V>
where
    F: Fn(&C) -> V + Send + Sync,
{
    fn map_context(&self, context: &C) -> PolicyDecision<V> {
        PolicyDecision::new((self.f)(context))
    }
}

/// A policy that ignores the context.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantPolicy<V> {
    decision: PolicyDecision<V>,
}

impl<V> ConstantPolicy<V> {
    pub fn new(value: V) -> Self {
        Self {
            decision: PolicyDecision::new(value),
        }
    }

    pub fn with_decision(decision: PolicyDecision<V>) -> Self {
        Self { decision }
    }
}

impl<C, V> Policy<C, V> for ConstantPolicy<V>
where
    V: Clone + Send + Sync,
{
    fn map_context(&self, _context: &C) -> PolicyDecision<V> {
        self.decision.clone()
    }
}

/// Resolves the number of available actions for a context.
///
/// Returning `None` means the count could not be determined.
pub trait NumActionsProvider<C>: Send + Sync {
    fn num_actions(&self, context: &C) -> Option<usize>;
}

impl<C, F> NumActionsProvider<C> for F
where
    F: Fn(&C) -> Option<usize> + Send + Sync,
{
    fn num_actions(&self, context: &C) -> Option<usize> {
        self(context)
    }
}

/// Fixed action count, or a per-context provider.
pub enum ActionCount<C> {
    Fixed(usize),
    Provider(Arc<dyn NumActionsProvider<C>>),
}

impl<C> Clone for ActionCount<C> {
    fn clone(&self) -> Self {
        match self {
            ActionCount::Fixed(n) => ActionCount::Fixed(*n),
            ActionCount::Provider(p) => ActionCount::Provider(Arc::clone(p)),
        }
    }
}

impl<C> fmt::Debug for ActionCount<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionCount::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            ActionCount::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

impl<C> From<usize> for ActionCount<C> {
    fn from(n: usize) -> Self {
        ActionCount::Fixed(n)
    }
}

impl<C> ActionCount<C> {
    /// Wrap a provider.
    pub fn provider(p: impl NumActionsProvider<C> + 'static) -> Self {
        ActionCount::Provider(Arc::new(p))
    }

    /// Resolve and validate the count for `context`.
    pub fn resolve(&self, context: &C) -> Result<usize> {
        let n = match self {
            ActionCount::Fixed(n) => *n,
            ActionCount::Provider(p) => p
                .num_actions(context)
                .ok_or(ExploreError::UnknownActionSpace)?,
        };
        validate_num_actions(n)
    }
}

/// Reject counts of zero or beyond the 32-bit action id space.
pub fn validate_num_actions(num_actions: usize) -> Result<usize> {
    if num_actions == 0 || u32::try_from(num_actions).is_err() {
        return Err(ExploreError::InvalidActionSpace { num_actions });
    }
    Ok(num_actions)
}
