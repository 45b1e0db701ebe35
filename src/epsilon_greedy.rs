//! Epsilon-greedy exploration over a single recommended action.
//!
//! One draw decides explore vs. exploit. Only when exploring is a second,
//! uniform draw made over all actions. The reported probability is the total
//! mass on the returned action:
//!
//! - `1 - ε + ε/K` for the policy's action (whichever branch produced it)
//! - `ε/K` for any other action

use std::sync::atomic::{AtomicBool, Ordering};

use crate::explorer::{ensure_action, ensure_num_actions};
use crate::{Action, ExploreError, Explorer, ExplorerDecision, ExplorerState, Prg, Result};

/// Configuration for [`EpsilonGreedyExplorer`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpsilonGreedyConfig {
    /// Exploration rate in `[0, 1]`.
    pub epsilon: f32,
}

impl Default for EpsilonGreedyConfig {
    fn default() -> Self {
        Self { epsilon: 0.1 }
    }
}

impl EpsilonGreedyConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || !(0.0..=1.0).contains(&self.epsilon) {
            return Err(ExploreError::InvalidParameter {
                name: "epsilon",
                value: f64::from(self.epsilon),
            });
        }
        Ok(())
    }
}

/// Epsilon-greedy explorer.
#[derive(Debug)]
pub struct EpsilonGreedyExplorer {
    cfg: EpsilonGreedyConfig,
    explore: AtomicBool,
}

impl EpsilonGreedyExplorer {
    pub fn new(cfg: EpsilonGreedyConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            explore: AtomicBool::new(true),
        })
    }

    /// Shorthand for `new(EpsilonGreedyConfig { epsilon })`.
    pub fn with_epsilon(epsilon: f32) -> Result<Self> {
        Self::new(EpsilonGreedyConfig { epsilon })
    }

    #[must_use]
    pub fn config(&self) -> EpsilonGreedyConfig {
        self.cfg
    }

    /// Returns `(action, probability, explored)`.
    fn choose(
        prg: &mut Prg,
        epsilon: f32,
        policy_action: Action,
        num_actions: u32,
    ) -> (Action, f32, bool) {
        let base = epsilon / num_actions as f32;
        if prg.uniform_unit_interval() < 1.0 - epsilon {
            return (policy_action, 1.0 - epsilon + base, false);
        }
        let a = prg.uniform_int(1, num_actions);
        let p = if a == policy_action {
            1.0 - epsilon + base
        } else {
            base
        };
        (a, p, true)
    }
}

impl Explorer for EpsilonGreedyExplorer {
    type Input = Action;
    type Output = Action;

    fn explore(
        &self,
        prg: &mut Prg,
        policy_action: &Action,
        num_actions: usize,
    ) -> Result<ExplorerDecision<Action>> {
        let n = ensure_num_actions(num_actions)?;
        let policy_action = ensure_action(*policy_action, num_actions)?;

        if !self.explore.load(Ordering::Acquire) {
            return Ok(ExplorerDecision::certain(policy_action));
        }

        let (action, probability, explored) =
            Self::choose(prg, self.cfg.epsilon, policy_action, n);
        Ok(ExplorerDecision::new(
            action,
            ExplorerState::EpsilonGreedy {
                probability,
                explored,
            },
            true,
        ))
    }

    fn enable_explore(&self, explore: bool) {
        tracing::debug!(explore, "epsilon-greedy exploration toggled");
        self.explore.store(explore, Ordering::Release);
    }
}
