//! Tau-first exploration: explore uniformly for the first `tau` decisions, then
//! serve the policy deterministically without recording.
//!
//! The countdown is shared by every caller of the same explorer instance and is
//! decremented atomically, once per call, until it reaches zero. Which thread
//! gets which of the `tau` exploring slots is unspecified.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::explorer::{ensure_action, ensure_num_actions};
use crate::{Action, Explorer, ExplorerDecision, ExplorerState, Prg, Result};

/// Configuration for [`TauFirstExplorer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TauFirstConfig {
    /// Number of leading decisions that explore uniformly.
    pub tau: u64,
}

impl TauFirstConfig {
    /// Every `tau` is valid; `0` disables exploration from the first call.
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Uniform exploration over a fixed window of leading decisions.
///
/// Explores with probability `1/K` while the shared countdown is positive.
/// Afterwards it serves the policy's action with probability 1 and asks the
/// engine not to record.
#[derive(Debug)]
pub struct TauFirstExplorer {
    remaining: AtomicU64,
    explore: AtomicBool,
}

impl TauFirstExplorer {
    #[must_use]
    pub fn new(cfg: TauFirstConfig) -> Self {
        Self {
            remaining: AtomicU64::new(cfg.tau),
            explore: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn with_tau(tau: u64) -> Self {
        Self::new(TauFirstConfig { tau })
    }

    /// Exploring decisions left in the window.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Claim one exploring slot; `Some(left_after)` if one was available.
    fn take_slot(&self) -> Option<u64> {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| t.checked_sub(1))
            .ok()
            .map(|before| before - 1)
    }
}

impl Explorer for TauFirstExplorer {
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

        match self.take_slot() {
            Some(remaining) => {
                let action = prg.uniform_int(1, n);
                Ok(ExplorerDecision::new(
                    action,
                    ExplorerState::TauFirst {
                        probability: 1.0 / n as f32,
                        remaining,
                    },
                    true,
                ))
            }
            None => Ok(ExplorerDecision::new(
                policy_action,
                ExplorerState::TauFirst {
                    probability: 1.0,
                    remaining: 0,
                },
                false,
            )),
        }
    }

    fn enable_explore(&self, explore: bool) {
        tracing::debug!(explore, remaining = self.remaining(), "tau-first exploration toggled");
        self.explore.store(explore, Ordering::Release);
    }
}
