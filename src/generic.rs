//! Generic exploration with a per-action probability floor.
//!
//! The policy supplies non-negative weights, one per action. The sampling
//! distribution mixes the normalized weights with a uniform floor:
//!
//! ```text
//! p_i = floor / K + (1 - floor) * w_i / Σw
//! ```
//!
//! so every action keeps at least `floor / K` mass while most of the mass stays
//! on the highest-weighted actions. All-zero weights fall back to uniform.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::explorer::{argmax_action, ensure_num_actions, ensure_scores, sample_categorical};
use crate::{Action, ExploreError, Explorer, ExplorerDecision, ExplorerState, Prg, Result};

/// Mixing-weight version for [`GenericConfig`]. Part of the log contract.
pub const GENERIC_MIXING_VERSION: u32 = 1;

/// Configuration for [`GenericExplorer`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenericConfig {
    /// Total mass spread uniformly over all actions, in `(0, 1]`.
    pub floor: f32,
}

impl Default for GenericConfig {
    fn default() -> Self {
        Self { floor: 0.05 }
    }
}

impl GenericConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.floor.is_finite() || self.floor <= 0.0 || self.floor > 1.0 {
            return Err(ExploreError::InvalidParameter {
                name: "floor",
                value: f64::from(self.floor),
            });
        }
        Ok(())
    }
}

/// Floor-mixed distribution over `weights`.
///
/// Weights must be finite and non-negative (checked by the explorer).
#[must_use]
pub fn floored_distribution(weights: &[f32], floor: f32) -> Vec<f32> {
    if weights.is_empty() {
        return Vec::new();
    }
    let k = weights.len() as f64;
    // Summed in f64 so several weights near `f32::MAX` stay finite.
    let total: f64 = weights.iter().map(|&w| f64::from(w)).sum();
    if total <= 0.0 || !total.is_finite() {
        return vec![(1.0 / k) as f32; weights.len()];
    }
    let floor = f64::from(floor);
    let uniform = floor / k;
    weights
        .iter()
        .map(|&w| (uniform + (1.0 - floor) * (f64::from(w) / total)) as f32)
        .collect()
}

/// Samples from [`floored_distribution`] over policy-supplied weights.
#[derive(Debug)]
pub struct GenericExplorer {
    cfg: GenericConfig,
    explore: AtomicBool,
}

impl GenericExplorer {
    pub fn new(cfg: GenericConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            explore: AtomicBool::new(true),
        })
    }

    #[must_use]
    pub fn config(&self) -> GenericConfig {
        self.cfg
    }
}

impl Default for GenericExplorer {
    fn default() -> Self {
        Self {
            cfg: GenericConfig::default(),
            explore: AtomicBool::new(true),
        }
    }
}

impl Explorer for GenericExplorer {
    type Input = Vec<f32>;
    type Output = Action;

    fn explore(
        &self,
        prg: &mut Prg,
        weights: &Vec<f32>,
        num_actions: usize,
    ) -> Result<ExplorerDecision<Action>> {
        ensure_num_actions(num_actions)?;
        ensure_scores(weights, num_actions)?;
        if let Some((index, &score)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(ExploreError::InvalidScore { index, score });
        }

        if !self.explore.load(Ordering::Acquire) {
            return Ok(ExplorerDecision::certain(argmax_action(weights)));
        }

        let probs = floored_distribution(weights, self.cfg.floor);
        let draw = prg.uniform_unit_interval();
        let (action, probability) = sample_categorical(&probs, draw);
        Ok(ExplorerDecision::new(
            action,
            ExplorerState::Generic { probability },
            true,
        ))
    }

    fn enable_explore(&self, explore: bool) {
        tracing::debug!(explore, "generic exploration toggled");
        self.explore.store(explore, Ordering::Release);
    }
}
