//! Softmax (Boltzmann) exploration over a score vector.
//!
//! `p_i ∝ exp(λ · score_i)`, normalized, then sampled with one uniform draw by
//! cumulative-sum inversion. Scaling and normalization run in `f64` with the
//! max subtracted before exponentiating, so scores near `f32::MAX` or a large
//! `λ` cannot overflow.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::explorer::{argmax_action, ensure_num_actions, ensure_scores, sample_categorical};
use crate::{Action, ExploreError, Explorer, ExplorerDecision, ExplorerState, Prg, Result};

/// Configuration for [`SoftmaxExplorer`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SoftmaxConfig {
    /// Inverse temperature. `0` is uniform; larger values concentrate on the max.
    pub lambda: f32,
}

impl Default for SoftmaxConfig {
    fn default() -> Self {
        Self { lambda: 1.0 }
    }
}

impl SoftmaxConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.lambda.is_finite() {
            return Err(ExploreError::InvalidParameter {
                name: "lambda",
                value: f64::from(self.lambda),
            });
        }
        Ok(())
    }
}

/// Stable softmax of `lambda * scores`.
///
/// - Uses the max-trick for numerical stability.
/// - Returns an empty vector for empty input.
/// - Falls back to uniform if the normalizer degenerates.
#[must_use]
pub fn softmax(scores: &[f32], lambda: f32) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    // f64 throughout: `λ · s` for finite f32 inputs cannot overflow here.
    let lambda = f64::from(lambda);
    let scaled: Vec<f64> = scores.iter().map(|&s| lambda * f64::from(s)).collect();
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let exps: Vec<f64> = scaled.iter().map(|&x| (x - max).exp()).collect();
    let denom: f64 = exps.iter().sum();
    if denom <= 0.0 || !denom.is_finite() {
        let n = scores.len() as f32;
        return vec![1.0 / n; scores.len()];
    }
    exps.iter().map(|&e| (e / denom) as f32).collect()
}

/// Samples from [`softmax`] of the policy's scores at a fixed `λ`.
///
/// With exploration disabled it serves the highest score with probability 1.
#[derive(Debug)]
pub struct SoftmaxExplorer {
    cfg: SoftmaxConfig,
    explore: AtomicBool,
}

impl SoftmaxExplorer {
    pub fn new(cfg: SoftmaxConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            explore: AtomicBool::new(true),
        })
    }

    pub fn with_lambda(lambda: f32) -> Result<Self> {
        Self::new(SoftmaxConfig { lambda })
    }
}

impl Explorer for SoftmaxExplorer {
    type Input = Vec<f32>;
    type Output = Action;

    fn explore(
        &self,
        prg: &mut Prg,
        scores: &Vec<f32>,
        num_actions: usize,
    ) -> Result<ExplorerDecision<Action>> {
        ensure_num_actions(num_actions)?;
        ensure_scores(scores, num_actions)?;
        if let Some((index, &score)) = scores.iter().enumerate().find(|(_, s)| !s.is_finite()) {
            return Err(ExploreError::InvalidScore { index, score });
        }

        if !self.explore.load(Ordering::Acquire) {
            return Ok(ExplorerDecision::certain(argmax_action(scores)));
        }

        let probs = softmax(scores, self.cfg.lambda);
        let draw = prg.uniform_unit_interval();
        let (action, probability) = sample_categorical(&probs, draw);
        Ok(ExplorerDecision::new(
            action,
            ExplorerState::Generic { probability },
            true,
        ))
    }

    fn enable_explore(&self, explore: bool) {
        tracing::debug!(explore, "softmax exploration toggled");
        self.explore.store(explore, Ordering::Release);
    }
}
