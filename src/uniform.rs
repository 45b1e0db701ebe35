//! Policy-free uniform exploration, used before any policy is deployed.

use crate::explorer::ensure_num_actions;
use crate::{Action, ExplorerDecision, ExplorerState, FullExplorer, Prg, Ranking, Result};

/// Chooses every action with probability `1/K`.
///
/// For rankings, draws a uniform permutation (Fisher–Yates) and reports the
/// probability of its first slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformExplorer;

impl FullExplorer<Action> for UniformExplorer {
    fn explore_full(&self, prg: &mut Prg, num_actions: usize) -> Result<ExplorerDecision<Action>> {
        let n = ensure_num_actions(num_actions)?;
        let action = prg.uniform_int(1, n);
        Ok(ExplorerDecision::new(
            action,
            ExplorerState::Generic {
                probability: 1.0 / n as f32,
            },
            true,
        ))
    }
}

impl FullExplorer<Ranking> for UniformExplorer {
    fn explore_full(&self, prg: &mut Prg, num_actions: usize) -> Result<ExplorerDecision<Ranking>> {
        let n = ensure_num_actions(num_actions)?;
        let mut ranking: Ranking = (1..=n).collect();
        for i in (1..ranking.len()).rev() {
            let j = prg.uniform_int(0, i as u32) as usize;
            ranking.swap(i, j);
        }
        Ok(ExplorerDecision::new(
            ranking,
            ExplorerState::Generic {
                probability: 1.0 / n as f32,
            },
            true,
        ))
    }
}
