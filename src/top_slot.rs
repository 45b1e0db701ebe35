//! Ranking exploration by exploring only the top slot.
//!
//! The wrapped single-action explorer runs with the ranking's first entry as
//! the recommended action. The chosen action is then moved to the front of the
//! ranking; the rest of the ranking keeps the policy's order. Probability and
//! recording come from the inner explorer unchanged.

use crate::explorer::ensure_ranking;
use crate::{Action, Explorer, ExplorerDecision, Prg, Ranking, Result};

/// Adapts a single-action explorer to rankings.
#[derive(Debug)]
pub struct TopSlotExplorer<E> {
    inner: E,
}

impl<E> TopSlotExplorer<E>
where
    E: Explorer<Input = Action, Output = Action>,
{
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

/// Put `action` in slot 0 without duplicating it.
///
/// If the ranking already holds it, the two slots swap. Otherwise it is
/// inserted at the front and the last entry is dropped so the length holds.
pub fn put_action_first(ranking: &mut Ranking, action: Action) {
    match ranking.iter().position(|&a| a == action) {
        Some(i) => ranking.swap(0, i),
        None => {
            ranking.insert(0, action);
            ranking.pop();
        }
    }
}

impl<E> Explorer for TopSlotExplorer<E>
where
    E: Explorer<Input = Action, Output = Action>,
{
    type Input = Ranking;
    type Output = Ranking;

    fn explore(
        &self,
        prg: &mut Prg,
        ranking: &Ranking,
        num_actions: usize,
    ) -> Result<ExplorerDecision<Ranking>> {
        crate::validate_num_actions(num_actions)?;
        ensure_ranking(ranking, num_actions)?;

        let decision = self.inner.explore(prg, &ranking[0], num_actions)?;
        let mut out = ranking.clone();
        put_action_first(&mut out, decision.value);
        Ok(decision.map(|_| out))
    }

    fn enable_explore(&self, explore: bool) {
        self.inner.enable_explore(explore);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EpsilonGreedyExplorer, ExploreError, TauFirstExplorer};
    use proptest::prelude::*;

    #[test]
    fn swap_keeps_ranking_a_permutation() {
        let mut r = vec![3, 1, 2];
        put_action_first(&mut r, 2);
        assert_eq!(r, vec![2, 1, 3]);
    }

    #[test]
    fn missing_action_is_inserted_and_tail_dropped() {
        let mut r = vec![3, 1];
        put_action_first(&mut r, 5);
        assert_eq!(r, vec![5, 3]);
    }

    #[test]
    fn zero_epsilon_returns_policy_ranking() {
        let e = TopSlotExplorer::new(EpsilonGreedyExplorer::with_epsilon(0.0).unwrap());
        let ranking: Ranking = (1..=10).rev().collect();
        for seed in 0..100u64 {
            let d = e.explore(&mut Prg::from_u64(seed), &ranking, 10).unwrap();
            assert_eq!(d.value, ranking);
            assert_eq!(d.probability(), 1.0);
        }
    }

    #[test]
    fn tau_first_ranking_is_unrecorded_after_window() {
        let e = TopSlotExplorer::new(TauFirstExplorer::with_tau(0));
        let ranking = vec![2, 1, 3];
        let d = e.explore(&mut Prg::from_u64(1), &ranking, 3).unwrap();
        assert_eq!(d.value, ranking);
        assert!(!d.should_record);
    }

    #[test]
    fn disabled_passes_through() {
        let e = TopSlotExplorer::new(EpsilonGreedyExplorer::with_epsilon(1.0).unwrap());
        e.enable_explore(false);
        let ranking = vec![4, 2, 1, 3];
        for seed in 0..1000u64 {
            let d = e.explore(&mut Prg::from_u64(seed), &ranking, 4).unwrap();
            assert_eq!(d.value, ranking);
            assert_eq!(d.probability(), 1.0);
        }
    }

    #[test]
    fn invalid_rankings_are_rejected() {
        let e = TopSlotExplorer::new(EpsilonGreedyExplorer::with_epsilon(0.5).unwrap());
        assert_eq!(
            e.explore(&mut Prg::from_u64(0), &vec![], 3),
            Err(ExploreError::EmptyDecision)
        );
        assert_eq!(
            e.explore(&mut Prg::from_u64(0), &vec![1, 1], 3),
            Err(ExploreError::DuplicateAction { action: 1 })
        );
        assert!(matches!(
            e.explore(&mut Prg::from_u64(0), &vec![1, 4], 3),
            Err(ExploreError::OutOfRangeAction { action: 4, .. })
        ));
    }

    proptest! {
        #[test]
        fn explored_ranking_has_no_duplicates(seed in any::<u64>(), n in 1usize..20, len in 1usize..20) {
            let len = len.min(n);
            let ranking: Ranking = (1..=len as u32).rev().collect();
            let e = TopSlotExplorer::new(EpsilonGreedyExplorer::with_epsilon(0.7).unwrap());
            let d = e.explore(&mut Prg::from_u64(seed), &ranking, n).unwrap();
            prop_assert_eq!(d.value.len(), ranking.len());
            let mut sorted = d.value.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), d.value.len());
            prop_assert!(d.value.iter().all(|&a| a >= 1 && a as usize <= n));
        }
    }
}
