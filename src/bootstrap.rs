//! Bootstrap (bagging) exploration over a bank of default policies.
//!
//! One bag index `b ∈ [0, B)` is drawn uniformly. Every bag is queried, and the
//! probability reported for bag `b`'s action is the fraction of bags that
//! agree with it: `count(action) / B`. That is the true marginal probability of
//! serving the *action*, not merely of drawing bag `b`.
//!
//! The explorer is used in two roles that share one bank:
//!
//! - as the engine's [`Policy`], producing [`BagVotes`] from a single snapshot
//!   of the bank
//! - as the engine's [`Explorer`], drawing the bag and counting agreeing votes
//!
//! ```rust
//! use std::sync::Arc;
//! use propensity::{BootstrapConfig, BootstrapExplorer, ConstantPolicy, Policy};
//!
//! let bags: Vec<Arc<dyn Policy<(), u32>>> = vec![
//!     Arc::new(ConstantPolicy::new(1u32)) as Arc<dyn Policy<(), u32>>,
//!     Arc::new(ConstantPolicy::new(1u32)),
//! ];
//! let b = Arc::new(BootstrapExplorer::new(bags, BootstrapConfig::default()).unwrap());
//! assert_eq!(b.bag_count(), 2);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::explorer::{ensure_action, ensure_num_actions, ensure_ranking};
use crate::{
    Action, ExploreError, Explorer, ExplorerDecision, ExplorerState, Policy, PolicyDecision, Prg,
    Ranking, Result, TopAction,
};

/// Configuration for [`BootstrapExplorer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BootstrapConfig {
    /// Fixed upper bound on valid action ids.
    ///
    /// The effective bound for a call is `min(num_actions_fixed, num_actions)`;
    /// `None` uses the per-call count alone.
    pub num_actions_fixed: Option<usize>,
}

/// Every bag's decision for one context, taken from one bank snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BagVotes<V> {
    pub decisions: Vec<PolicyDecision<V>>,
}

/// Bag values the bootstrap can serve: a single action or a ranking.
pub trait BagValue: TopAction + Clone + Send + Sync {
    /// Validate the whole value (not just its top action) against the bound.
    fn validate(&self, bound: usize) -> Result<()>;
}

impl BagValue for Action {
    fn validate(&self, bound: usize) -> Result<()> {
        ensure_action(*self, bound).map(|_| ())
    }
}

impl BagValue for Ranking {
    fn validate(&self, bound: usize) -> Result<()> {
        ensure_ranking(self, bound)
    }
}

type Bank<C, V> = Vec<Arc<dyn Policy<C, V>>>;

/// Serves one bag of a policy bank per decision.
///
/// The bank is both the policy and the explorer: the engine asks it for every
/// bag's decision, then it draws one bag uniformly and reports the share of
/// bags whose top action agrees. The bank can be swapped at runtime with
/// [`update_policies`](Self::update_policies).
pub struct BootstrapExplorer<C, V> {
    bags: ArcSwap<Bank<C, V>>,
    cfg: BootstrapConfig,
    explore: AtomicBool,
}

impl<C, V> fmt::Debug for BootstrapExplorer<C, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapExplorer")
            .field("bags", &self.bags.load().len())
            .field("cfg", &self.cfg)
            .field("explore", &self.explore.load(Ordering::Relaxed))
            .finish()
    }
}

impl<C, V> BootstrapExplorer<C, V>
where
    V: BagValue,
{
    /// Create from a non-empty bank of bag policies.
    pub fn new(bags: Bank<C, V>, cfg: BootstrapConfig) -> Result<Self> {
        if let Some(n) = cfg.num_actions_fixed {
            crate::validate_num_actions(n)?;
        }
        ensure_bank(&bags)?;
        Ok(Self {
            bags: ArcSwap::from_pointee(bags),
            cfg,
            explore: AtomicBool::new(true),
        })
    }

    /// Atomically replace the whole bank. In-flight calls keep their snapshot.
    pub fn update_policies(&self, bags: Bank<C, V>) -> Result<()> {
        ensure_bank(&bags)?;
        tracing::debug!(bags = bags.len(), "bootstrap bag bank replaced");
        self.bags.store(Arc::new(bags));
        Ok(())
    }

    #[must_use]
    pub fn bag_count(&self) -> usize {
        self.bags.load().len()
    }

    #[must_use]
    pub fn config(&self) -> BootstrapConfig {
        self.cfg
    }

    fn bound(&self, num_actions: usize) -> usize {
        match self.cfg.num_actions_fixed {
            Some(fixed) => fixed.min(num_actions),
            None => num_actions,
        }
    }
}

fn ensure_bank<B>(bags: &[B]) -> Result<()> {
    if bags.is_empty() {
        return Err(ExploreError::Configuration(
            "bootstrap needs at least one bag".to_string(),
        ));
    }
    Ok(())
}

impl<C, V> Policy<C, BagVotes<V>> for BootstrapExplorer<C, V>
where
    V: BagValue,
{
    fn map_context(&self, context: &C) -> PolicyDecision<BagVotes<V>> {
        let bank = self.bags.load();
        let decisions = if self.explore.load(Ordering::Acquire) {
            bank.iter().map(|p| p.map_context(context)).collect()
        } else {
            bank.iter().take(1).map(|p| p.map_context(context)).collect()
        };
        PolicyDecision::new(BagVotes { decisions })
    }
}

impl<C, V> Explorer for BootstrapExplorer<C, V>
where
    V: BagValue,
{
    type Input = BagVotes<V>;
    type Output = V;

    fn explore(
        &self,
        prg: &mut Prg,
        votes: &BagVotes<V>,
        num_actions: usize,
    ) -> Result<ExplorerDecision<V>> {
        ensure_num_actions(num_actions)?;
        let bound = self.bound(num_actions);
        let decisions = &votes.decisions;
        let first = decisions.first().ok_or(ExploreError::EmptyDecision)?;

        if !self.explore.load(Ordering::Acquire) || decisions.len() == 1 {
            first.value.validate(bound)?;
            return Ok(ExplorerDecision::certain(first.value.clone()));
        }

        let bags = decisions.len();
        let chosen_bag = prg.uniform_int(0, (bags - 1) as u32) as usize;

        // Votes are counted over the bags, never over the action space.
        let mut votes = Vec::with_capacity(bags);
        for d in decisions {
            d.value.validate(bound)?;
            votes.push(d.value.top_action().ok_or(ExploreError::EmptyDecision)?);
        }

        let served = &decisions[chosen_bag].value;
        let top = votes[chosen_bag];
        let agreeing = votes.iter().filter(|&&a| a == top).count();
        Ok(ExplorerDecision::new(
            served.clone(),
            ExplorerState::Bootstrap {
                probability: agreeing as f32 / bags as f32,
                bag: chosen_bag,
                agreeing,
                bags,
            },
            true,
        ))
    }

    fn enable_explore(&self, explore: bool) {
        tracing::debug!(explore, "bootstrap exploration toggled");
        self.explore.store(explore, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{policy_fn, ConstantPolicy};

    fn constant_bags(actions: &[u32]) -> Bank<(), Action> {
        actions
            .iter()
            .map(|&a| Arc::new(ConstantPolicy::new(a)) as Arc<dyn Policy<(), Action>>)
            .collect()
    }

    fn run(b: &BootstrapExplorer<(), Action>, seed: u64, n: usize) -> Result<ExplorerDecision<Action>> {
        let votes = b.map_context(&()).value;
        b.explore(&mut Prg::from_u64(seed), &votes, n)
    }

    #[test]
    fn empty_bank_is_a_configuration_error() {
        let r = BootstrapExplorer::<(), Action>::new(Vec::new(), BootstrapConfig::default());
        assert!(matches!(r, Err(ExploreError::Configuration(_))));
        let b = BootstrapExplorer::new(constant_bags(&[1]), BootstrapConfig::default()).unwrap();
        assert!(matches!(
            b.update_policies(Vec::new()),
            Err(ExploreError::Configuration(_))
        ));
        assert_eq!(b.bag_count(), 1);
    }

    #[test]
    fn agreeing_bags_give_probability_one() {
        let b = BootstrapExplorer::new(constant_bags(&[4, 4]), BootstrapConfig::default()).unwrap();
        for seed in 0..50u64 {
            let d = run(&b, seed, 10).unwrap();
            assert_eq!(d.value, 4);
            assert_eq!(d.probability(), 1.0);
        }
    }

    #[test]
    fn disagreeing_bags_give_one_over_b() {
        let b = BootstrapExplorer::new(constant_bags(&[1, 3]), BootstrapConfig::default()).unwrap();
        let mut seen = [false; 2];
        for seed in 0..200u64 {
            let d = run(&b, seed, 10).unwrap();
            assert_eq!(d.probability(), 0.5);
            match d.state {
                ExplorerState::Bootstrap { bag, agreeing, bags, .. } => {
                    assert_eq!(agreeing, 1);
                    assert_eq!(bags, 2);
                    assert_eq!(d.value, if bag == 0 { 1 } else { 3 });
                    seen[bag] = true;
                }
                other => panic!("unexpected state {other:?}"),
            }
        }
        assert!(seen[0] && seen[1], "both bags should be drawn");
    }

    #[test]
    fn histogram_counts_by_action_value() {
        let b = BootstrapExplorer::new(constant_bags(&[2, 2, 5, 2]), BootstrapConfig::default())
            .unwrap();
        for seed in 0..100u64 {
            let d = run(&b, seed, 5).unwrap();
            let expected = if d.value == 2 { 0.75 } else { 0.25 };
            assert_eq!(d.probability(), expected);
        }
    }

    #[test]
    fn out_of_range_bag_is_rejected() {
        let b = BootstrapExplorer::new(constant_bags(&[1, 11]), BootstrapConfig::default()).unwrap();
        assert!(matches!(
            run(&b, 0, 10),
            Err(ExploreError::OutOfRangeAction { action: 11, .. })
        ));
        let zero = BootstrapExplorer::new(constant_bags(&[0, 1]), BootstrapConfig::default()).unwrap();
        assert!(matches!(
            run(&zero, 0, 10),
            Err(ExploreError::OutOfRangeAction { action: 0, .. })
        ));
    }

    #[test]
    fn fixed_bound_caps_the_per_call_count() {
        let cfg = BootstrapConfig {
            num_actions_fixed: Some(3),
        };
        let b = BootstrapExplorer::new(constant_bags(&[1, 4]), cfg).unwrap();
        assert!(matches!(
            run(&b, 0, 10),
            Err(ExploreError::OutOfRangeAction {
                action: 4,
                num_actions: 3
            })
        ));
    }

    #[test]
    fn disabled_serves_first_bag() {
        let b = BootstrapExplorer::new(constant_bags(&[6, 2, 3]), BootstrapConfig::default())
            .unwrap();
        b.enable_explore(false);
        assert_eq!(b.map_context(&()).value.decisions.len(), 1);
        for seed in 0..1000u64 {
            let d = run(&b, seed, 10).unwrap();
            assert_eq!(d.value, 6);
            assert_eq!(d.probability(), 1.0);
            assert!(d.should_record);
        }
    }

    #[test]
    fn update_swaps_the_whole_bank() {
        let b = BootstrapExplorer::new(constant_bags(&[1, 1]), BootstrapConfig::default()).unwrap();
        let before = b.map_context(&());
        b.update_policies(constant_bags(&[2, 2, 2])).unwrap();
        let after = b.map_context(&());
        assert!(before.value.decisions.iter().all(|d| d.value == 1));
        assert_eq!(after.value.decisions.len(), 3);
        assert!(after.value.decisions.iter().all(|d| d.value == 2));
    }

    #[test]
    fn ranking_bags_vote_with_their_top_action() {
        let bags: Bank<(), Ranking> = vec![
            Arc::new(ConstantPolicy::new(vec![2u32, 1, 3])) as Arc<dyn Policy<(), Ranking>>,
            Arc::new(ConstantPolicy::new(vec![2u32, 3, 1])),
            Arc::new(ConstantPolicy::new(vec![1u32, 2, 3])),
        ];
        let b = BootstrapExplorer::new(bags, BootstrapConfig::default()).unwrap();
        for seed in 0..100u64 {
            let votes = b.map_context(&()).value;
            let d = b.explore(&mut Prg::from_u64(seed), &votes, 3).unwrap();
            let expected = if d.value[0] == 2 { 2.0 / 3.0 } else { 1.0 / 3.0 };
            assert!((d.probability() - expected).abs() < 1e-6);
            assert_eq!(d.value.len(), 3);
        }
    }

    #[test]
    fn duplicate_ranking_in_a_bag_is_rejected() {
        let bags: Bank<(), Ranking> = vec![
            Arc::new(ConstantPolicy::new(vec![1u32, 2])) as Arc<dyn Policy<(), Ranking>>,
            Arc::new(ConstantPolicy::new(vec![2u32, 2])),
        ];
        let b = BootstrapExplorer::new(bags, BootstrapConfig::default()).unwrap();
        let votes = b.map_context(&()).value;
        assert!(matches!(
            b.explore(&mut Prg::from_u64(0), &votes, 3),
            Err(ExploreError::DuplicateAction { action: 2 })
        ));
    }

    #[test]
    fn bags_see_the_context() {
        let bags: Bank<u32, Action> = vec![
            Arc::new(policy_fn(|c: &u32| *c)) as Arc<dyn Policy<u32, Action>>,
            Arc::new(policy_fn(|c: &u32| *c + 1)),
        ];
        let b = BootstrapExplorer::new(bags, BootstrapConfig::default()).unwrap();
        let votes = b.map_context(&3);
        let values: Vec<u32> = votes.value.decisions.iter().map(|d| d.value).collect();
        assert_eq!(values, vec![3, 4]);
    }

    #[test]
    fn largest_action_space_does_not_allocate_per_action() {
        let n = u32::MAX as usize;
        let b = BootstrapExplorer::new(constant_bags(&[1, 2]), BootstrapConfig::default()).unwrap();
        for seed in 0..20u64 {
            let d = run(&b, seed, n).unwrap();
            assert!(d.value == 1 || d.value == 2);
            assert_eq!(d.probability(), 0.5);
        }

        let bags: Bank<(), Ranking> = vec![
            Arc::new(ConstantPolicy::new(vec![u32::MAX, 1])) as Arc<dyn Policy<(), Ranking>>,
            Arc::new(ConstantPolicy::new(vec![u32::MAX, 7])),
        ];
        let ranked = BootstrapExplorer::new(bags, BootstrapConfig::default()).unwrap();
        let votes = ranked.map_context(&()).value;
        let d = ranked.explore(&mut Prg::from_u64(3), &votes, n).unwrap();
        assert_eq!(d.value[0], u32::MAX);
        assert_eq!(d.probability(), 1.0);
    }
}
