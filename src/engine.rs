//! The decision engine: policy → explorer → recorder, per unique key.
//!
//! Each call resolves the action count, derives the seed from
//! `(app id, unique key)`, asks the policy, hands the policy value to the
//! explorer, records at most once, and returns the served value.
//!
//! Policy, explorer, recorder and initial explorer live together in one
//! components snapshot published through an [`ArcSwap`]. A swap replaces
//! the whole snapshot, so a call observes either the old set or the new set,
//! never a mix. In-flight calls finish on the snapshot they loaded.
//!
//! ```rust
//! use std::sync::Arc;
//! use propensity::{policy_fn, Engine, EpsilonGreedyExplorer, StringRecorder};
//!
//! let recorder = Arc::new(StringRecorder::new());
//! let engine = Engine::builder("mwt", 10)
//!     .recorder(Arc::clone(&recorder))
//!     .explorer(EpsilonGreedyExplorer::with_epsilon(0.2).unwrap())
//!     .policy(policy_fn(|_: &String| 5u32))
//!     .build()
//!     .unwrap();
//!
//! let action = engine.choose_action("eventid", &"ctx".to_string()).unwrap();
//! assert!((1..=10).contains(&action));
//! assert_eq!(recorder.recording(false).unwrap().lines().count(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::recorder::Interaction;
use crate::{
    id_hash, ActionCount, Choice, DynExplorer, ExploreError, Explorer, ExplorerDecision,
    FullExplorer, NumActionsProvider, Policy, PolicyState, Prg, Recorder, Result, Seed,
};

/// One published set of pluggable components.
struct Components<C, I, O> {
    policy: Option<Arc<dyn Policy<C, I>>>,
    explorer: DynExplorer<I, O>,
    recorder: Arc<dyn Recorder<C, O>>,
    initial: Option<Arc<dyn FullExplorer<O>>>,
}

impl<C, I, O> Clone for Components<C, I, O> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            explorer: Arc::clone(&self.explorer),
            recorder: Arc::clone(&self.recorder),
            initial: self.initial.clone(),
        }
    }
}

impl<C, I, O> fmt::Debug for Components<C, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Components")
            .field("policy", &self.policy.is_some())
            .field("initial_explorer", &self.initial.is_some())
            .finish_non_exhaustive()
    }
}

/// Where the policy value comes from when no live policy is set.
enum Fallback<'a, C, I> {
    Initial,
    Value(I),
    Policy(&'a dyn Policy<C, I>),
}

/// Builder for [`Engine`].
pub struct EngineBuilder<C, I, O> {
    app_id: String,
    actions: ActionCount<C>,
    policy: Option<Arc<dyn Policy<C, I>>>,
    explorer: Option<DynExplorer<I, O>>,
    recorder: Option<Arc<dyn Recorder<C, O>>>,
    initial: Option<Arc<dyn FullExplorer<O>>>,
}

impl<C, I, O> fmt::Debug for EngineBuilder<C, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("app_id", &self.app_id)
            .field("actions", &self.actions)
            .field("policy", &self.policy.is_some())
            .field("explorer", &self.explorer.is_some())
            .field("recorder", &self.recorder.is_some())
            .field("initial_explorer", &self.initial.is_some())
            .finish()
    }
}

impl<C, I, O> EngineBuilder<C, I, O> {
    pub fn new(app_id: impl Into<String>, actions: ActionCount<C>) -> Self {
        Self {
            app_id: app_id.into(),
            actions,
            policy: None,
            explorer: None,
            recorder: None,
            initial: None,
        }
    }

    #[must_use]
    pub fn policy<P>(mut self, policy: P) -> Self
    where
        P: Policy<C, I> + 'static,
    {
        self.policy = Some(Arc::new(policy));
        self
    }

    #[must_use]
    pub fn explorer<E>(mut self, explorer: E) -> Self
    where
        E: Explorer<Input = I, Output = O> + 'static,
    {
        self.explorer = Some(Arc::new(explorer));
        self
    }

    #[must_use]
    pub fn recorder<R>(mut self, recorder: R) -> Self
    where
        R: Recorder<C, O> + 'static,
    {
        self.recorder = Some(Arc::new(recorder));
        self
    }

    /// Explorer used by [`Engine::choose_action`] while no policy is set.
    #[must_use]
    pub fn initial_explorer<X>(mut self, initial: X) -> Self
    where
        X: FullExplorer<O> + 'static,
    {
        self.initial = Some(Arc::new(initial));
        self
    }

    pub fn build(self) -> Result<Engine<C, I, O>> {
        if let ActionCount::Fixed(n) = self.actions {
            crate::validate_num_actions(n)?;
        }
        let explorer = self
            .explorer
            .ok_or_else(|| ExploreError::Configuration("an explorer is required".to_string()))?;
        let recorder = self
            .recorder
            .ok_or_else(|| ExploreError::Configuration("a recorder is required".to_string()))?;

        let app_hash = id_hash(&self.app_id);
        tracing::debug!(
            app_id = %self.app_id,
            app_hash,
            actions = ?self.actions,
            policy = self.policy.is_some(),
            "engine built"
        );
        Ok(Engine {
            app_id: self.app_id,
            app_hash,
            actions: self.actions,
            components: ArcSwap::from_pointee(Components {
                policy: self.policy,
                explorer,
                recorder,
                initial: self.initial,
            }),
        })
    }
}

/// Chooses actions for contexts `C` with policy values `I`, serving `O`.
pub struct Engine<C, I, O> {
    app_id: String,
    app_hash: u64,
    actions: ActionCount<C>,
    components: ArcSwap<Components<C, I, O>>,
}

impl<C, I, O> fmt::Debug for Engine<C, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("app_id", &self.app_id)
            .field("actions", &self.actions)
            .field("components", &*self.components.load())
            .finish()
    }
}

impl<C, I, O> Engine<C, I, O> {
    /// Builder for a fixed action count.
    pub fn builder(app_id: impl Into<String>, num_actions: usize) -> EngineBuilder<C, I, O> {
        EngineBuilder::new(app_id, ActionCount::Fixed(num_actions))
    }

    /// Builder that resolves the action count per context.
    pub fn builder_with_provider<P>(app_id: impl Into<String>, provider: P) -> EngineBuilder<C, I, O>
    where
        P: NumActionsProvider<C> + 'static,
    {
        EngineBuilder::new(app_id, ActionCount::provider(provider))
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Seed a decision for `unique_key` would use.
    #[must_use]
    pub fn seed_for(&self, unique_key: &str) -> Seed {
        Seed::derive(self.app_hash, unique_key)
    }

    #[must_use]
    pub fn has_policy(&self) -> bool {
        self.components.load().policy.is_some()
    }

    /// Publish a new live policy.
    pub fn set_policy<P>(&self, policy: P)
    where
        P: Policy<C, I> + 'static,
    {
        let policy: Arc<dyn Policy<C, I>> = Arc::new(policy);
        self.components.rcu(|cur| {
            let mut next = (**cur).clone();
            next.policy = Some(Arc::clone(&policy));
            next
        });
        tracing::debug!(app_id = %self.app_id, "policy replaced");
    }

    /// Remove the live policy; later calls fall back to defaults or the
    /// initial explorer.
    pub fn clear_policy(&self) {
        self.components.rcu(|cur| {
            let mut next = (**cur).clone();
            next.policy = None;
            next
        });
        tracing::debug!(app_id = %self.app_id, "policy cleared");
    }

    /// Replace the explorer. Decisions already in flight finish with the old one.
    pub fn set_explorer<E>(&self, explorer: E)
    where
        E: Explorer<Input = I, Output = O> + 'static,
    {
        let explorer: DynExplorer<I, O> = Arc::new(explorer);
        self.components.rcu(|cur| {
            let mut next = (**cur).clone();
            next.explorer = Arc::clone(&explorer);
            next
        });
        tracing::debug!(app_id = %self.app_id, "explorer replaced");
    }

    /// Replace the recorder. Later recordable decisions go to `recorder`.
    pub fn set_recorder<R>(&self, recorder: R)
    where
        R: Recorder<C, O> + 'static,
    {
        let recorder: Arc<dyn Recorder<C, O>> = Arc::new(recorder);
        self.components.rcu(|cur| {
            let mut next = (**cur).clone();
            next.recorder = Arc::clone(&recorder);
            next
        });
        tracing::debug!(app_id = %self.app_id, "recorder replaced");
    }

    /// Toggle exploration on the current explorer.
    pub fn enable_explore(&self, explore: bool) {
        self.components.load().explorer.enable_explore(explore);
    }

    /// Choose with the live policy, or the initial explorer if none is set.
    pub fn choose_action(&self, unique_key: &str, context: &C) -> Result<O> {
        self.decide(unique_key, context).map(|c| c.value)
    }

    /// Choose with the live policy, or `default` if none is set.
    pub fn choose_action_with_default(
        &self,
        unique_key: &str,
        context: &C,
        default: I,
    ) -> Result<O> {
        self.decide_with_default(unique_key, context, default)
            .map(|c| c.value)
    }

    /// Choose with the live policy, or `default` if none is set.
    pub fn choose_action_with_policy<P>(
        &self,
        unique_key: &str,
        context: &C,
        default: &P,
    ) -> Result<O>
    where
        P: Policy<C, I>,
    {
        self.decide_with_policy(unique_key, context, default)
            .map(|c| c.value)
    }

    /// Like [`choose_action`](Self::choose_action), but returns the full
    /// [`Choice`] with its logged probability and seed.
    pub fn decide(&self, unique_key: &str, context: &C) -> Result<Choice<O>> {
        self.run(unique_key, context, Fallback::Initial)
    }

    /// [`decide`](Self::decide) with `default` as the policy output when no
    /// policy is set.
    pub fn decide_with_default(
        &self,
        unique_key: &str,
        context: &C,
        default: I,
    ) -> Result<Choice<O>> {
        self.run(unique_key, context, Fallback::Value(default))
    }

    /// [`decide`](Self::decide) with `default` consulted when no policy is set.
    pub fn decide_with_policy<P>(
        &self,
        unique_key: &str,
        context: &C,
        default: &P,
    ) -> Result<Choice<O>>
    where
        P: Policy<C, I>,
    {
        self.run(unique_key, context, Fallback::Policy(default))
    }

    fn run(&self, unique_key: &str, context: &C, fallback: Fallback<'_, C, I>) -> Result<Choice<O>> {
        let num_actions = self.actions.resolve(context)?;
        let seed = self.seed_for(unique_key);
        let mut prg = Prg::new(seed);
        let snapshot = self.components.load_full();

        let (decision, policy_state): (ExplorerDecision<O>, Option<PolicyState>) =
            match (&snapshot.policy, fallback) {
                (Some(policy), _) => {
                    let pd = policy.map_context(context);
                    let d = snapshot.explorer.explore(&mut prg, &pd.value, num_actions)?;
                    (d, pd.state)
                }
                (None, Fallback::Value(value)) => {
                    let d = snapshot.explorer.explore(&mut prg, &value, num_actions)?;
                    (d, None)
                }
                (None, Fallback::Policy(policy)) => {
                    let pd = policy.map_context(context);
                    let d = snapshot.explorer.explore(&mut prg, &pd.value, num_actions)?;
                    (d, pd.state)
                }
                (None, Fallback::Initial) => {
                    let initial = snapshot.initial.as_ref().ok_or_else(|| {
                        ExploreError::Configuration(
                            "no policy is set and no initial explorer is configured".to_string(),
                        )
                    })?;
                    (initial.explore_full(&mut prg, num_actions)?, None)
                }
            };

        if decision.should_record {
            let interaction = Interaction {
                context,
                value: &decision.value,
                explorer_state: &decision.state,
                policy_state: policy_state.as_ref(),
                unique_key,
            };
            if let Err(err) = snapshot.recorder.record(&interaction) {
                tracing::warn!(unique_key, error = %err, "recorder failed; serving decision anyway");
            }
        }

        tracing::trace!(
            unique_key,
            num_actions,
            probability = decision.probability(),
            recorded = decision.should_record,
            "action chosen"
        );
        Ok(Choice {
            value: decision.value,
            state: decision.state,
            recorded: decision.should_record,
            seed,
        })
    }
}

impl<C, I, O> Drop for Engine<C, I, O> {
    fn drop(&mut self) {
        if let Err(err) = self.components.load().recorder.flush() {
            tracing::warn!(app_id = %self.app_id, error = %err, "recorder flush failed on teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        policy_fn, Action, ConstantPolicy, EpsilonGreedyExplorer, MemoryRecorder, PolicyDecision,
        RecordError, StringRecorder, TauFirstExplorer, UniformExplorer,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    type Mem = Arc<MemoryRecorder<u32, Action>>;

    fn engine(eps: f32, recorder: &Mem) -> Engine<u32, Action, Action> {
        Engine::builder("mwt", 10)
            .recorder(Arc::clone(recorder))
            .explorer(EpsilonGreedyExplorer::with_epsilon(eps).unwrap())
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct FailingRecorder {
        calls: AtomicUsize,
    }

    impl Recorder<u32, Action> for FailingRecorder {
        fn record(&self, _: &Interaction<'_, u32, Action>) -> std::result::Result<(), RecordError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RecordError::Rejected("disk full".to_string()))
        }
    }

    #[derive(Default)]
    struct FlushFlag {
        flushed: AtomicBool,
    }

    impl Recorder<u32, Action> for FlushFlag {
        fn record(&self, _: &Interaction<'_, u32, Action>) -> std::result::Result<(), RecordError> {
            Ok(())
        }

        fn flush(&self) -> std::result::Result<(), RecordError> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn builder_requires_explorer_and_recorder() {
        let no_explorer = Engine::<u32, Action, Action>::builder("a", 3)
            .recorder(StringRecorder::new())
            .build();
        assert!(matches!(no_explorer, Err(ExploreError::Configuration(_))));

        let no_recorder = Engine::<u32, Action, Action>::builder("a", 3)
            .explorer(TauFirstExplorer::with_tau(1))
            .build();
        assert!(matches!(no_recorder, Err(ExploreError::Configuration(_))));
    }

    #[test]
    fn builder_rejects_zero_fixed_actions() {
        let r = Engine::<u32, Action, Action>::builder("a", 0)
            .recorder(StringRecorder::new())
            .explorer(TauFirstExplorer::with_tau(1))
            .build();
        assert_eq!(
            r.unwrap_err(),
            ExploreError::InvalidActionSpace { num_actions: 0 }
        );
    }

    #[test]
    fn known_key_matches_frozen_sequence() {
        let rec = Mem::default();
        let e = engine(0.2, &rec);
        let c = e.decide_with_default("eventid", &1, 5).unwrap();
        assert_eq!(c.seed, Seed(5_495_108_660));
        // First draw 0.2983 < 0.8: exploit.
        assert_eq!(c.value, 5);
        assert!((c.probability() - 0.82).abs() < 1e-6);
        assert!(c.recorded);
    }

    #[test]
    fn records_exactly_once_with_served_values() {
        let rec = Mem::default();
        let e = engine(0.5, &rec);
        e.set_policy(ConstantPolicy::with_decision(PolicyDecision::with_state(
            3u32,
            PolicyState::Model { id: "m7".into() },
        )));
        for i in 0..50u32 {
            let key = format!("k{i}");
            let c = e.decide(&key, &i).unwrap();
            let got = rec.drain();
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].value, c.value);
            assert_eq!(got[0].probability(), c.probability());
            assert_eq!(got[0].unique_key, key);
            assert_eq!(got[0].context, i);
            assert_eq!(
                got[0].policy_state,
                Some(PolicyState::Model { id: "m7".into() })
            );
        }
    }

    #[test]
    fn live_policy_beats_defaults() {
        let rec = Mem::default();
        let e = engine(0.0, &rec);
        assert_eq!(e.choose_action_with_default("k", &0, 2).unwrap(), 2);
        e.set_policy(policy_fn(|_: &u32| 7u32));
        assert!(e.has_policy());
        assert_eq!(e.choose_action_with_default("k", &0, 2).unwrap(), 7);
        let fallback = policy_fn(|_: &u32| 4u32);
        assert_eq!(e.choose_action_with_policy("k", &0, &fallback).unwrap(), 7);
        e.clear_policy();
        assert_eq!(e.choose_action_with_policy("k", &0, &fallback).unwrap(), 4);
    }

    #[test]
    fn no_policy_uses_initial_explorer() {
        let rec = Mem::default();
        let e: Engine<u32, Action, Action> = Engine::builder("mwt", 4)
            .recorder(Arc::clone(&rec))
            .explorer(EpsilonGreedyExplorer::with_epsilon(0.1).unwrap())
            .initial_explorer(UniformExplorer)
            .build()
            .unwrap();
        let c = e.decide("k", &0).unwrap();
        assert_eq!(c.probability(), 0.25);
        assert_eq!(rec.len(), 1);
    }

    #[test]
    fn no_policy_and_no_initial_is_a_configuration_error() {
        let rec = Mem::default();
        let e = engine(0.1, &rec);
        assert!(matches!(
            e.choose_action("k", &0),
            Err(ExploreError::Configuration(_))
        ));
        assert!(rec.is_empty());
    }

    #[test]
    fn recorder_failure_still_serves() {
        let rec = Arc::new(FailingRecorder::default());
        let e: Engine<u32, Action, Action> = Engine::builder("mwt", 10)
            .recorder(Arc::clone(&rec))
            .explorer(EpsilonGreedyExplorer::with_epsilon(0.0).unwrap())
            .policy(policy_fn(|_: &u32| 6u32))
            .build()
            .unwrap();
        assert_eq!(e.choose_action("k", &0).unwrap(), 6);
        assert_eq!(rec.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tau_first_window_is_not_recorded_after_it_closes() {
        let rec = Mem::default();
        let e: Engine<u32, Action, Action> = Engine::builder("mwt", 10)
            .recorder(Arc::clone(&rec))
            .explorer(TauFirstExplorer::with_tau(2))
            .policy(policy_fn(|_: &u32| 1u32))
            .build()
            .unwrap();
        for i in 0..5 {
            e.choose_action(&format!("k{i}"), &0).unwrap();
        }
        assert_eq!(rec.len(), 2);
    }

    #[test]
    fn swapping_recorder_redirects_records() {
        let first = Mem::default();
        let second = Mem::default();
        let e = engine(0.1, &first);
        e.choose_action_with_default("a", &0, 1).unwrap();
        e.set_recorder(Arc::clone(&second));
        e.choose_action_with_default("b", &0, 1).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second.interactions()[0].unique_key, "b");
    }

    #[test]
    fn engine_level_toggle_reaches_explorer() {
        let rec = Mem::default();
        let e = engine(1.0, &rec);
        e.enable_explore(false);
        for i in 0..200 {
            let c = e.decide_with_default(&format!("k{i}"), &0, 9).unwrap();
            assert_eq!(c.value, 9);
            assert_eq!(c.probability(), 1.0);
        }
    }

    #[test]
    fn drop_flushes_current_recorder() {
        let old = Arc::new(FlushFlag::default());
        let new = Arc::new(FlushFlag::default());
        let e: Engine<u32, Action, Action> = Engine::builder("mwt", 2)
            .recorder(Arc::clone(&old))
            .explorer(TauFirstExplorer::with_tau(0))
            .build()
            .unwrap();
        e.set_recorder(Arc::clone(&new));
        drop(e);
        assert!(new.flushed.load(Ordering::SeqCst));
        assert!(!old.flushed.load(Ordering::SeqCst));
    }
}
