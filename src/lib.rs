//! `propensity`: deterministic contextual-bandit exploration with exact,
//! replayable selection probabilities.
//!
//! Designed for the "log now, evaluate later" loop: a policy recommends an
//! action for a context, an exploration strategy randomizes around it, and
//! every served decision is logged with the exact probability it had of being
//! chosen. Those `(context, action, probability)` tuples are what off-policy
//! evaluation needs; a probability that is merely "close" biases every estimate
//! built on it.
//!
//! **Goals:**
//! - **Replayable**: the randomness of a decision is a pure function of
//!   `(app id, unique key)`. Same key, same context, same action count: same
//!   action and same probability, on any machine, in any process.
//! - **Exact propensities**: each strategy reports the total mass its sampling
//!   procedure placed on the returned action.
//! - **Hot-swappable**: policy, explorer and recorder can be replaced while
//!   callers keep deciding; a call sees the old set or the new set, never a mix.
//!
//! **Strategies** ([`Explorer`] implementations):
//! - [`EpsilonGreedyExplorer`]: exploit with `1 - ε`, otherwise uniform.
//! - [`TauFirstExplorer`]: uniform for the first `τ` decisions, then the policy,
//!   unrecorded.
//! - [`BootstrapExplorer`]: a bank of bag policies; the probability is the
//!   fraction of bags that agree with the served action.
//! - [`SoftmaxExplorer`]: Boltzmann sampling over a score vector.
//! - [`GenericExplorer`]: floored mixing over non-negative weights (cover).
//! - [`TopSlotExplorer`]: runs a single-action strategy on a ranking's top slot.
//! - [`UniformExplorer`]: policy-free uniform choice, for cold start.
//!
//! **Plumbing:**
//! - [`Seed`] / [`id_hash`]: the frozen key hash. Changing it invalidates
//!   every logged probability, so it is versioned ([`KEY_HASH_VERSION`]).
//! - [`Prg`]: the frozen per-decision generator.
//! - [`Engine`] / [`EngineBuilder`]: resolve the action count, seed, ask the
//!   policy, explore, record once.
//! - [`Recorder`]: where decisions go. [`StringRecorder`] and
//!   [`MemoryRecorder`] are provided.
//!
//! Indices are 1-based at every public boundary: action `0` is never valid and
//! action `K` is the last of `K`.
//!
//! **Non-goals:**
//! - Training or updating policies.
//! - Storage, transport or batching of the exploration log.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use propensity::{policy_fn, Engine, EpsilonGreedyExplorer, MemoryRecorder};
//!
//! let log = Arc::new(MemoryRecorder::<u32, u32>::new());
//! let engine = Engine::builder("my-app", 10)
//!     .recorder(Arc::clone(&log))
//!     .explorer(EpsilonGreedyExplorer::with_epsilon(0.2).unwrap())
//!     .policy(policy_fn(|user: &u32| if *user % 2 == 0 { 3u32 } else { 7u32 }))
//!     .build()
//!     .unwrap();
//!
//! let first = engine.decide("request-1", &42).unwrap();
//! let again = engine.decide("request-1", &42).unwrap();
//! assert_eq!(first, again);
//!
//! let logged = log.interactions();
//! assert_eq!(logged.len(), 2);
//! assert_eq!(logged[0].probability(), first.probability());
//! ```

#![forbid(unsafe_code)]

mod error;
pub use error::*;

mod stable_hash;
pub use stable_hash::*;

mod prg;
pub use prg::*;

mod decision;
pub use decision::*;

mod policy;
pub use policy::*;

mod explorer;
pub use explorer::*;

mod epsilon_greedy;
pub use epsilon_greedy::*;

mod tau_first;
pub use tau_first::*;

mod softmax;
pub use softmax::*;

mod generic;
pub use generic::*;

mod bootstrap;
pub use bootstrap::*;

mod top_slot;
pub use top_slot::*;

mod uniform;
pub use uniform::*;

mod recorder;
pub use recorder::*;

mod engine;
pub use engine::*;
