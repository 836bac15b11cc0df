//! `armax`: greedy contextual decision engine with delayed-reward learning.
//!
//! Designed for repeated “arm selection” under context: you have a small set
//! of candidate actions (“arms”, each with a fixed feature vector), a
//! per-decision situational feature vector (the “global context”), and a
//! quality signal that arrives **later** — seconds or thousands of decisions
//! after the choice it judges.  `armax` scores every arm against the context,
//! greedily picks the best, logs the decision, and folds each reward back
//! into the scoring model when it finally lands.
//!
//! The decision loop:
//!
//! 1. [`ContextualBandit::infer`] (or `infer_with_context`) scores every arm
//!    via the [`ScoringModel`] — by default [`BilinearModel`], `Gᵗ · M · A` —
//!    picks the argmax, appends the decision to the [`HistoryBuffer`], and
//!    returns `(arm_id, index)`.
//! 2. The caller does whatever the decision drives and eventually learns how
//!    it went.
//! 3. [`ContextualBandit::give_reward`] attributes the reward to the logged
//!    decision by index and retrains the model on the full labeled history
//!    (clamped-gradient SGD, applied sample by sample).
//!
//! [`DecisionServer`] wraps the same loop behind channels: a single worker
//! thread takes ownership of the bandit, serves [`InboundMessage`]s, and
//! publishes [`OutboundMessage`]s, so concurrent producers never share the
//! model — single-writer by ownership rather than by lock discipline.
//!
//! **Goals:**
//! - **Deterministic by default**: seeded initialization, frozen weights →
//!   the same context always picks the same arm; tie-breaks follow arm
//!   insertion order.
//! - **Loud failures**: dimension mismatches, unknown arms, and bad reward
//!   handles are errors, never silent coercions.
//! - **Swappable scoring**: [`ScoringModel`] is object-safe; the bilinear
//!   default and the [`MlpModel`] variant share the update contract.
//! - **Small K**: built for a handful to a few hundred arms scored
//!   exhaustively per decision; not an approximate-retrieval system.
//!
//! **Non-goals:**
//! - No exploration policy (no UCB, no Thompson sampling) — selection is
//!   pure greedy; exploration pressure comes from the domain.
//! - Decision history is not persisted across restarts (weights are, via
//!   [`ContextualBandit::save_weights`]).
//! - Single process, one worker per bandit; the channel protocol is the only
//!   service surface.
//!
//! # Example
//!
//! ```rust
//! use armax::{ArmSet, BilinearConfig, BilinearModel, ContextualBandit, RandomContextSource};
//!
//! let mut arms = ArmSet::new();
//! arms.insert("fast", vec![1.0, 0.0]);
//! arms.insert("slow", vec![0.0, 1.0]);
//!
//! let cfg = BilinearConfig { global_dim: 2, arm_dim: 2, ..BilinearConfig::default() };
//! let mut bandit = ContextualBandit::new(
//!     RandomContextSource::new(2, 7),
//!     arms,
//!     BilinearModel::new(cfg),
//! ).unwrap();
//!
//! let (arm, idx) = bandit.infer_with_context(&[1.0, 0.0]).unwrap();
//! assert!(bandit.arms().contains(&arm));
//!
//! // ... the decision plays out, then its reward arrives:
//! bandit.give_reward(idx, 1.0).unwrap();
//! assert_eq!(bandit.history().labeled_len(), 1);
//! ```

#![forbid(unsafe_code)]

mod error;
pub use error::Error;

mod arms;
pub use arms::*;

mod history;
pub use history::*;

mod model;
pub use model::*;

mod reward;
pub use reward::*;

mod inference;
pub use inference::*;

mod bandit;
pub use bandit::*;

mod server;
pub use server::*;
