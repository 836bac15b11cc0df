//! The contextual bandit: context in, decision out, reward back in.
//!
//! [`ContextualBandit`] wires the four pieces together — a context source, a
//! fixed arm set, a scoring model, and the decision history.  Every decision
//! is logged before it is returned, and the returned index is the handle the
//! caller (or the decision server) later passes back with a reward.
//!
//! Learning is replay-based: each reward labels its history entry and then
//! retrains the model on **every** labeled entry, in insertion order.  Early
//! decisions are re-reinforced each time a new reward lands; the cost of one
//! reward grows with the labeled history.  Callers that want incremental-only
//! training can label history themselves and call
//! [`ContextualBandit::learn_samples`] with just the new samples.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use crate::{inference, ArmSet, Error, HistoryBuffer, LabeledSample, ScoringModel};

/// Source of global-context vectors.
///
/// The crate ships [`RandomContextSource`] for development; production
/// callers implement this over whatever produces their feature vectors
/// (an embedding service, a feature store).  `fetch` may block.
pub trait ContextSource {
    /// Produce the next global-context vector.
    fn fetch(&mut self) -> Result<Vec<f64>, Error>;
}

/// Seeded standard-normal context vectors, for harnesses and tests.
#[derive(Debug)]
pub struct RandomContextSource {
    dim: usize,
    rng: StdRng,
}

impl RandomContextSource {
    pub fn new(dim: usize, seed: u64) -> Self {
        Self {
            dim,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ContextSource for RandomContextSource {
    fn fetch(&mut self) -> Result<Vec<f64>, Error> {
        Ok((0..self.dim)
            .map(|_| StandardNormal.sample(&mut self.rng))
            .collect())
    }
}

/// Greedy contextual decision engine with delayed-reward learning.
pub struct ContextualBandit {
    source: Box<dyn ContextSource + Send>,
    arms: ArmSet,
    model: Box<dyn ScoringModel + Send>,
    history: HistoryBuffer,
}

impl std::fmt::Debug for ContextualBandit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextualBandit").finish_non_exhaustive()
    }
}

impl ContextualBandit {
    /// Assemble a bandit, validating the arm set against the model.
    ///
    /// Fails fast: an empty arm set or any arm vector whose length differs
    /// from the model's arm dimension is rejected here, not at decision time.
    pub fn new(
        source: impl ContextSource + Send + 'static,
        arms: ArmSet,
        model: impl ScoringModel + Send + 'static,
    ) -> Result<Self, Error> {
        if arms.is_empty() {
            return Err(Error::NoArms);
        }
        for (_, vector) in arms.iter() {
            if vector.len() != model.arm_dim() {
                return Err(Error::DimensionMismatch {
                    expected: model.arm_dim(),
                    actual: vector.len(),
                });
            }
        }
        Ok(Self {
            source: Box::new(source),
            arms,
            model: Box::new(model),
            history: HistoryBuffer::new(),
        })
    }

    /// Fetch a context from the source, then decide as
    /// [`ContextualBandit::infer_with_context`].
    pub fn infer(&mut self) -> Result<(String, usize), Error> {
        let global = self.source.fetch()?;
        self.infer_with_context(&global)
    }

    /// Greedily select the best arm for `global`, log the decision, and
    /// return `(arm_id, index)`.  The index is the reward handle.
    pub fn infer_with_context(&mut self, global: &[f64]) -> Result<(String, usize), Error> {
        let arm_id = inference::select_arm(self.model.as_ref(), &self.arms, global)?;
        let arm = self.arms.require(&arm_id)?.to_vec();
        let index = self
            .history
            .log_action(global.to_vec(), arm_id.clone(), arm);
        debug!(index, arm = %arm_id, "decision logged");
        Ok((arm_id, index))
    }

    /// Attribute a reward to decision `index` and retrain on the full
    /// labeled history.
    pub fn give_reward(&mut self, index: usize, reward: f64) -> Result<(), Error> {
        self.history.set_reward(index, reward)?;
        let samples = self.history.get_trainable_samples();
        debug!(index, reward, replay = samples.len(), "reward absorbed");
        self.model.update(&samples)
    }

    /// Log a known `(context, arm, reward)` triple in one step: the offline
    /// hook for labeled datasets.  Returns the new entry's index.
    pub fn observe_labeled(
        &mut self,
        global: &[f64],
        arm_id: &str,
        reward: f64,
    ) -> Result<usize, Error> {
        let arm = self.arms.require(arm_id)?.to_vec();
        let index = self.history.log_action(global.to_vec(), arm_id, arm);
        self.give_reward(index, reward)?;
        Ok(index)
    }

    /// Train directly on caller-built samples (e.g. hierarchical shaped
    /// rewards from [`crate::reward`]) without touching the history.
    pub fn learn_samples(&mut self, samples: &[LabeledSample]) -> Result<(), Error> {
        self.model.update(samples)
    }

    /// Score and rank every arm for `global` without logging a decision.
    pub fn rank_arms_with_context(&self, global: &[f64]) -> Result<Vec<(String, f64)>, Error> {
        inference::rank_arms(self.model.as_ref(), &self.arms, global)
    }

    /// First `k` of [`ContextualBandit::rank_arms_with_context`].
    pub fn top_k_with_context(
        &self,
        global: &[f64],
        k: usize,
    ) -> Result<Vec<(String, f64)>, Error> {
        inference::top_k(self.model.as_ref(), &self.arms, global, k)
    }

    /// Persist the model weights to `path` as JSON.
    pub fn save_weights(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.model.save(path.as_ref())
    }

    /// Replace the model weights from a file written by
    /// [`ContextualBandit::save_weights`].
    pub fn load_weights(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.model.load(path.as_ref())
    }

    #[must_use]
    pub fn arms(&self) -> &ArmSet {
        &self.arms
    }

    #[must_use]
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    #[must_use]
    pub fn model(&self) -> &dyn ScoringModel {
        self.model.as_ref()
    }
}
