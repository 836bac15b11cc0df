//! Scoring models: bilinear (default) and a small MLP variant.
//!
//! A scoring model maps a `(global-context, arm-context)` vector pair to a
//! scalar preference score and learns online from labeled samples.  The
//! default [`BilinearModel`] scores `Gᵗ · M · A` with a dense weight matrix
//! `M` of shape `global_dim × arm_dim`.
//!
//! ## Learning rule
//!
//! Updates are **sequential**: samples are applied one at a time in slice
//! order, and each step sees the weights as perturbed by every earlier step
//! in the same call.  Per sample:
//!
//! ```text
//!   pred = score(G, A)
//!   grad = clamp(pred - reward, -GRAD_CLAMP, GRAD_CLAMP)
//!   M   -= lr * grad * outer(G, A)
//! ```
//!
//! The clamp bounds the step taken for any single sample regardless of how
//! far the prediction was off.  There is no rollback: if a sample partway
//! through a slice fails validation, the earlier steps stand.
//!
//! ## Persistence
//!
//! Weights snapshot to a [`ModelSnapshot`] (serde) and round-trip through
//! JSON files via [`ScoringModel::save`] / [`ScoringModel::load`].  The
//! bilinear snapshot is the matrix shape plus row-major weights, nothing
//! else; training counters are process-local and not persisted.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, LabeledSample};

/// Gradient clamp bound: the per-sample error term is clamped to
/// `[-GRAD_CLAMP, GRAD_CLAMP]` before the weight step.
pub const GRAD_CLAMP: f64 = 3.0;

fn dot(a: &[f64], b: &[f64]) -> f64 {
    let mut s = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        s += x * y;
    }
    s
}

/// `rows × cols` row-major matrix times a `cols` vector.
fn mat_vec(m: &[f64], rows: usize, cols: usize, x: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; rows];
    for (i, o) in out.iter_mut().enumerate() {
        *o = dot(&m[i * cols..(i + 1) * cols], x);
    }
    out
}

fn check_dims(global: &[f64], arm: &[f64], global_dim: usize, arm_dim: usize) -> Result<(), Error> {
    if global.len() != global_dim {
        return Err(Error::DimensionMismatch {
            expected: global_dim,
            actual: global.len(),
        });
    }
    if arm.len() != arm_dim {
        return Err(Error::DimensionMismatch {
            expected: arm_dim,
            actual: arm.len(),
        });
    }
    Ok(())
}

/// Running counters describing the training a model has absorbed.
///
/// Process-local: not part of the persisted snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainingStats {
    /// Non-empty `update` calls.
    pub update_calls: u64,
    /// Samples applied across all calls.
    pub samples_applied: u64,
    /// Sum of applied sample rewards.
    pub reward_sum: f64,
    /// Samples whose error term hit the `GRAD_CLAMP` bound.
    pub clamp_hits: u64,
}

impl TrainingStats {
    /// Mean reward over applied samples; `0.0` before any training.
    #[must_use]
    pub fn mean_reward(&self) -> f64 {
        if self.samples_applied == 0 {
            0.0
        } else {
            self.reward_sum / self.samples_applied as f64
        }
    }

    fn absorb(&mut self, reward: f64, clamped: bool) {
        self.samples_applied += 1;
        self.reward_sum += reward;
        if clamped {
            self.clamp_hits += 1;
        }
    }
}

/// Serializable weights for persistence across process restarts.
///
/// Tagged by model kind so a weights file cannot be silently restored into
/// the wrong model family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSnapshot {
    Bilinear(BilinearSnapshot),
    Mlp(MlpSnapshot),
}

impl ModelSnapshot {
    fn kind(&self) -> &'static str {
        match self {
            ModelSnapshot::Bilinear(_) => "bilinear",
            ModelSnapshot::Mlp(_) => "mlp",
        }
    }
}

/// Bilinear weights: shape plus row-major matrix, no other metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BilinearSnapshot {
    /// Rows of the weight matrix.
    pub global_dim: usize,
    /// Columns of the weight matrix.
    pub arm_dim: usize,
    /// Row-major `global_dim × arm_dim` weights.
    pub weights: Vec<f64>,
}

/// MLP weights: one hidden ReLU layer plus a scalar output head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpSnapshot {
    pub global_dim: usize,
    pub arm_dim: usize,
    pub hidden: usize,
    /// Row-major `hidden × (global_dim + arm_dim)` input weights.
    pub w1: Vec<f64>,
    /// Hidden biases (`hidden`).
    pub b1: Vec<f64>,
    /// Output weights (`hidden`).
    pub w2: Vec<f64>,
    /// Output bias.
    pub b2: f64,
}

/// Online scoring model over `(global, arm)` context pairs.
///
/// Object-safe by design: the bandit and the inference helpers take
/// `&dyn ScoringModel`, so backends can be swapped without touching callers.
pub trait ScoringModel {
    /// Preference score for pairing this arm with this global context.
    /// Deterministic given the current weights.
    fn score(&self, global: &[f64], arm: &[f64]) -> Result<f64, Error>;

    /// Apply labeled samples one at a time, in slice order.
    ///
    /// Empty input is a no-op.  On a mid-slice validation error, samples
    /// already applied stay applied.
    fn update(&mut self, samples: &[LabeledSample]) -> Result<(), Error>;

    /// Expected global-context length.
    fn global_dim(&self) -> usize;

    /// Expected arm-context length.
    fn arm_dim(&self) -> usize;

    /// Training counters accumulated so far.
    fn stats(&self) -> TrainingStats;

    /// Re-randomize the weights from the configured seed and clear counters.
    fn reset(&mut self);

    /// Capture the current weights.
    fn snapshot(&self) -> ModelSnapshot;

    /// Replace the weights from a snapshot of the same kind and shape.
    fn restore(&mut self, snapshot: ModelSnapshot) -> Result<(), Error>;

    /// Write the current weights to `path` as JSON.
    fn save(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), &self.snapshot())?;
        debug!(path = %path.display(), "weights saved");
        Ok(())
    }

    /// Replace the weights from a JSON file written by [`ScoringModel::save`].
    fn load(&mut self, path: &Path) -> Result<(), Error> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot: ModelSnapshot = serde_json::from_str(&raw)?;
        self.restore(snapshot)?;
        debug!(path = %path.display(), "weights loaded");
        Ok(())
    }
}

/// Configuration for [`BilinearModel`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BilinearConfig {
    /// Global-context dimension (weight-matrix rows).
    pub global_dim: usize,
    /// Arm-context dimension (weight-matrix columns).
    pub arm_dim: usize,
    /// SGD step size.
    pub learning_rate: f64,
    /// Scale applied to the standard-normal weight initialization.
    pub init_scale: f64,
    /// Seed for weight initialization; same seed, same starting weights.
    pub seed: u64,
}

impl Default for BilinearConfig {
    fn default() -> Self {
        Self {
            global_dim: 16,
            arm_dim: 16,
            learning_rate: 0.01,
            init_scale: 0.1,
            seed: 0,
        }
    }
}

/// Dense bilinear scorer: `score(G, A) = Gᵗ · M · A`.
#[derive(Debug, Clone)]
pub struct BilinearModel {
    cfg: BilinearConfig,
    weights: Vec<f64>,
    stats: TrainingStats,
}

impl BilinearModel {
    /// Create a model with seeded random initial weights.
    pub fn new(cfg: BilinearConfig) -> Self {
        let mut model = Self {
            cfg,
            weights: Vec::new(),
            stats: TrainingStats::default(),
        };
        model.randomize();
        model
    }

    /// Create a model with explicit weights (row-major,
    /// `global_dim × arm_dim` values).
    pub fn with_weights(cfg: BilinearConfig, weights: Vec<f64>) -> Result<Self, Error> {
        let expected = cfg.global_dim * cfg.arm_dim;
        if weights.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: weights.len(),
            });
        }
        Ok(Self {
            cfg,
            weights,
            stats: TrainingStats::default(),
        })
    }

    fn randomize(&mut self) {
        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        let n = self.cfg.global_dim * self.cfg.arm_dim;
        self.weights = (0..n)
            .map(|_| {
                let z: f64 = StandardNormal.sample(&mut rng);
                z * self.cfg.init_scale
            })
            .collect();
    }

    /// Row-major weight matrix.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn config(&self) -> BilinearConfig {
        self.cfg
    }
}

impl ScoringModel for BilinearModel {
    fn score(&self, global: &[f64], arm: &[f64]) -> Result<f64, Error> {
        check_dims(global, arm, self.cfg.global_dim, self.cfg.arm_dim)?;
        let ma = mat_vec(&self.weights, self.cfg.global_dim, self.cfg.arm_dim, arm);
        Ok(dot(global, &ma))
    }

    fn update(&mut self, samples: &[LabeledSample]) -> Result<(), Error> {
        if samples.is_empty() {
            return Ok(());
        }
        let cols = self.cfg.arm_dim;
        for s in samples {
            let pred = self.score(&s.global, &s.arm)?;
            let raw = pred - s.reward;
            let grad = raw.clamp(-GRAD_CLAMP, GRAD_CLAMP);
            let step = self.cfg.learning_rate * grad;
            for (i, g) in s.global.iter().enumerate() {
                let row = &mut self.weights[i * cols..(i + 1) * cols];
                for (w, a) in row.iter_mut().zip(s.arm.iter()) {
                    *w -= step * g * a;
                }
            }
            self.stats.absorb(s.reward, grad != raw);
        }
        self.stats.update_calls += 1;
        Ok(())
    }

    fn global_dim(&self) -> usize {
        self.cfg.global_dim
    }

    fn arm_dim(&self) -> usize {
        self.cfg.arm_dim
    }

    fn stats(&self) -> TrainingStats {
        self.stats
    }

    fn reset(&mut self) {
        self.randomize();
        self.stats = TrainingStats::default();
    }

    fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot::Bilinear(BilinearSnapshot {
            global_dim: self.cfg.global_dim,
            arm_dim: self.cfg.arm_dim,
            weights: self.weights.clone(),
        })
    }

    fn restore(&mut self, snapshot: ModelSnapshot) -> Result<(), Error> {
        match snapshot {
            ModelSnapshot::Bilinear(snap) => {
                let expected = self.cfg.global_dim * self.cfg.arm_dim;
                if snap.global_dim != self.cfg.global_dim
                    || snap.arm_dim != self.cfg.arm_dim
                    || snap.weights.len() != expected
                {
                    return Err(Error::DimensionMismatch {
                        expected,
                        actual: snap.weights.len(),
                    });
                }
                if !snap.weights.iter().all(|v| v.is_finite()) {
                    return Err(Error::CorruptSnapshot);
                }
                self.weights = snap.weights;
                Ok(())
            }
            other => Err(Error::SnapshotKind {
                expected: "bilinear",
                actual: other.kind(),
            }),
        }
    }
}

/// Configuration for [`MlpModel`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MlpConfig {
    /// Global-context dimension.
    pub global_dim: usize,
    /// Arm-context dimension.
    pub arm_dim: usize,
    /// Hidden-layer width.
    pub hidden: usize,
    /// SGD step size.
    pub learning_rate: f64,
    /// Seed for weight initialization.
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            global_dim: 16,
            arm_dim: 16,
            hidden: 64,
            learning_rate: 1e-3,
            seed: 0,
        }
    }
}

/// Nonlinear scorer: `[G ‖ A] → ReLU hidden layer → scalar`.
///
/// Trains per-sample sequential SGD with the same error clamp as the
/// bilinear model, so the slice-order contract holds for both backends.
#[derive(Debug, Clone)]
pub struct MlpModel {
    cfg: MlpConfig,
    w1: Vec<f64>,
    b1: Vec<f64>,
    w2: Vec<f64>,
    b2: f64,
    stats: TrainingStats,
}

impl MlpModel {
    pub fn new(cfg: MlpConfig) -> Self {
        let mut model = Self {
            cfg,
            w1: Vec::new(),
            b1: Vec::new(),
            w2: Vec::new(),
            b2: 0.0,
            stats: TrainingStats::default(),
        };
        model.randomize();
        model
    }

    fn in_dim(&self) -> usize {
        self.cfg.global_dim + self.cfg.arm_dim
    }

    fn randomize(&mut self) {
        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        let in_dim = self.in_dim();
        let s1 = 1.0 / (in_dim.max(1) as f64).sqrt();
        let s2 = 1.0 / (self.cfg.hidden.max(1) as f64).sqrt();
        let mut draw = |scale: f64| {
            let z: f64 = StandardNormal.sample(&mut rng);
            z * scale
        };
        self.w1 = (0..self.cfg.hidden * in_dim).map(|_| draw(s1)).collect();
        self.b1 = vec![0.0; self.cfg.hidden];
        self.w2 = (0..self.cfg.hidden).map(|_| draw(s2)).collect();
        self.b2 = 0.0;
    }

    /// Hidden activations and output for a concatenated input.
    fn forward(&self, x: &[f64]) -> (Vec<f64>, f64) {
        let in_dim = self.in_dim();
        let mut h = vec![0.0; self.cfg.hidden];
        for (k, hk) in h.iter_mut().enumerate() {
            let z = dot(&self.w1[k * in_dim..(k + 1) * in_dim], x) + self.b1[k];
            *hk = z.max(0.0);
        }
        let y = dot(&self.w2, &h) + self.b2;
        (h, y)
    }

    #[must_use]
    pub fn config(&self) -> MlpConfig {
        self.cfg
    }
}

impl ScoringModel for MlpModel {
    fn score(&self, global: &[f64], arm: &[f64]) -> Result<f64, Error> {
        check_dims(global, arm, self.cfg.global_dim, self.cfg.arm_dim)?;
        let mut x = Vec::with_capacity(self.in_dim());
        x.extend_from_slice(global);
        x.extend_from_slice(arm);
        Ok(self.forward(&x).1)
    }

    fn update(&mut self, samples: &[LabeledSample]) -> Result<(), Error> {
        if samples.is_empty() {
            return Ok(());
        }
        let in_dim = self.in_dim();
        let lr = self.cfg.learning_rate;
        for s in samples {
            check_dims(&s.global, &s.arm, self.cfg.global_dim, self.cfg.arm_dim)?;
            let mut x = Vec::with_capacity(in_dim);
            x.extend_from_slice(&s.global);
            x.extend_from_slice(&s.arm);

            let (h, pred) = self.forward(&x);
            let raw = pred - s.reward;
            let err = raw.clamp(-GRAD_CLAMP, GRAD_CLAMP);

            // Backprop through the output head with the pre-step w2, then
            // step both layers.  ReLU gate: h[k] > 0 iff the pre-activation
            // was positive.
            for k in 0..self.cfg.hidden {
                let dh = err * self.w2[k];
                self.w2[k] -= lr * err * h[k];
                if h[k] > 0.0 {
                    let row = &mut self.w1[k * in_dim..(k + 1) * in_dim];
                    for (w, xj) in row.iter_mut().zip(x.iter()) {
                        *w -= lr * dh * xj;
                    }
                    self.b1[k] -= lr * dh;
                }
            }
            self.b2 -= lr * err;
            self.stats.absorb(s.reward, err != raw);
        }
        self.stats.update_calls += 1;
        Ok(())
    }

    fn global_dim(&self) -> usize {
        self.cfg.global_dim
    }

    fn arm_dim(&self) -> usize {
        self.cfg.arm_dim
    }

    fn stats(&self) -> TrainingStats {
        self.stats
    }

    fn reset(&mut self) {
        self.randomize();
        self.stats = TrainingStats::default();
    }

    fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot::Mlp(MlpSnapshot {
            global_dim: self.cfg.global_dim,
            arm_dim: self.cfg.arm_dim,
            hidden: self.cfg.hidden,
            w1: self.w1.clone(),
            b1: self.b1.clone(),
            w2: self.w2.clone(),
            b2: self.b2,
        })
    }

    fn restore(&mut self, snapshot: ModelSnapshot) -> Result<(), Error> {
        match snapshot {
            ModelSnapshot::Mlp(snap) => {
                let in_dim = self.in_dim();
                if snap.global_dim != self.cfg.global_dim
                    || snap.arm_dim != self.cfg.arm_dim
                    || snap.hidden != self.cfg.hidden
                    || snap.w1.len() != self.cfg.hidden * in_dim
                    || snap.b1.len() != self.cfg.hidden
                    || snap.w2.len() != self.cfg.hidden
                {
                    return Err(Error::DimensionMismatch {
                        expected: self.cfg.hidden * in_dim,
                        actual: snap.w1.len(),
                    });
                }
                let finite = snap.w1.iter().all(|v| v.is_finite())
                    && snap.b1.iter().all(|v| v.is_finite())
                    && snap.w2.iter().all(|v| v.is_finite())
                    && snap.b2.is_finite();
                if !finite {
                    return Err(Error::CorruptSnapshot);
                }
                self.w1 = snap.w1;
                self.b1 = snap.b1;
                self.w2 = snap.w2;
                self.b2 = snap.b2;
                Ok(())
            }
            other => Err(Error::SnapshotKind {
                expected: "mlp",
                actual: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn small_cfg() -> BilinearConfig {
        BilinearConfig {
            global_dim: 2,
            arm_dim: 2,
            learning_rate: 0.01,
            init_scale: 0.1,
            seed: 0,
        }
    }

    fn identity_model(cfg: BilinearConfig) -> BilinearModel {
        let mut weights = vec![0.0; cfg.global_dim * cfg.arm_dim];
        for i in 0..cfg.global_dim.min(cfg.arm_dim) {
            weights[i * cfg.arm_dim + i] = 1.0;
        }
        BilinearModel::with_weights(cfg, weights).unwrap()
    }

    fn sample(global: &[f64], arm_id: &str, arm: &[f64], reward: f64) -> LabeledSample {
        LabeledSample {
            global: global.to_vec(),
            arm_id: arm_id.to_string(),
            arm: arm.to_vec(),
            reward,
        }
    }

    #[test]
    fn bilinear_score_matches_hand_computation() {
        let cfg = small_cfg();
        // M = [[1, 2], [3, 4]]
        let m = BilinearModel::with_weights(cfg, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        // G^T M A with G=[1, 0.5], A=[2, 1]: row0·A=4, row1·A=10 -> 1*4 + 0.5*10 = 9
        let s = m.score(&[1.0, 0.5], &[2.0, 1.0]).unwrap();
        assert!((s - 9.0).abs() < 1e-12);
    }

    #[test]
    fn identity_weights_score_is_dot_product() {
        let m = identity_model(small_cfg());
        let s = m.score(&[1.0, 0.0], &[1.0, 0.0]).unwrap();
        assert!((s - 1.0).abs() < 1e-12);
        let s = m.score(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(s.abs() < 1e-12);
    }

    #[test]
    fn score_rejects_wrong_dimensions() {
        let m = BilinearModel::new(small_cfg());
        let err = m.score(&[1.0], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(m.score(&[1.0, 0.0], &[1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn exact_prediction_leaves_weights_unchanged() {
        let mut m = identity_model(small_cfg());
        let before = m.weights().to_vec();
        // pred = 1.0 and reward = 1.0 -> grad 0 -> no step.
        m.update(&[sample(&[1.0, 0.0], "a", &[1.0, 0.0], 1.0)])
            .unwrap();
        assert_eq!(m.weights(), before.as_slice());
        assert_eq!(m.stats().samples_applied, 1);
        assert_eq!(m.stats().update_calls, 1);
    }

    #[test]
    fn gradient_step_moves_one_cell_by_lr() {
        let cfg = small_cfg();
        let mut m = identity_model(cfg);
        // pred = 1.0, reward = 0.0 -> grad 1 -> M[0][0] -= lr.
        m.update(&[sample(&[1.0, 0.0], "a", &[1.0, 0.0], 0.0)])
            .unwrap();
        assert!((m.weights()[0] - (1.0 - cfg.learning_rate)).abs() < 1e-12);
        assert!((m.weights()[1]).abs() < 1e-12);
        assert!((m.weights()[2]).abs() < 1e-12);
        assert!((m.weights()[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn error_term_is_clamped() {
        let cfg = small_cfg();
        let mut m = identity_model(cfg);
        // pred = 1.0, reward = -100 -> raw error 101 -> clamped to 3.
        m.update(&[sample(&[1.0, 0.0], "a", &[1.0, 0.0], -100.0)])
            .unwrap();
        let expected = 1.0 - cfg.learning_rate * GRAD_CLAMP;
        assert!((m.weights()[0] - expected).abs() < 1e-12);
        assert_eq!(m.stats().clamp_hits, 1);
    }

    #[test]
    fn updates_within_one_call_are_sequential() {
        let cfg = BilinearConfig {
            global_dim: 1,
            arm_dim: 1,
            learning_rate: 0.1,
            init_scale: 0.0,
            seed: 0,
        };
        let mut m = BilinearModel::with_weights(cfg, vec![1.0]).unwrap();
        let s = sample(&[1.0], "a", &[1.0], 0.0);
        m.update(&[s.clone(), s]).unwrap();
        // First step: 1.0 -> 0.9.  Second sees 0.9: 0.9 - 0.1*0.9 = 0.81.
        assert!((m.weights()[0] - 0.81).abs() < 1e-12);
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let mut m = BilinearModel::new(small_cfg());
        let before = m.weights().to_vec();
        m.update(&[]).unwrap();
        assert_eq!(m.weights(), before.as_slice());
        assert_eq!(m.stats(), TrainingStats::default());
    }

    #[test]
    fn same_seed_same_initial_weights() {
        let a = BilinearModel::new(small_cfg());
        let b = BilinearModel::new(small_cfg());
        assert_eq!(a.weights(), b.weights());
        let c = BilinearModel::new(BilinearConfig {
            seed: 1,
            ..small_cfg()
        });
        assert_ne!(a.weights(), c.weights());
    }

    #[test]
    fn reset_restores_seeded_weights_and_clears_stats() {
        let mut m = BilinearModel::new(small_cfg());
        let initial = m.weights().to_vec();
        m.update(&[sample(&[1.0, 0.0], "a", &[0.0, 1.0], 1.0)])
            .unwrap();
        assert_ne!(m.weights(), initial.as_slice());
        m.reset();
        assert_eq!(m.weights(), initial.as_slice());
        assert_eq!(m.stats(), TrainingStats::default());
    }

    #[test]
    fn snapshot_restore_round_trip_preserves_scores() {
        let mut m1 = BilinearModel::new(small_cfg());
        m1.update(&[sample(&[1.0, 0.5], "a", &[0.2, 0.8], 1.0)])
            .unwrap();
        let snap = m1.snapshot();

        let mut m2 = BilinearModel::new(small_cfg());
        m2.restore(snap).unwrap();
        for (g, a) in [([1.0, 0.0], [0.0, 1.0]), ([0.3, 0.7], [0.9, 0.1])] {
            let s1 = m1.score(&g, &a).unwrap();
            let s2 = m2.score(&g, &a).unwrap();
            assert!((s1 - s2).abs() < 1e-12);
        }
    }

    #[test]
    fn restore_rejects_wrong_kind_and_shape() {
        let mut bilinear = BilinearModel::new(small_cfg());
        let mlp_snap = MlpModel::new(MlpConfig {
            global_dim: 2,
            arm_dim: 2,
            hidden: 4,
            ..MlpConfig::default()
        })
        .snapshot();
        assert!(matches!(
            bilinear.restore(mlp_snap),
            Err(Error::SnapshotKind {
                expected: "bilinear",
                actual: "mlp"
            })
        ));

        let wrong_shape = ModelSnapshot::Bilinear(BilinearSnapshot {
            global_dim: 3,
            arm_dim: 2,
            weights: vec![0.0; 6],
        });
        assert!(matches!(
            bilinear.restore(wrong_shape),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn restore_rejects_non_finite_weights() {
        let mut m = BilinearModel::new(small_cfg());
        let snap = ModelSnapshot::Bilinear(BilinearSnapshot {
            global_dim: 2,
            arm_dim: 2,
            weights: vec![0.0, f64::NAN, 0.0, 0.0],
        });
        assert!(matches!(m.restore(snap), Err(Error::CorruptSnapshot)));
    }

    #[test]
    fn save_load_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");

        let mut m1 = BilinearModel::new(small_cfg());
        m1.update(&[sample(&[0.5, 0.5], "a", &[1.0, 0.0], 1.0)])
            .unwrap();
        m1.save(&path).unwrap();

        let mut m2 = BilinearModel::new(BilinearConfig {
            seed: 99,
            ..small_cfg()
        });
        m2.load(&path).unwrap();
        let s1 = m1.score(&[0.5, 0.5], &[1.0, 0.0]).unwrap();
        let s2 = m2.score(&[0.5, 0.5], &[1.0, 0.0]).unwrap();
        assert!((s1 - s2).abs() < 1e-12);
    }

    #[test]
    fn mlp_is_deterministic_given_seed() {
        let cfg = MlpConfig {
            global_dim: 3,
            arm_dim: 2,
            hidden: 8,
            learning_rate: 1e-3,
            seed: 7,
        };
        let a = MlpModel::new(cfg);
        let b = MlpModel::new(cfg);
        let g = [0.1, -0.4, 0.9];
        let arm = [1.0, 0.5];
        assert_eq!(a.score(&g, &arm).unwrap(), b.score(&g, &arm).unwrap());
    }

    #[test]
    fn mlp_training_reduces_squared_error() {
        let cfg = MlpConfig {
            global_dim: 2,
            arm_dim: 2,
            hidden: 8,
            learning_rate: 0.05,
            seed: 3,
        };
        let mut m = MlpModel::new(cfg);
        let g = [1.0, 0.0];
        let arm = [0.0, 1.0];
        let target = 1.0;
        let before = (m.score(&g, &arm).unwrap() - target).powi(2);
        for _ in 0..50 {
            m.update(&[sample(&g, "a", &arm, target)]).unwrap();
        }
        let after = (m.score(&g, &arm).unwrap() - target).powi(2);
        assert!(after < before, "before={before} after={after}");
    }

    #[test]
    fn mlp_snapshot_round_trip_preserves_scores() {
        let cfg = MlpConfig {
            global_dim: 2,
            arm_dim: 2,
            hidden: 4,
            learning_rate: 1e-2,
            seed: 11,
        };
        let mut m1 = MlpModel::new(cfg);
        m1.update(&[sample(&[0.4, 0.6], "a", &[1.0, -1.0], 0.5)])
            .unwrap();
        let mut m2 = MlpModel::new(MlpConfig { seed: 999, ..cfg });
        m2.restore(m1.snapshot()).unwrap();
        let s1 = m1.score(&[0.4, 0.6], &[1.0, -1.0]).unwrap();
        let s2 = m2.score(&[0.4, 0.6], &[1.0, -1.0]).unwrap();
        assert!((s1 - s2).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn bilinear_updates_keep_weights_finite(
            seed in any::<u64>(),
            lr in 1.0e-4f64..0.5,
            rewards in proptest::collection::vec(-10.0f64..10.0, 0..50),
            gs in proptest::collection::vec(
                proptest::collection::vec(-5.0f64..5.0, 3), 0..50),
        ) {
            let cfg = BilinearConfig {
                global_dim: 3,
                arm_dim: 2,
                learning_rate: lr,
                init_scale: 0.1,
                seed,
            };
            let mut m = BilinearModel::new(cfg);
            let arm = [0.7, -0.3];
            for (i, r) in rewards.iter().enumerate() {
                let g = gs.get(i).cloned().unwrap_or_else(|| vec![0.0; 3]);
                m.update(&[sample(&g, "a", &arm, *r)]).unwrap();
            }
            for w in m.weights() {
                prop_assert!(w.is_finite());
            }
            prop_assert_eq!(m.stats().samples_applied as usize, rewards.len());
        }
    }

    proptest! {
        #[test]
        fn bilinear_score_is_deterministic(
            seed in any::<u64>(),
            g in proptest::collection::vec(-3.0f64..3.0, 4),
            a in proptest::collection::vec(-3.0f64..3.0, 4),
        ) {
            let cfg = BilinearConfig {
                global_dim: 4,
                arm_dim: 4,
                seed,
                ..BilinearConfig::default()
            };
            let m = BilinearModel::new(cfg);
            let s1 = m.score(&g, &a).unwrap();
            let s2 = m.score(&g, &a).unwrap();
            prop_assert_eq!(s1, s2);
            prop_assert!(s1.is_finite());
        }
    }
}
