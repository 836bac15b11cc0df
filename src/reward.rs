//! Reward shaping for hierarchical arm vocabularies.
//!
//! Some deployments select in two stages: a coarse key first (a district, a
//! category), then a fine-grained arm whose id embeds the coarse key as a
//! `_`-separated prefix (`"west"` → `"west_a"`, `"west_b"`).  When a coarse
//! choice pays off, the directly chosen arm earns a **strong** reward and
//! every finer-grained child of the coarse key earns a **weak** one, spreading
//! a little credit across the subtree.
//!
//! The helpers here only build samples; feed them to
//! [`crate::ContextualBandit::learn_samples`] or any
//! [`crate::ScoringModel::update`] to apply them.

use crate::{ArmSet, LabeledSample};

/// Reward magnitude for the directly chosen arm.
pub const STRONG_REWARD: f64 = 1.0;

/// Reward magnitude for sibling arms under the same coarse key.
pub const WEAK_REWARD: f64 = 0.1;

/// Separator between hierarchy levels in arm ids.
pub const LEVEL_SEPARATOR: char = '_';

/// Whether `id` is a finer-grained child of `coarse_key`
/// (`"west_a"` is a child of `"west"`; `"westside_a"` and `"west"` are not).
#[must_use]
pub fn is_child_key(id: &str, coarse_key: &str) -> bool {
    id.strip_prefix(coarse_key)
        .is_some_and(|rest| rest.starts_with(LEVEL_SEPARATOR))
}

/// One strong sample for the directly chosen arm.
#[must_use]
pub fn strong_sample(global: &[f64], arm_id: &str, arm: &[f64]) -> LabeledSample {
    LabeledSample {
        global: global.to_vec(),
        arm_id: arm_id.to_string(),
        arm: arm.to_vec(),
        reward: STRONG_REWARD,
    }
}

/// One weak sample per child of `coarse_key`, in arm-set enumeration order.
///
/// Arms that are not children (including the coarse key itself) contribute
/// nothing; an unknown coarse key yields an empty vector.
#[must_use]
pub fn weak_samples(global: &[f64], arms: &ArmSet, coarse_key: &str) -> Vec<LabeledSample> {
    arms.iter()
        .filter(|(id, _)| is_child_key(id, coarse_key))
        .map(|(id, vector)| LabeledSample {
            global: global.to_vec(),
            arm_id: id.to_string(),
            arm: vector.to_vec(),
            reward: WEAK_REWARD,
        })
        .collect()
}
