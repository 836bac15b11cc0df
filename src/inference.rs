//! Stateless selection and ranking over an arm set.
//!
//! These functions are pure views over `(model, arms, global context)`: they
//! score every candidate arm and pick or order them.  Nothing here mutates
//! state or logs history; that is the bandit's job.
//!
//! Determinism contract: arms are scored in enumeration order, selection uses
//! a strict `>` comparison (first encountered wins ties), and ranking uses a
//! stable descending sort (equal scores keep enumeration order).

use std::cmp::Ordering;

use crate::{ArmSet, Error, ScoringModel};

/// Greedily select the best-scoring arm.
///
/// Ties break toward the earlier-inserted arm.  Empty arm set is an error.
pub fn select_arm(
    model: &dyn ScoringModel,
    arms: &ArmSet,
    global: &[f64],
) -> Result<String, Error> {
    let mut iter = arms.iter();
    let Some((first_id, first_vec)) = iter.next() else {
        return Err(Error::NoArms);
    };
    let mut best_id = first_id;
    let mut best_score = model.score(global, first_vec)?;
    for (id, vector) in iter {
        let score = model.score(global, vector)?;
        if score > best_score {
            best_id = id;
            best_score = score;
        }
    }
    Ok(best_id.to_string())
}

/// Score every arm and return `(id, score)` pairs sorted by score descending.
///
/// Each arm appears exactly once.  The sort is stable, so equal scores keep
/// enumeration order.
pub fn rank_arms(
    model: &dyn ScoringModel,
    arms: &ArmSet,
    global: &[f64],
) -> Result<Vec<(String, f64)>, Error> {
    let mut scored = Vec::with_capacity(arms.len());
    for (id, vector) in arms.iter() {
        scored.push((id.to_string(), model.score(global, vector)?));
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    Ok(scored)
}

/// First `k` entries of [`rank_arms`] (fewer when `k` exceeds the arm count).
pub fn top_k(
    model: &dyn ScoringModel,
    arms: &ArmSet,
    global: &[f64],
    k: usize,
) -> Result<Vec<(String, f64)>, Error> {
    let mut ranked = rank_arms(model, arms, global)?;
    ranked.truncate(k);
    Ok(ranked)
}

/// Rank only the arms whose id satisfies `keep`, optionally truncated to `k`.
///
/// Excluded arms are never scored.  Filtering everything out yields an empty
/// vector, not an error.
pub fn filter_and_rank<F>(
    model: &dyn ScoringModel,
    arms: &ArmSet,
    global: &[f64],
    mut keep: F,
    k: Option<usize>,
) -> Result<Vec<(String, f64)>, Error>
where
    F: FnMut(&str) -> bool,
{
    let mut scored = Vec::new();
    for (id, vector) in arms.iter() {
        if !keep(id) {
            continue;
        }
        scored.push((id.to_string(), model.score(global, vector)?));
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    if let Some(k) = k {
        scored.truncate(k);
    }
    Ok(scored)
}
