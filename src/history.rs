//! Append-only decision log with delayed reward attribution.
//!
//! Every decision is logged before it is returned to the caller; the log
//! index is the handle a later reward uses to find its decision.  Entries are
//! never deleted or compacted, so the buffer grows for the lifetime of the
//! process — history is deliberately not persisted across restarts.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Error;

/// One labeled training example: the currency of model updates.
///
/// Produced by [`HistoryBuffer::get_trainable_samples`] and by the
/// reward-shaping helpers in [`crate::reward`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    /// Global-context vector at decision time.
    pub global: Vec<f64>,
    /// Chosen arm id.
    pub arm_id: String,
    /// Arm-context vector of the chosen arm.
    pub arm: Vec<f64>,
    /// Observed (or synthesized) reward.
    pub reward: f64,
}

/// One logged decision, rewarded or not yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Append position; doubles as the reward-attribution handle.
    pub index: usize,
    /// Global-context vector at decision time.
    pub global: Vec<f64>,
    /// Chosen arm id.
    pub arm_id: String,
    /// Arm-context vector of the chosen arm.
    pub arm: Vec<f64>,
    /// `None` until a reward arrives.
    pub reward: Option<f64>,
}

/// Append-only log of decisions awaiting (or holding) rewards.
#[derive(Debug, Clone, Default)]
pub struct HistoryBuffer {
    entries: Vec<HistoryEntry>,
}

impl HistoryBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a decision with no reward yet and return its index handle.
    ///
    /// The handle equals the buffer length before the append, so handles
    /// count up from zero in decision order.  O(1) amortized.
    pub fn log_action(
        &mut self,
        global: Vec<f64>,
        arm_id: impl Into<String>,
        arm: Vec<f64>,
    ) -> usize {
        let index = self.entries.len();
        self.entries.push(HistoryEntry {
            index,
            global,
            arm_id: arm_id.into(),
            arm,
            reward: None,
        });
        index
    }

    /// Attach a reward to a previously logged decision.
    ///
    /// Writing to an index that already holds a reward replaces it (the last
    /// write wins) and logs a warning; nothing prevents late or duplicate
    /// attribution, it is merely visible.
    pub fn set_reward(&mut self, index: usize, reward: f64) -> Result<(), Error> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        if let Some(old) = entry.reward {
            warn!(index, old, new = reward, "reward overwritten");
        }
        entry.reward = Some(reward);
        Ok(())
    }

    /// Snapshot every rewarded entry as a training sample, in insertion
    /// order.  Unrewarded entries are excluded; the snapshot is independent
    /// of later buffer writes.
    #[must_use]
    pub fn get_trainable_samples(&self) -> Vec<LabeledSample> {
        self.entries
            .iter()
            .filter_map(|e| {
                e.reward.map(|reward| LabeledSample {
                    global: e.global.clone(),
                    arm_id: e.arm_id.clone(),
                    arm: e.arm.clone(),
                    reward,
                })
            })
            .collect()
    }

    /// Total number of logged decisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that currently hold a reward.
    #[must_use]
    pub fn labeled_len(&self) -> usize {
        self.entries.iter().filter(|e| e.reward.is_some()).count()
    }

    /// Entry at `index`, if it exists.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log3(buf: &mut HistoryBuffer) -> (usize, usize, usize) {
        let a = buf.log_action(vec![1.0, 0.0], "a", vec![1.0]);
        let b = buf.log_action(vec![0.0, 1.0], "b", vec![2.0]);
        let c = buf.log_action(vec![1.0, 1.0], "c", vec![3.0]);
        (a, b, c)
    }

    #[test]
    fn handles_count_up_from_zero() {
        let mut buf = HistoryBuffer::new();
        let (a, b, c) = log3(&mut buf);
        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.entry(1).unwrap().arm_id, "b");
        assert_eq!(buf.entry(1).unwrap().index, 1);
    }

    #[test]
    fn set_reward_rejects_unissued_handles() {
        let mut buf = HistoryBuffer::new();
        log3(&mut buf);
        let err = buf.set_reward(3, 1.0).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 3, len: 3 }));
    }

    #[test]
    fn trainable_snapshot_excludes_unrewarded_entries() {
        let mut buf = HistoryBuffer::new();
        let (a, _b, c) = log3(&mut buf);
        buf.set_reward(c, 0.5).unwrap();
        buf.set_reward(a, 1.0).unwrap();

        let samples = buf.get_trainable_samples();
        // Insertion order, not reward-arrival order.
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].arm_id, "a");
        assert_eq!(samples[0].reward, 1.0);
        assert_eq!(samples[1].arm_id, "c");
        assert_eq!(samples[1].reward, 0.5);
        assert_eq!(buf.labeled_len(), 2);
    }

    #[test]
    fn reward_overwrite_keeps_last_value() {
        let mut buf = HistoryBuffer::new();
        let (a, _, _) = log3(&mut buf);
        buf.set_reward(a, 0.2).unwrap();
        buf.set_reward(a, 0.9).unwrap();
        assert_eq!(buf.entry(a).unwrap().reward, Some(0.9));
        assert_eq!(buf.labeled_len(), 1);
    }

    #[test]
    fn snapshot_is_independent_of_later_writes() {
        let mut buf = HistoryBuffer::new();
        let (a, b, _) = log3(&mut buf);
        buf.set_reward(a, 1.0).unwrap();
        let snap = buf.get_trainable_samples();
        buf.set_reward(b, 0.0).unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(buf.get_trainable_samples().len(), 2);
    }
}
