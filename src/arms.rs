//! Arm catalog: a stable mapping from arm id to arm-context vector.
//!
//! Enumeration order is **insertion order** and every selection and ranking
//! operation in this crate iterates arms in that order.  That makes
//! tie-breaking deterministic and documented: when two arms score equal, the
//! earlier-inserted arm wins.

use std::collections::BTreeMap;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One arm as stored in a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmSpec {
    /// Stable identifier, unique within a set.
    pub id: String,
    /// Arm-context vector.
    pub vector: Vec<f64>,
}

/// Insertion-ordered set of arms.
///
/// The set is fixed for the lifetime of a bandit: arms can be inserted while
/// composing the set, but there is no removal.  Inserting an id twice
/// replaces the vector in place and keeps the original position.
#[derive(Debug, Clone, Default)]
pub struct ArmSet {
    entries: Vec<(String, Vec<f64>)>,
    index: BTreeMap<String, usize>,
}

impl ArmSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an arm, replacing the vector in place if the id already exists.
    pub fn insert(&mut self, id: impl Into<String>, vector: Vec<f64>) {
        let id = id.into();
        match self.index.get(&id) {
            Some(&pos) => self.entries[pos].1 = vector,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, vector));
            }
        }
    }

    /// Generate `count` arms named `arm0..armN-1` with seeded standard-normal
    /// vectors of length `dim`.  Deterministic given the seed; intended for
    /// development harnesses and tests.
    pub fn random(count: usize, dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut set = Self::new();
        for i in 0..count {
            let vector: Vec<f64> = (0..dim).map(|_| StandardNormal.sample(&mut rng)).collect();
            set.insert(format!("arm{i}"), vector);
        }
        set
    }

    /// Load a set from a JSON file holding an array of [`ArmSpec`] records.
    ///
    /// The array order becomes the enumeration order.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        let specs: Vec<ArmSpec> = serde_json::from_str(&raw)?;
        let mut set = Self::new();
        for spec in specs {
            set.insert(spec.id, spec.vector);
        }
        Ok(set)
    }

    /// Number of arms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Vector for `id`, if present.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&[f64]> {
        self.index
            .get(id)
            .map(|&pos| self.entries[pos].1.as_slice())
    }

    /// Vector for `id`, as an error-typed lookup.
    pub fn require(&self, id: &str) -> Result<&[f64], Error> {
        self.get(id).ok_or_else(|| Error::UnknownArm(id.to_string()))
    }

    /// Arm ids in enumeration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// `(id, vector)` pairs in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.entries
            .iter()
            .map(|(id, v)| (id.as_str(), v.as_slice()))
    }
}

impl FromIterator<(String, Vec<f64>)> for ArmSet {
    fn from_iter<T: IntoIterator<Item = (String, Vec<f64>)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (id, v) in iter {
            set.insert(id, v);
        }
        set
    }
}
