//! Total sequence length per set, used to normalize counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::SequenceSet;

/// Length used for sets missing from the registry.
pub const DEFAULT_LENGTH: u64 = 1;

/// Mapping from set name to total residue length.
///
/// Lookups never return zero: names that are absent, or recorded with a
/// length of zero, read as the fallback length (1 unless configured).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceLengths {
    lengths: BTreeMap<String, u64>,
    #[serde(skip, default = "default_length")]
    fallback: u64,
}

const fn default_length() -> u64 {
    DEFAULT_LENGTH
}

impl Default for SequenceLengths {
    fn default() -> Self {
        Self {
            lengths: BTreeMap::new(),
            fallback: DEFAULT_LENGTH,
        }
    }
}

impl SequenceLengths {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the total length of every set.
    #[must_use]
    pub fn from_sets(sets: &[SequenceSet]) -> Self {
        sets.iter()
            .map(|set| (set.name().to_owned(), set.total_length()))
            .collect()
    }

    /// Replaces the fallback length. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_fallback(mut self, fallback: u64) -> Self {
        self.fallback = fallback.max(1);
        self
    }

    /// Records the length of `name`.
    pub fn insert(&mut self, name: impl Into<String>, length: u64) {
        self.lengths.insert(name.into(), length);
    }

    /// The length to divide `name`'s counts by.
    #[must_use]
    pub fn length_of(&self, name: &str) -> u64 {
        match self.lengths.get(name) {
            Some(&length) if length > 0 => length,
            _ => self.fallback,
        }
    }

    /// Recorded `(name, length)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.lengths.iter().map(|(name, &len)| (name.as_str(), len))
    }

    /// Number of recorded sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    /// Returns `true` if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for SequenceLengths {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            lengths: iter.into_iter().map(|(n, l)| (n.into(), l)).collect(),
            fallback: DEFAULT_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_name_reads_as_one() {
        let lengths: SequenceLengths = [("human", 1000)].into_iter().collect();
        assert_eq!(lengths.length_of("human"), 1000);
        assert_eq!(lengths.length_of("mouse"), 1);
    }

    #[test]
    fn zero_length_reads_as_fallback() {
        let lengths: SequenceLengths = [("empty", 0)].into_iter().collect();
        assert_eq!(lengths.length_of("empty"), 1);
        assert_eq!(lengths.with_fallback(10).length_of("empty"), 10);
    }

    #[test]
    fn fallback_is_never_zero() {
        let lengths = SequenceLengths::new().with_fallback(0);
        assert_eq!(lengths.length_of("anything"), 1);
    }

    #[test]
    fn json_is_a_plain_object() {
        let lengths: SequenceLengths = [("a", 4), ("b", 7)].into_iter().collect();
        let json = serde_json::to_string(&lengths).unwrap();
        assert_eq!(json, r#"{"a":4,"b":7}"#);

        let parsed: SequenceLengths = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, lengths);
        assert_eq!(parsed.length_of("c"), 1);
    }
}
