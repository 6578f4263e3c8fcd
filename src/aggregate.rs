//! Per-set aggregation of k-mer counts.
//!
//! A [`SequenceSet`] is the unit of comparison (one proteome, one genome, one
//! input file). [`aggregate`] sums the k-mer counts of all of its sequences in
//! parallel with [`rayon`].

use rayon::prelude::*;

use crate::kmer::{count_into, CountProfile, KmerLength, Sequence};

/// A named, ordered collection of sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSet {
    name: String,
    sequences: Vec<Sequence>,
}

impl SequenceSet {
    /// Creates a set from a name and its sequences.
    pub fn new(name: impl Into<String>, sequences: Vec<Sequence>) -> Self {
        Self {
            name: name.into(),
            sequences,
        }
    }

    /// The set's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sequences in input order.
    #[must_use]
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Total number of residues across all sequences.
    #[must_use]
    pub fn total_length(&self) -> u64 {
        self.sequences.iter().map(|s| s.len() as u64).sum()
    }
}

/// Sums the k-mer counts of every sequence in `set`.
///
/// Each rayon worker folds its share of sequences into a local profile, and
/// the partial profiles are combined with [`CountProfile::merge`]. Because the
/// merge is associative and commutative, the result does not depend on the
/// order of the sequences or on how the work was split.
///
/// # Example
///
/// ```rust
/// use kmercomp::aggregate::{aggregate, SequenceSet};
/// use kmercomp::kmer::{KmerLength, Sequence};
///
/// let set = SequenceSet::new(
///     "toy",
///     vec![Sequence::new("AAAB")?, Sequence::new("AB")?],
/// );
/// let profile = aggregate(&set, KmerLength::new(2)?);
///
/// assert_eq!(profile.get("AA"), 2);
/// assert_eq!(profile.get("AB"), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use]
pub fn aggregate(set: &SequenceSet, k: KmerLength) -> CountProfile {
    set.sequences
        .par_iter()
        .fold(CountProfile::new, |mut profile, sequence| {
            count_into(&mut profile, sequence, k);
            profile
        })
        .reduce(CountProfile::new, CountProfile::merge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(name: &str, seqs: &[&str]) -> SequenceSet {
        SequenceSet::new(
            name,
            seqs.iter()
                .map(|s| Sequence::new((*s).to_owned()).unwrap())
                .collect(),
        )
    }

    #[test]
    fn sums_across_sequences() {
        let profile = aggregate(&set("s", &["AAAB", "AAAB", "B"]), KmerLength::new(2).unwrap());
        assert_eq!(profile.get("AA"), 4);
        assert_eq!(profile.get("AB"), 2);
        assert_eq!(profile.total(), 6);
    }

    #[test]
    fn empty_set_gives_empty_profile() {
        let profile = aggregate(&set("s", &[]), KmerLength::new(1).unwrap());
        assert!(profile.is_empty());
    }

    #[test]
    fn order_of_sequences_does_not_matter() {
        let k = KmerLength::new(3).unwrap();
        let forward = aggregate(&set("s", &["MKVLA", "GGA", "MK", "AVLKM"]), k);
        let reversed = aggregate(&set("s", &["AVLKM", "MK", "GGA", "MKVLA"]), k);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn total_length_sums_residues() {
        assert_eq!(set("s", &["AAAB", "", "MK"]).total_length(), 6);
    }
}
