//! Analysis settings shared by the library pipeline and the CLI.

use crate::{
    association::{AssociationTester, ContingencyValues},
    lengths::DEFAULT_LENGTH,
    stats::{RangeMode, StatisticsEngine},
    table::{InclusionPolicy, TableBuilder, Vocabulary},
};

/// How tables are built and analyzed for every k.
///
/// The defaults keep every observed k-mer, report min/max ranges, apply
/// Yates' correction to 1-dof tables, test raw counts, and read unknown set
/// lengths as 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Minimum count for a k-mer column to be kept.
    pub inclusion_threshold: Option<u64>,
    /// Whether any or all sets must reach `inclusion_threshold`.
    pub inclusion_policy: InclusionPolicy,
    /// Observed k-mers only, or the complete alphabet vocabulary.
    pub vocabulary: Vocabulary,
    /// Extremum reported by the descriptive statistics.
    pub range_mode: RangeMode,
    /// Apply Yates' continuity correction when dof = 1.
    pub yates_correction: bool,
    /// Cell values the association test runs on.
    pub contingency_values: ContingencyValues,
    /// Length assumed for sets missing from the length registry.
    pub default_length: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            inclusion_threshold: None,
            inclusion_policy: InclusionPolicy::default(),
            vocabulary: Vocabulary::default(),
            range_mode: RangeMode::default(),
            yates_correction: true,
            contingency_values: ContingencyValues::default(),
            default_length: DEFAULT_LENGTH,
        }
    }
}

impl AnalysisConfig {
    pub(crate) const fn table_builder(&self) -> TableBuilder {
        TableBuilder::new()
            .inclusion_threshold(self.inclusion_threshold)
            .policy(self.inclusion_policy)
            .vocabulary(self.vocabulary)
    }

    pub(crate) const fn statistics_engine(&self) -> StatisticsEngine {
        StatisticsEngine::new(self.range_mode)
    }

    pub(crate) const fn association_tester(&self) -> AssociationTester {
        AssociationTester::new().yates_correction(self.yates_correction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.inclusion_threshold, None);
        assert_eq!(config.inclusion_policy, InclusionPolicy::Any);
        assert_eq!(config.contingency_values, ContingencyValues::Counts);
        assert_eq!(config.default_length, 1);
        assert_eq!(config.association_tester(), AssociationTester::new());
        assert_eq!(config.table_builder(), TableBuilder::new());
    }

    #[test]
    fn components_follow_settings() {
        let config = AnalysisConfig {
            inclusion_threshold: Some(5),
            yates_correction: false,
            range_mode: RangeMode::Max,
            ..AnalysisConfig::default()
        };
        assert_eq!(
            config.table_builder(),
            TableBuilder::new().inclusion_threshold(Some(5))
        );
        assert_eq!(
            config.association_tester(),
            AssociationTester::new().yates_correction(false)
        );
        assert_eq!(config.statistics_engine().range_mode(), RangeMode::Max);
    }
}
