use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};

/// Every backend endpoint an aggregation pass reads from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Source {
    Leads,
    Users,
    Colleges,
    Trainers,
    Blogs,
    Videos,
    Courses,
    CrmStats,
    CrmChart,
    CmsChart,
}

impl Source {
    /// Optional sources have a derived fallback; their absence (404) is not a failure.
    pub fn is_optional(self) -> bool {
        matches!(self, Self::CrmStats | Self::CrmChart | Self::CmsChart)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn display_matches_serde_names() {
        for source in Source::iter() {
            let json = serde_json::to_value(source).unwrap_or_default();
            assert_eq!(json.as_str(), Some(source.to_string().as_str()));
        }
    }

    #[test]
    fn only_stats_and_history_are_optional() {
        let optional: Vec<Source> = Source::iter().filter(|s| s.is_optional()).collect();
        assert_eq!(
            optional,
            vec![Source::CrmStats, Source::CrmChart, Source::CmsChart]
        );
    }
}
