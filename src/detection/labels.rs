//! Class label normalization and the regional species allow-list.

use crate::constants::UNKNOWN_SPECIES;

/// Convert a raw model label to display form.
///
/// `Blue_Jay` becomes `Blue Jay`, `Winter_OR_juvenile` becomes `Winter/juvenile`.
pub fn normalize_class_name(name: &str) -> String {
    name.replace("_OR_", "/").replace('_', " ")
}

/// Allow-list of species names expected in the deployment region.
///
/// A label is allowed when any regional name is a substring of the normalized
/// label. An empty list allows every label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionalFilter {
    species: Vec<String>,
}

impl RegionalFilter {
    /// Build a filter from regional species names.
    pub fn new(species: Vec<String>) -> Self {
        Self { species }
    }

    /// Whether filtering is active.
    pub fn is_active(&self) -> bool {
        !self.species.is_empty()
    }

    /// Number of regional species names.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Whether a normalized label is allowed.
    pub fn allows(&self, label: &str) -> bool {
        !self.is_active() || self.species.iter().any(|s| label.contains(s.as_str()))
    }

    /// Best allowed species from ranked classifier scores.
    ///
    /// Returns `None` when the classifier produced nothing. When scores exist
    /// but none is allowed, the result is `Unknown` with confidence 0.
    pub fn pick(&self, scores: &[(String, f32)]) -> Option<(String, f32)> {
        if scores.is_empty() {
            return None;
        }
        let best = scores
            .iter()
            .map(|(label, score)| (normalize_class_name(label), *score))
            .filter(|(label, _)| self.allows(label))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        Some(best.unwrap_or_else(|| (UNKNOWN_SPECIES.to_string(), 0.0)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn scores() -> Vec<(String, f32)> {
        vec![
            ("Blue_Jay".to_string(), 0.7),
            ("Northern_Cardinal".to_string(), 0.2),
            ("House_Finch_OR_juvenile".to_string(), 0.1),
        ]
    }

    #[test]
    fn test_normalize_class_name() {
        assert_eq!(normalize_class_name("Blue_Jay"), "Blue Jay");
        assert_eq!(
            normalize_class_name("Dark-eyed_Junco_Winter_OR_juvenile"),
            "Dark-eyed Junco Winter/juvenile"
        );
    }

    #[test]
    fn test_empty_list_allows_everything() {
        let filter = RegionalFilter::default();
        assert!(filter.allows("Kookaburra"));
        assert_eq!(filter.pick(&scores()).unwrap().0, "Blue Jay");
    }

    #[test]
    fn test_regional_list_picks_best_allowed() {
        let filter = RegionalFilter::new(vec!["Cardinal".to_string()]);
        let (name, conf) = filter.pick(&scores()).unwrap();
        assert_eq!(name, "Northern Cardinal");
        assert_eq!(conf, 0.2);
    }

    #[test]
    fn test_no_allowed_class_is_unknown() {
        let filter = RegionalFilter::new(vec!["Magpie".to_string()]);
        assert_eq!(filter.pick(&scores()).unwrap(), ("Unknown".to_string(), 0.0));
    }

    #[test]
    fn test_no_scores_is_none() {
        assert!(RegionalFilter::default().pick(&[]).is_none());
    }
}
