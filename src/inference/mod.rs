//! BirdNET model wrappers.

mod classifier;
mod range_filter;

pub use classifier::BirdNetClassifier;
pub use range_filter::RangeFilter;

/// Common name from a BirdNET label (`Scientific name_Common name`).
///
/// Labels without a separator are returned unchanged.
pub fn common_name(label: &str) -> &str {
    label.split_once('_').map_or(label, |(_, common)| common)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_name() {
        assert_eq!(common_name("Cardinalis cardinalis_Northern Cardinal"), "Northern Cardinal");
        assert_eq!(common_name("Squirrel"), "Squirrel");
    }
}
