//! Regional species list from the BirdNET range model.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::error::Result;
use crate::inference::{RangeFilter, common_name};

/// Common names of species expected at a location on a date, sorted and deduplicated.
pub fn regional_species(
    filter: &RangeFilter,
    latitude: f64,
    longitude: f64,
    date: NaiveDate,
    threshold: f32,
) -> Result<Vec<String>> {
    let scores = filter.predict(latitude, longitude, date.month(), date.day())?;
    let names: BTreeSet<String> = scores
        .iter()
        .filter(|s| s.score >= threshold)
        .map(|s| common_name(&s.species).to_string())
        .collect();
    info!(
        "Regional species for ({latitude:.2}, {longitude:.2}) on {date}: {} species",
        names.len()
    );
    Ok(names.into_iter().collect())
}
