//! Regional species list output.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use crate::clock::SharedClock;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::load_regional_species;

/// Print the species expected at the configured (or given) location today.
pub fn print_species_list(
    config: &Config,
    lat: Option<f64>,
    lon: Option<f64>,
    clock: &SharedClock,
) -> Result<()> {
    let mut config = config.clone();
    if lat.is_some() {
        config.location.latitude = lat;
    }
    if lon.is_some() {
        config.location.longitude = lon;
    }
    if config.location.coordinates().is_none() {
        return Err(Error::ConfigValidation {
            message: "location is not configured (set [location] or pass --lat/--lon)".to_string(),
        });
    }
    if config.audio.meta_model.is_none() || config.audio.labels.is_none() {
        return Err(Error::ConfigValidation {
            message: "audio.meta_model and audio.labels are required for the species list"
                .to_string(),
        });
    }

    let species = load_regional_species(&config, clock)?;
    for name in &species {
        println!("{name}");
    }
    eprintln!("{} species", species.len());
    Ok(())
}
