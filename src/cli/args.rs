//! CLI argument definitions.

use crate::config::{StrategyKind, parse_bool};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Bird feeder camera: motion-triggered recording with species detection.
#[derive(Debug, Parser)]
#[command(name = "feedercam")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Video file to replay instead of the live camera.
    pub input: Option<PathBuf>,

    /// Options for the detection loop.
    #[command(flatten)]
    pub run: RunArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print the regional species list for the configured location.
    Species {
        /// Latitude (overrides config).
        #[arg(long, value_parser = parse_latitude, allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude (overrides config).
        #[arg(long, value_parser = parse_longitude, allow_hyphen_values = true)]
        lon: Option<f64>,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for the detection loop.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Use a simulated motion sensor that always (true) or never (false) fires.
    #[arg(long, value_name = "BOOL", value_parser = parse_flag, env = "FEEDERCAM_FAKE_MOTION")]
    pub fake_motion: Option<bool>,

    /// Configuration file (default: platform config directory).
    #[arg(long, global = true, env = "FEEDERCAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Detection strategy (overrides config).
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyKind>,

    /// Root directory for recordings (overrides config).
    #[arg(long, env = "FEEDERCAM_RECORDINGS_DIR")]
    pub recordings_dir: Option<PathBuf>,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: full trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_flag(s: &str) -> Result<bool, String> {
    parse_bool(s).ok_or_else(|| format!("'{s}' is not a boolean (true/false, 1/0, yes/no)"))
}

/// Parse and validate latitude value.
fn parse_latitude(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(-90.0..=90.0).contains(&value) {
        return Err(format!(
            "latitude must be between -90.0 and 90.0, got {value}"
        ));
    }

    Ok(value)
}

/// Parse and validate longitude value.
fn parse_longitude(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(-180.0..=180.0).contains(&value) {
        return Err(format!(
            "longitude must be between -180.0 and 180.0, got {value}"
        ));
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::try_parse_from(["feedercam"]).unwrap();
        assert!(cli.input.is_none());
        assert!(cli.command.is_none());
        assert_eq!(cli.run.verbose, 0);
    }

    #[test]
    fn test_cli_parse_replay_with_fake_motion() {
        let cli = Cli::try_parse_from(["feedercam", "clip.mp4", "--fake-motion", "true", "-vv"])
            .unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("clip.mp4")));
        assert_eq!(cli.run.fake_motion, Some(true));
        assert_eq!(cli.run.verbose, 2);
    }

    #[test]
    fn test_cli_parse_fake_motion_false() {
        let cli = Cli::try_parse_from(["feedercam", "--fake-motion=no"]).unwrap();
        assert_eq!(cli.run.fake_motion, Some(false));
        assert!(Cli::try_parse_from(["feedercam", "--fake-motion", "sometimes"]).is_err());
    }

    #[test]
    fn test_cli_parse_strategy() {
        let cli = Cli::try_parse_from(["feedercam", "--strategy", "single-stage"]).unwrap();
        assert_eq!(cli.run.strategy, Some(StrategyKind::SingleStage));
    }

    #[test]
    fn test_cli_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["feedercam", "config", "show", "-q"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
        assert!(cli.run.quiet);
    }

    #[test]
    fn test_cli_parse_species_subcommand() {
        let cli =
            Cli::try_parse_from(["feedercam", "species", "--lat", "42.36", "--lon", "-71.06"])
                .unwrap();
        let Some(Command::Species { lat, lon }) = cli.command else {
            unreachable!("expected species subcommand");
        };
        assert_eq!(lat, Some(42.36));
        assert_eq!(lon, Some(-71.06));
    }

    #[test]
    fn test_parse_latitude_invalid() {
        assert!(parse_latitude("91.0").is_err());
        assert!(parse_latitude("-91.0").is_err());
        assert!(parse_latitude("abc").is_err());
    }

    #[test]
    fn test_parse_longitude_invalid() {
        assert!(parse_longitude("181.0").is_err());
        assert!(parse_longitude("abc").is_err());
    }
}
