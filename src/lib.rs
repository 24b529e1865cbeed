//! Feedercam - bird feeder camera processor.
//!
//! Waits for motion, records an episode, detects and tracks birds frame by
//! frame, decides which species visited and reports the result to the feeder
//! backend. Audio from the recording is analysed with `BirdNET` and
//! low-confidence video results can be checked by an LLM before saving.

#![warn(missing_docs)]

pub mod api;
pub mod audio;
pub mod cli;
pub mod clock;
pub mod config;
pub mod constants;
pub mod decision;
pub mod detection;
pub mod error;
pub mod inference;
pub mod media;
pub mod motion;
pub mod pipeline;
pub mod shutdown;
pub mod tracking;
pub mod verify;
pub mod vision;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use cli::{Cli, Command, ConfigAction, RunArgs};
use config::{
    Config, apply_env_overrides, config_file_path, load_config_file, resolve_data_paths, save_config,
    validate_config,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, BackendReporter, OfflineReporter, Reporter, spawn_heartbeat};
use crate::clock::{SharedClock, system_clock};
use crate::constants::motion::FAKE_WAIT_SECS;
use crate::decision::DecisionMaker;
use crate::detection::RegionalFilter;
use crate::media::{CameraSource, FfmpegDevice, MediaSource, VideoFileSource, spawn_preview_server};
use crate::motion::{FakeMotionSensor, MotionSensor, PirSensor};
use crate::pipeline::{
    EpisodeContext, Orchestrator, build_audio_analyzer, build_gate, build_strategy,
    load_regional_species, log_banner,
};
use crate::shutdown::Shutdown;
use crate::tracking::FrameProcessor;
use crate::vision::LightGate;

pub use error::{Error, Result};

/// Main entry point for the feedercam CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.run.verbose, cli.run.quiet);

    let config_path = match cli.run.config.clone() {
        Some(path) => path,
        None => config_file_path()?,
    };
    let mut config = load_config_file(&config_path)?;
    apply_env_overrides(&mut config);

    if let Some(command) = cli.command {
        return handle_command(command, &config, &config_path);
    }

    resolve_data_paths(&mut config, &config_path);
    apply_cli_overrides(&mut config, &cli.run);
    validate_config(&config)?;

    let fake_motion = cli.run.fake_motion.or_else(|| cli.input.as_ref().map(|_| true));
    run_feeder(&config, cli.input.as_deref(), fake_motion)
}

fn apply_cli_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(strategy) = args.strategy {
        config.processor.strategy = strategy;
    }
    if let Some(dir) = &args.recordings_dir {
        config.processor.recordings_dir.clone_from(dir);
    }
}

/// Initialize the ONNX runtime when a `BirdNET` model will be loaded.
fn init_onnx_runtime(config: &Config) -> Result<()> {
    if config.audio.model.is_none() && config.audio.meta_model.is_none() {
        debug!("No BirdNET models configured, skipping ONNX runtime");
        return Ok(());
    }
    birdnet_onnx::init_runtime().map_err(|e| Error::RuntimeInitialization {
        reason: e.to_string(),
    })
}

fn run_feeder(config: &Config, input: Option<&Path>, fake_motion: Option<bool>) -> Result<()> {
    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Interrupt received, finishing current episode");
        signal.trigger();
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    init_onnx_runtime(config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("feedercam-io")
        .build()?;
    let handle = runtime.handle().clone();
    let clock = system_clock();
    let (stop_tx, stop_rx) = watch::channel(false);

    let reporter: Box<dyn Reporter> = if let Some(url) = config.backend.api_url_base.as_deref() {
        let client = ApiClient::new(
            url,
            Duration::from_secs(config.backend.timeout_secs),
            config.backend.max_retries,
        )?;
        {
            let _guard = runtime.enter();
            let _heartbeat = spawn_heartbeat(
                client.clone(),
                Duration::from_secs(config.backend.heartbeat_interval_secs),
                stop_rx.clone(),
            );
        }
        Box::new(BackendReporter::new(client, handle.clone()))
    } else {
        warn!("No backend URL configured, results are only written to disk");
        Box::new(OfflineReporter)
    };

    let regional = active_species(config, reporter.as_ref(), &clock)?;
    let regional_count = regional.len();
    let strategy = build_strategy(&config.processor, RegionalFilter::new(regional), &handle)?;
    let strategy_name = strategy.name();

    let processor_config = &config.processor;
    let processor = FrameProcessor::new(
        strategy,
        LightGate::new(processor_config.min_brightness),
        Duration::from_millis(processor_config.low_light_sleep_ms),
        processor_config.min_detection_confidence,
        clock.clone(),
    );
    let decision = DecisionMaker::new(
        processor_config.max_record_seconds,
        processor_config.max_inactive_seconds,
        processor_config.min_track_duration,
        clock.clone(),
    )?;
    let audio = build_audio_analyzer(config, &clock)?;
    let gate = build_gate(config, &handle, &clock)?;
    log_banner(
        config,
        strategy_name,
        regional_count,
        audio.is_some(),
        gate.is_some(),
    );

    let media = open_media(config, input, &clock, &shutdown, &handle, &stop_rx)?;
    let motion = open_motion(config, input.is_some(), fake_motion)?;

    let context = EpisodeContext {
        recordings_dir: processor_config.recordings_dir.clone(),
        clock,
        shutdown,
        exit_on_end_of_stream: input.is_some(),
    };
    let mut orchestrator =
        Orchestrator::new(context, motion, media, processor, decision, reporter);
    if let Some(audio) = audio {
        orchestrator = orchestrator.with_audio(audio);
    }
    if let Some(gate) = gate {
        orchestrator = orchestrator.with_gate(gate);
    }

    let result = orchestrator.run();

    if stop_tx.send(true).is_err() {
        debug!("No background tasks to stop");
    }
    runtime.shutdown_timeout(Duration::from_secs(2));
    info!("Stopped");
    result
}

/// Regional species, preferring the backend's active list when it has one.
fn active_species(
    config: &Config,
    reporter: &dyn Reporter,
    clock: &SharedClock,
) -> Result<Vec<String>> {
    let local = load_regional_species(config, clock)?;
    if local.is_empty() {
        return Ok(local);
    }
    match reporter.set_active_species(&local) {
        Ok(Some(active)) if !active.is_empty() => {
            info!("Backend reports {} active species", active.len());
            Ok(active)
        }
        Ok(_) => Ok(local),
        Err(e) => {
            warn!("Failed to publish regional species, using local list: {e}");
            Ok(local)
        }
    }
}

fn open_media(
    config: &Config,
    input: Option<&Path>,
    clock: &SharedClock,
    shutdown: &Shutdown,
    runtime: &tokio::runtime::Handle,
    stop: &watch::Receiver<bool>,
) -> Result<Box<dyn MediaSource>> {
    let camera = &config.camera;
    if let Some(path) = input {
        let source = VideoFileSource::open(path, camera.main_size, camera.lores_size, clock.clone())?;
        return Ok(Box::new(source));
    }

    let device = FfmpegDevice::new(camera.clone());
    let feed = device.preview_feed();
    let source = CameraSource::spawn(device, shutdown.clone())?;
    if let Some(port) = camera.preview_port {
        let started = runtime.block_on(spawn_preview_server(
            port,
            feed,
            source.handle(),
            stop.clone(),
        ));
        if let Err(e) = started {
            warn!("Preview server unavailable on port {port}: {e}");
        }
    }
    Ok(Box::new(source))
}

fn open_motion(
    config: &Config,
    replay: bool,
    fake_motion: Option<bool>,
) -> Result<Box<dyn MotionSensor>> {
    match fake_motion {
        Some(motion) => {
            let wait = if replay {
                Duration::ZERO
            } else {
                Duration::from_secs(FAKE_WAIT_SECS)
            };
            info!("Using fake motion sensor (motion: {motion})");
            Ok(Box::new(FakeMotionSensor::new(wait, motion)))
        }
        None => Ok(Box::new(PirSensor::open(config.motion.pir_pin)?)),
    }
}

/// Initialize tracing subscriber with appropriate verbosity.
fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT is only loaded for audio analysis; its logs stay off unless asked for.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).init();
}

fn handle_command(command: Command, config: &Config, config_path: &Path) -> Result<()> {
    match command {
        Command::Config { action } => handle_config_command(action, config, config_path),
        Command::Species { lat, lon } => {
            init_onnx_runtime(config)?;
            cli::species::print_species_list(config, lat, lon, &system_clock())
        }
    }
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: ConfigAction, config: &Config, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), path)?;
                println!("Created configuration file: {}", path.display());
                println!("\nNext steps:");
                println!("  set processor.models.detector_url and backend.api_url_base");
            }
            Ok(())
        }
        ConfigAction::Show => {
            println!("{config:#?}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
