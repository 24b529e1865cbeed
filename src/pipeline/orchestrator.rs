//! Episode lifecycle: motion, recording, per-frame processing and final results.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use tracing::{debug, error, info, warn};

use crate::api::{Reporter, SpeciesEntry, VideoPayload};
use crate::audio::{AudioAnalysis, AudioAnalyzer};
use crate::clock::SharedClock;
use crate::constants::camera::MAX_CAPTURE_FAILURES;
use crate::constants::output::{BEST_FRAME_JPEG_QUALITY, DETECTIONS_FILE, VIDEO_FILE};
use crate::decision::{AcceptedResult, DecisionMaker};
use crate::error::{Error, Result};
use crate::media::MediaSource;
use crate::motion::MotionSensor;
use crate::shutdown::Shutdown;
use crate::tracking::FrameProcessor;
use crate::verify::PlausibilityGate;
use crate::vision::save_jpeg;

/// Why an episode's frame loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeEnd {
    /// The decision maker stopped the recording.
    Decided,
    /// The media source ran out of frames.
    EndOfStream,
    /// Too many consecutive capture failures.
    DeviceFailure,
    /// Process shutdown was requested.
    Shutdown,
}

/// Outcome of one episode.
#[derive(Debug, Clone)]
pub struct EpisodeSummary {
    /// Episode directory, if it was kept.
    pub directory: Option<PathBuf>,
    /// Accepted video detections after verification.
    pub video_detections: usize,
    /// Merged audio detections.
    pub audio_detections: usize,
    /// Frames processed.
    pub frames: u64,
    /// Why the frame loop ended.
    pub end: EpisodeEnd,
}

/// Process-wide settings of the episode loop.
#[derive(Clone)]
pub struct EpisodeContext {
    /// Root of the `YYYY/MM/DD/HHMMSS` episode folders.
    pub recordings_dir: PathBuf,
    /// Time source.
    pub clock: SharedClock,
    /// Shutdown signal.
    pub shutdown: Shutdown,
    /// Stop the main loop once the source reports end of stream.
    pub exit_on_end_of_stream: bool,
}

/// Episode directory for a start time.
pub fn episode_dir(root: &Path, started: &DateTime<Local>) -> PathBuf {
    root.join(started.format("%Y/%m/%d/%H%M%S").to_string())
}

fn report(result: Result<()>, what: &str) {
    if let Err(e) = result {
        warn!("Failed to report {what}: {e}");
    }
}

/// Drives recording episodes end to end.
pub struct Orchestrator {
    context: EpisodeContext,
    motion: Box<dyn MotionSensor>,
    media: Box<dyn MediaSource>,
    processor: FrameProcessor,
    decision: DecisionMaker,
    reporter: Box<dyn Reporter>,
    audio: Option<Box<dyn AudioAnalyzer>>,
    gate: Option<PlausibilityGate>,
}

impl Orchestrator {
    /// Assemble the loop from its collaborators.
    pub fn new(
        context: EpisodeContext,
        motion: Box<dyn MotionSensor>,
        media: Box<dyn MediaSource>,
        processor: FrameProcessor,
        decision: DecisionMaker,
        reporter: Box<dyn Reporter>,
    ) -> Self {
        Self {
            context,
            motion,
            media,
            processor,
            decision,
            reporter,
            audio: None,
            gate: None,
        }
    }

    /// Analyse recordings that have video detections.
    #[must_use]
    pub fn with_audio(mut self, analyzer: Box<dyn AudioAnalyzer>) -> Self {
        self.audio = Some(analyzer);
        self
    }

    /// Verify low-confidence results before saving.
    #[must_use]
    pub fn with_gate(mut self, gate: PlausibilityGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Run episodes until shutdown, then release the media source.
    pub fn run(&mut self) -> Result<()> {
        info!("Waiting for motion");
        while !self.context.shutdown.is_triggered() {
            match self.motion.wait_for_motion(&self.context.shutdown) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    error!("Motion sensor failed: {e}");
                    self.context
                        .shutdown
                        .sleep(std::time::Duration::from_secs(1));
                    continue;
                }
            }

            match self.run_episode() {
                Ok(summary) => {
                    if summary.end == EpisodeEnd::EndOfStream && self.context.exit_on_end_of_stream {
                        info!("Source exhausted, stopping");
                        break;
                    }
                }
                Err(e) => error!("Episode failed: {e}"),
            }
        }
        self.media.close()
    }

    /// Record and process one episode.
    pub fn run_episode(&mut self) -> Result<EpisodeSummary> {
        info!("Motion detected, starting episode");
        report(self.reporter.notify_motion(), "motion");

        let started_local = self.context.clock.local();
        let dir = episode_dir(&self.context.recordings_dir, &started_local);
        std::fs::create_dir_all(&dir)?;
        let video_path = dir.join(VIDEO_FILE);

        if let Err(e) = self.media.start_recording(&video_path) {
            remove_episode_dir(&dir);
            return Err(e);
        }
        self.processor.reset();
        self.decision.reset();

        let end = self.frame_loop();
        if let Err(e) = self.media.stop_recording() {
            error!("Failed to stop recording: {e}");
        }
        let ended_local = self.context.clock.local();
        info!(
            "Episode ended ({end:?}) after {} frames, {:.1}s",
            self.processor.frame_count(),
            self.processor.elapsed_secs()
        );

        let (directory, video_detections, audio_detections) =
            self.finish_episode(&dir, &video_path, started_local, ended_local)?;
        Ok(EpisodeSummary {
            directory,
            video_detections,
            audio_detections,
            frames: self.processor.frame_count(),
            end,
        })
    }

    fn frame_loop(&mut self) -> EpisodeEnd {
        let mut failures = 0;
        loop {
            if self.context.shutdown.is_triggered() {
                return EpisodeEnd::Shutdown;
            }
            let frame = match self.media.capture() {
                Ok(Some(frame)) => {
                    failures = 0;
                    frame
                }
                Ok(None) => {
                    return if self.context.shutdown.is_triggered() {
                        EpisodeEnd::Shutdown
                    } else {
                        EpisodeEnd::EndOfStream
                    };
                }
                Err(e) => {
                    failures += 1;
                    warn!("Capture failed ({failures}/{MAX_CAPTURE_FAILURES}): {e}");
                    if failures >= MAX_CAPTURE_FAILURES || !e.is_transient() {
                        return EpisodeEnd::DeviceFailure;
                    }
                    continue;
                }
            };

            let has_detections = self.processor.run(&frame);
            self.decision.update_has_detections(has_detections);

            if let Some(species) = self.decision.decide_species(self.processor.tracks()) {
                info!("Species decided: {species}");
                report(self.reporter.notify_species(&species), "species");
            }
            if self.decision.decide_stop_recording() {
                return EpisodeEnd::Decided;
            }
        }
    }

    fn finish_episode(
        &mut self,
        dir: &Path,
        video_path: &Path,
        started: DateTime<Local>,
        ended: DateTime<Local>,
    ) -> Result<(Option<PathBuf>, usize, usize)> {
        let mut results = self.decision.get_results(self.processor.tracks());
        if results.is_empty() {
            info!("No species accepted, discarding {}", dir.display());
            remove_episode_dir(dir);
            return Ok((None, 0, 0));
        }

        let audio = match &self.audio {
            Some(analyzer) => analyzer.analyze(video_path),
            None => AudioAnalysis::default(),
        };
        if let Some(gate) = self.gate.as_mut() {
            results = gate.validate_detections(results, Some(started));
        }
        if results.is_empty() && audio.detections.is_empty() {
            info!("All detections rejected, discarding {}", dir.display());
            remove_episode_dir(dir);
            return Ok((None, 0, 0));
        }

        let entries = save_best_frames(dir, &results);
        let payload = VideoPayload::new(
            entries,
            &audio.detections,
            started.with_timezone(&Utc),
            ended.with_timezone(&Utc),
            video_path.to_string_lossy().into_owned(),
            audio
                .spectrogram_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        );
        write_detections(&dir.join(DETECTIONS_FILE), &payload)?;

        let names: Vec<&str> = results.iter().map(|r| r.species_name.as_str()).collect();
        info!(
            "Saved episode {} (video: {:?}, audio: {})",
            dir.display(),
            names,
            audio.detections.len()
        );
        report(self.reporter.create_video(&payload), "video");

        Ok((Some(dir.to_path_buf()), results.len(), audio.detections.len()))
    }
}

fn save_best_frames(dir: &Path, results: &[AcceptedResult]) -> Vec<SpeciesEntry> {
    results
        .iter()
        .map(|result| {
            let path = result.best_frame.as_ref().and_then(|crop| {
                let path = dir.join(format!("best_frame_track{}.jpg", result.track_id));
                match save_jpeg(crop, &path, BEST_FRAME_JPEG_QUALITY) {
                    Ok(()) => Some(path.to_string_lossy().into_owned()),
                    Err(e) => {
                        warn!("Failed to save best frame for track {}: {e}", result.track_id);
                        None
                    }
                }
            });
            SpeciesEntry::from_video(result, path)
        })
        .collect()
}

fn write_detections(path: &Path, payload: &VideoPayload) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, payload).map_err(|source| Error::JsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn remove_episode_dir(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!("Removed {}", dir.display()),
        Err(e) => warn!("Failed to remove {}: {e}", dir.display()),
    }
}
