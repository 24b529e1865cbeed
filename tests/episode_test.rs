//! End-to-end episode runs against scripted collaborators.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use feedercam::api::{Reporter, VideoPayload};
use feedercam::audio::{AudioAnalysis, AudioAnalyzer, AudioDetection};
use feedercam::clock::{Clock, ManualClock};
use feedercam::decision::DecisionMaker;
use feedercam::detection::{Detection, DetectionStrategy};
use feedercam::media::MediaSource;
use feedercam::motion::FakeMotionSensor;
use feedercam::pipeline::{EpisodeContext, EpisodeEnd, Orchestrator, episode_dir};
use feedercam::shutdown::Shutdown;
use feedercam::tracking::FrameProcessor;
use feedercam::vision::{BBox, Frame, LightGate};
use feedercam::{Error, Result};
use image::{Rgb, RgbImage};

const FRAME_SECS: f64 = 0.5;

#[derive(Default)]
struct MediaLog {
    started: Vec<PathBuf>,
    stopped: usize,
    closed: bool,
}

/// Emits `frames` frames per recording, advancing the clock each capture.
struct ScriptedMedia {
    frames: Option<usize>,
    remaining: Option<usize>,
    clock: Arc<ManualClock>,
    log: Arc<Mutex<MediaLog>>,
    fail_start: bool,
}

impl MediaSource for ScriptedMedia {
    fn start_recording(&mut self, path: &Path) -> Result<()> {
        if self.fail_start {
            return Err(Error::MediaDevice {
                reason: "encoder unavailable".to_string(),
            });
        }
        std::fs::write(path, b"not really a video")?;
        self.log.lock().unwrap().started.push(path.to_path_buf());
        self.remaining = self.frames;
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.log.lock().unwrap().stopped += 1;
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<Frame>> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }
        self.clock.advance_secs(FRAME_SECS);
        Ok(Some(Frame::new(RgbImage::from_pixel(
            64,
            48,
            Rgb([160, 170, 150]),
        ))))
    }

    fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Sees one bird for the first `visible` frames of each episode.
struct VisitingBird {
    visible: usize,
    seen: usize,
}

impl DetectionStrategy for VisitingBird {
    fn name(&self) -> &'static str {
        "visiting_bird"
    }

    fn detect(&mut self, _frame: &Frame, _min_confidence: f32) -> Result<Vec<Detection>> {
        if self.seen >= self.visible {
            return Ok(Vec::new());
        }
        self.seen += 1;
        Ok(vec![Detection {
            class_name: Some("Blue Jay".to_string()),
            blur_variance: Some(250.0),
            crop: Some(RgbImage::from_pixel(32, 32, Rgb([40, 60, 200]))),
            ..Detection::unclassified(1, BBox::new(0.3, 0.3, 0.6, 0.6), 0.85)
        }])
    }

    fn reset(&mut self) {
        self.seen = 0;
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Report {
    Motion,
    Species(String),
    Video(usize),
}

#[derive(Clone, Default)]
struct RecordingReporter {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl Reporter for RecordingReporter {
    fn notify_motion(&self) -> Result<()> {
        self.reports.lock().unwrap().push(Report::Motion);
        Ok(())
    }

    fn notify_species(&self, species: &str) -> Result<()> {
        self.reports
            .lock()
            .unwrap()
            .push(Report::Species(species.to_string()));
        Ok(())
    }

    fn create_video(&self, payload: &VideoPayload) -> Result<()> {
        self.reports
            .lock()
            .unwrap()
            .push(Report::Video(payload.species.len()));
        Ok(())
    }

    fn set_active_species(&self, _names: &[String]) -> Result<Option<Vec<String>>> {
        Ok(None)
    }
}

struct ChirpingWren;

impl AudioAnalyzer for ChirpingWren {
    fn analyze(&self, video: &Path) -> AudioAnalysis {
        assert!(video.exists());
        AudioAnalysis {
            detections: vec![AudioDetection {
                species_name: "Carolina Wren".to_string(),
                start_time: 0.0,
                end_time: 3.0,
                confidence: 0.7,
            }],
            spectrogram_path: Some(video.with_file_name("spectrogram_200.jpg")),
        }
    }
}

struct Fixture {
    root: tempfile::TempDir,
    clock: Arc<ManualClock>,
    media_log: Arc<Mutex<MediaLog>>,
    reporter: RecordingReporter,
}

impl Fixture {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            clock: Arc::new(ManualClock::new()),
            media_log: Arc::new(Mutex::new(MediaLog::default())),
            reporter: RecordingReporter::default(),
        }
    }

    fn orchestrator(&self, frames: Option<usize>, visible: usize, fail_start: bool) -> Orchestrator {
        let context = EpisodeContext {
            recordings_dir: self.root.path().to_path_buf(),
            clock: self.clock.clone(),
            shutdown: Shutdown::new(),
            exit_on_end_of_stream: true,
        };
        let media = ScriptedMedia {
            frames,
            remaining: frames,
            clock: self.clock.clone(),
            log: self.media_log.clone(),
            fail_start,
        };
        let processor = FrameProcessor::new(
            Box::new(VisitingBird { visible, seen: 0 }),
            LightGate::new(30.0),
            Duration::ZERO,
            0.3,
            self.clock.clone(),
        );
        let decision = DecisionMaker::new(60.0, 5.0, 2.0, self.clock.clone()).unwrap();
        Orchestrator::new(
            context,
            Box::new(FakeMotionSensor::new(Duration::ZERO, true)),
            Box::new(media),
            processor,
            decision,
            Box::new(self.reporter.clone()),
        )
    }

    fn reports(&self) -> Vec<Report> {
        self.reporter.reports.lock().unwrap().clone()
    }

    fn expected_dir(&self) -> PathBuf {
        episode_dir(self.root.path(), &self.clock.local())
    }
}

#[test]
fn test_episode_with_bird_saves_results() {
    let fixture = Fixture::new();
    let dir = fixture.expected_dir();
    let mut orchestrator = fixture.orchestrator(Some(12), 12, false);

    let summary = orchestrator.run_episode().unwrap();

    assert_eq!(summary.end, EpisodeEnd::EndOfStream);
    assert_eq!(summary.frames, 12);
    assert_eq!(summary.video_detections, 1);
    assert_eq!(summary.directory.as_deref(), Some(dir.as_path()));
    assert!(dir.join("video.mp4").exists());
    assert!(dir.join("best_frame_track1.jpg").exists());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("detections.json")).unwrap())
            .unwrap();
    let species = json["species"].as_array().unwrap();
    assert_eq!(species.len(), 1);
    assert_eq!(species[0]["species_name"], "Blue Jay");
    assert_eq!(species[0]["source"], "video");
    assert_eq!(species[0]["track_id"], 1);
    assert_eq!(
        species[0]["best_frame_path"],
        dir.join("best_frame_track1.jpg").to_string_lossy().as_ref()
    );
    assert!(json["spectrogram_path"].is_null());

    assert_eq!(
        fixture.reports(),
        vec![
            Report::Motion,
            Report::Species("Blue Jay".to_string()),
            Report::Video(1),
        ]
    );
    assert_eq!(fixture.media_log.lock().unwrap().stopped, 1);
}

#[test]
fn test_episode_without_detections_is_discarded() {
    let fixture = Fixture::new();
    let dir = fixture.expected_dir();
    let mut orchestrator = fixture.orchestrator(Some(6), 0, false);

    let summary = orchestrator.run_episode().unwrap();

    assert!(summary.directory.is_none());
    assert_eq!(summary.video_detections, 0);
    assert!(!dir.exists());
    assert_eq!(fixture.reports(), vec![Report::Motion]);
    assert_eq!(fixture.media_log.lock().unwrap().stopped, 1);
}

#[test]
fn test_short_visit_is_discarded() {
    let fixture = Fixture::new();
    let dir = fixture.expected_dir();
    // Three frames at half a second span one second, below the two second minimum.
    let mut orchestrator = fixture.orchestrator(Some(8), 3, false);

    let summary = orchestrator.run_episode().unwrap();

    assert!(summary.directory.is_none());
    assert!(!dir.exists());
    assert!(!fixture.reports().iter().any(|r| matches!(r, Report::Video(_))));
}

#[test]
fn test_inactivity_ends_live_episode() {
    let fixture = Fixture::new();
    let mut orchestrator = fixture.orchestrator(None, 8, false);

    let summary = orchestrator.run_episode().unwrap();

    assert_eq!(summary.end, EpisodeEnd::Decided);
    assert_eq!(summary.video_detections, 1);
    // Eight frames with the bird, then inactivity runs out after five seconds.
    assert!(summary.frames >= 8 + 10 && summary.frames <= 8 + 12);
}

#[test]
fn test_audio_detections_join_payload() {
    let fixture = Fixture::new();
    let dir = fixture.expected_dir();
    let mut orchestrator = fixture
        .orchestrator(Some(10), 10, false)
        .with_audio(Box::new(ChirpingWren));

    let summary = orchestrator.run_episode().unwrap();

    assert_eq!(summary.audio_detections, 1);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("detections.json")).unwrap())
            .unwrap();
    let species = json["species"].as_array().unwrap();
    assert_eq!(species.len(), 2);
    assert_eq!(species[1]["species_name"], "Carolina Wren");
    assert_eq!(species[1]["source"], "audio");
    assert_eq!(
        json["spectrogram_path"],
        dir.join("spectrogram_200.jpg").to_string_lossy().as_ref()
    );
    assert!(fixture.reports().contains(&Report::Video(2)));
}

#[test]
fn test_recording_failure_removes_episode_dir() {
    let fixture = Fixture::new();
    let dir = fixture.expected_dir();
    let mut orchestrator = fixture.orchestrator(Some(5), 5, true);

    assert!(orchestrator.run_episode().is_err());
    assert!(!dir.exists());
}

#[test]
fn test_replay_stops_after_end_of_stream() {
    let fixture = Fixture::new();
    let mut orchestrator = fixture.orchestrator(Some(10), 10, false);

    orchestrator.run().unwrap();

    let log = fixture.media_log.lock().unwrap();
    assert_eq!(log.started.len(), 1);
    assert!(log.closed);
}
