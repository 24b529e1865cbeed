//! Track bookkeeping in the frame processor.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use feedercam::clock::ManualClock;
use feedercam::detection::{Detection, DetectionStrategy};
use feedercam::tracking::FrameProcessor;
use feedercam::vision::{BBox, Frame, LightGate};
use feedercam::{Error, Result};
use image::{Rgb, RgbImage};

/// Replays one scripted result per frame.
struct ScriptedStrategy {
    script: VecDeque<Result<Vec<Detection>>>,
    resets: Arc<Mutex<usize>>,
}

impl DetectionStrategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame, _min_confidence: f32) -> Result<Vec<Detection>> {
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn reset(&mut self) {
        *self.resets.lock().unwrap() += 1;
    }
}

fn bright() -> Frame {
    Frame::new(RgbImage::from_pixel(64, 48, Rgb([180, 180, 180])))
}

fn dark() -> Frame {
    Frame::new(RgbImage::from_pixel(64, 48, Rgb([5, 5, 5])))
}

fn seen(track_id: u32) -> Detection {
    Detection::unclassified(track_id, BBox::new(0.3, 0.3, 0.6, 0.6), 0.9)
}

fn classified(track_id: u32, species: &str, confidence: f32, blur: f64, side: u32) -> Detection {
    Detection {
        class_name: Some(species.to_string()),
        confidence,
        blur_variance: Some(blur),
        crop: Some(RgbImage::from_pixel(side, side, Rgb([1, 2, 3]))),
        ..seen(track_id)
    }
}

fn processor(
    script: Vec<Result<Vec<Detection>>>,
    clock: &Arc<ManualClock>,
) -> (FrameProcessor, Arc<Mutex<usize>>) {
    let resets = Arc::new(Mutex::new(0));
    let strategy = ScriptedStrategy {
        script: script.into(),
        resets: resets.clone(),
    };
    let processor = FrameProcessor::new(
        Box::new(strategy),
        LightGate::new(30.0),
        Duration::ZERO,
        0.5,
        clock.clone(),
    );
    (processor, resets)
}

#[test]
fn test_tracks_accumulate_predictions_and_timing() {
    let clock = Arc::new(ManualClock::new());
    let (mut processor, _) = processor(
        vec![
            Ok(vec![classified(1, "Blue Jay", 0.8, 150.0, 40), seen(2)]),
            Ok(vec![seen(1), classified(2, "Northern Cardinal", 0.7, 150.0, 40)]),
            Ok(vec![classified(1, "Blue Jay", 0.6, 150.0, 40)]),
        ],
        &clock,
    );

    clock.advance_secs(0.5);
    assert!(processor.run(&bright()));
    clock.advance_secs(1.0);
    assert!(processor.run(&bright()));
    clock.advance_secs(1.25);
    assert!(processor.run(&bright()));

    let tracks = processor.tracks();
    assert_eq!(tracks.len(), 2);

    let jay = &tracks[&1];
    assert!((jay.start_time - 0.5).abs() < 1e-9);
    assert!((jay.end_time - 2.75).abs() < 1e-9);
    assert_eq!(jay.frames.len(), 3);
    assert_eq!(jay.predictions.len(), 2);
    assert_eq!(jay.predictions[0].0, "Blue Jay");

    let cardinal = &tracks[&2];
    assert!((cardinal.end_time - 1.5).abs() < 1e-9);
    assert_eq!(cardinal.predictions, vec![("Northern Cardinal".to_string(), 0.7)]);
    assert_eq!(processor.frame_count(), 3);
}

#[test]
fn test_best_frame_prefers_sharper_crop() {
    let clock = Arc::new(ManualClock::new());
    let (mut processor, _) = processor(
        vec![
            Ok(vec![classified(1, "Blue Jay", 0.8, 120.0, 60)]),
            Ok(vec![classified(1, "Blue Jay", 0.8, 900.0, 60)]),
            Ok(vec![classified(1, "Blue Jay", 0.8, 200.0, 80)]),
        ],
        &clock,
    );
    for _ in 0..3 {
        processor.run(&bright());
    }

    let track = &processor.tracks()[&1];
    let best = track.best_frame.as_ref().unwrap();
    assert_eq!(best.width(), 60);
    assert!(track.best_frame_score > 0.0);
}

#[test]
fn test_dark_frames_skip_detection() {
    let clock = Arc::new(ManualClock::new());
    let (mut processor, _) = processor(vec![Ok(vec![seen(1)])], &clock);

    assert!(!processor.run(&dark()));
    assert!(processor.tracks().is_empty());
    assert_eq!(processor.frame_count(), 1);

    // The scripted detection was not consumed by the dark frame.
    assert!(processor.run(&bright()));
    assert_eq!(processor.tracks().len(), 1);
}

#[test]
fn test_detection_error_counts_as_empty_frame() {
    let clock = Arc::new(ManualClock::new());
    let (mut processor, _) = processor(
        vec![
            Err(Error::Detector {
                backend: "scripted",
                reason: "timeout".to_string(),
            }),
            Ok(vec![seen(4)]),
        ],
        &clock,
    );

    assert!(!processor.run(&bright()));
    assert!(processor.run(&bright()));
    assert_eq!(processor.tracks().keys().copied().collect::<Vec<_>>(), vec![4]);
}

#[test]
fn test_empty_frame_ignored() {
    let clock = Arc::new(ManualClock::new());
    let (mut processor, _) = processor(vec![Ok(vec![seen(1)])], &clock);

    assert!(!processor.run(&Frame::new(RgbImage::new(0, 0))));
    assert_eq!(processor.frame_count(), 0);
}

#[test]
fn test_reset_clears_tracks_and_restarts_clock() {
    let clock = Arc::new(ManualClock::new());
    let (mut processor, resets) = processor(vec![Ok(vec![seen(1)]), Ok(vec![seen(1)])], &clock);

    clock.advance_secs(5.0);
    processor.run(&bright());
    processor.reset();

    assert!(processor.tracks().is_empty());
    assert_eq!(processor.frame_count(), 0);
    assert_eq!(*resets.lock().unwrap(), 1);
    assert!(processor.elapsed_secs() < 1e-9);

    clock.advance_secs(0.25);
    processor.run(&bright());
    assert!((processor.tracks()[&1].start_time - 0.25).abs() < 1e-9);
}

#[test]
fn test_best_frame_score_never_decreases() {
    let clock = Arc::new(ManualClock::new());
    let blurs = [300.0, 50.0, 800.0, 10.0, 800.0, 1200.0];
    let script = blurs
        .iter()
        .map(|blur| Ok(vec![classified(1, "Blue Jay", 0.8, *blur, 50)]))
        .collect();
    let (mut processor, _) = processor(script, &clock);

    let mut last = 0.0;
    for _ in blurs {
        processor.run(&bright());
        let score = processor.tracks()[&1].best_frame_score;
        assert!(score >= last);
        last = score;
    }
    let expected = feedercam::tracking::best_frame_score(1200.0, 50, 50);
    assert!((last - expected).abs() < 1e-9);
}
