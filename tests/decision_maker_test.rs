//! Episode decision behaviour driven by a manual clock.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use feedercam::clock::ManualClock;
use feedercam::decision::DecisionMaker;
use feedercam::tracking::{Track, TrackSet};

fn track(species: &[(&str, f32)], start: f64, end: f64) -> Track {
    let mut t = Track::new(start);
    t.end_time = end;
    t.predictions = species
        .iter()
        .map(|(s, c)| ((*s).to_string(), *c))
        .collect();
    t
}

fn maker(clock: &Arc<ManualClock>) -> DecisionMaker {
    DecisionMaker::new(60.0, 10.0, 2.0, clock.clone()).unwrap()
}

#[test]
fn test_inactivity_stops_after_max_inactive() {
    let clock = Arc::new(ManualClock::new());
    let mut maker = maker(&clock);

    maker.update_has_detections(false);
    clock.advance_secs(9.9);
    assert!(!maker.decide_stop_recording());

    clock.advance_secs(0.1);
    assert!(maker.decide_stop_recording());
    assert!(maker.stop_recording_decided());
}

#[test]
fn test_detection_restarts_inactivity_timer() {
    let clock = Arc::new(ManualClock::new());
    let mut maker = maker(&clock);

    maker.update_has_detections(false);
    clock.advance_secs(8.0);
    maker.update_has_detections(true);
    clock.advance_secs(1.0);
    maker.update_has_detections(false);
    clock.advance_secs(8.0);
    assert!(!maker.decide_stop_recording());

    clock.advance_secs(2.0);
    assert!(maker.decide_stop_recording());
}

#[test]
fn test_repeated_misses_keep_first_inactive_start() {
    let clock = Arc::new(ManualClock::new());
    let mut maker = maker(&clock);

    maker.update_has_detections(false);
    for _ in 0..10 {
        clock.advance_secs(1.0);
        maker.update_has_detections(false);
    }
    assert!(maker.decide_stop_recording());
}

#[test]
fn test_max_record_stops_even_with_activity() {
    let clock = Arc::new(ManualClock::new());
    let mut maker = maker(&clock);

    for _ in 0..59 {
        maker.update_has_detections(true);
        clock.advance_secs(1.0);
        assert!(!maker.decide_stop_recording());
    }
    clock.advance_secs(1.0);
    assert!(maker.decide_stop_recording());
}

#[test]
fn test_species_decided_once_per_episode() {
    let clock = Arc::new(ManualClock::new());
    let mut maker = maker(&clock);
    let mut tracks = TrackSet::new();

    assert_eq!(maker.decide_species(&tracks), None);

    tracks.insert(1, track(&[("Blue Jay", 0.9), ("Blue Jay", 0.8)], 0.0, 3.0));
    tracks.insert(2, track(&[("Northern Cardinal", 0.95)], 0.0, 2.5));
    assert_eq!(
        maker.decide_species(&tracks).as_deref(),
        Some("Northern Cardinal")
    );
    assert!(maker.species_decided());
    assert_eq!(maker.decide_species(&tracks), None);
}

#[test]
fn test_short_tracks_do_not_decide_species() {
    let clock = Arc::new(ManualClock::new());
    let mut maker = maker(&clock);
    let mut tracks = TrackSet::new();
    tracks.insert(1, track(&[("Blue Jay", 0.9)], 0.0, 1.5));

    assert_eq!(maker.decide_species(&tracks), None);
    assert!(!maker.species_decided());
}

#[test]
fn test_reset_rearms_both_decisions() {
    let clock = Arc::new(ManualClock::new());
    let mut maker = maker(&clock);
    let mut tracks = TrackSet::new();
    tracks.insert(1, track(&[("Blue Jay", 0.9)], 0.0, 3.0));

    clock.advance_secs(60.0);
    assert!(maker.decide_stop_recording());
    assert!(maker.decide_species(&tracks).is_some());

    maker.reset();
    assert!(!maker.stop_recording_decided());
    assert!(!maker.species_decided());
    assert!(!maker.decide_stop_recording());
    assert_eq!(maker.decide_species(&tracks).as_deref(), Some("Blue Jay"));
}

#[test]
fn test_get_results_leaves_state_untouched() {
    let clock = Arc::new(ManualClock::new());
    let maker = maker(&clock);
    let mut tracks = TrackSet::new();
    tracks.insert(4, track(&[("Tufted Titmouse", 0.7)], 1.0, 4.0));
    tracks.insert(7, track(&[("Tufted Titmouse", 0.05)], 1.0, 4.0));

    let results = maker.get_results(&tracks);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].track_id, 4);
    assert!(!maker.species_decided());
}

#[test]
fn test_acceptance_threshold_and_duration_boundary() {
    let clock = Arc::new(ManualClock::new());
    let maker = maker(&clock);
    let mut tracks = TrackSet::new();
    // Below the noise floor no matter how long it lasted.
    tracks.insert(1, track(&[("House Sparrow", 0.09)], 0.0, 30.0));
    // Exactly the minimum duration is enough.
    tracks.insert(2, track(&[("House Finch", 0.5)], 1.0, 3.0));

    let results = maker.get_results(&tracks);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].species_name, "House Finch");
    assert!((results[0].confidence - 0.5).abs() < 1e-6);
}

#[test]
fn test_unanimous_track_keeps_classifier_confidence() {
    let clock = Arc::new(ManualClock::new());
    let maker = maker(&clock);
    let mut tracks = TrackSet::new();
    tracks.insert(1, track(&[("Cardinal", 0.9); 5], 0.0, 3.0));
    tracks.insert(2, track(&[], 0.0, 5.0));

    let results = maker.get_results(&tracks);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].species_name, "Cardinal");
    assert!((results[0].confidence - 0.9).abs() < 1e-6);
}
