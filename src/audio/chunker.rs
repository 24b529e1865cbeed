//! Splitting audio into model-length segments.

/// A model-length window of audio with its position in the recording.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Samples, zero-padded to the full segment length.
    pub samples: Vec<f32>,
    /// Start time in seconds.
    pub start_time: f64,
    /// End time in seconds.
    pub end_time: f64,
}

/// Split samples into consecutive, non-overlapping segments of `segment_duration`.
///
/// The final segment is zero-padded; its end time is clamped to the recording
/// length so detections never extend past the audio.
pub fn segment_audio(samples: &[f32], sample_rate: u32, segment_duration: f32) -> Vec<AudioSegment> {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let segment_len = (f64::from(segment_duration) * f64::from(sample_rate)) as usize;
    if segment_len == 0 || sample_rate == 0 {
        return Vec::new();
    }

    #[allow(clippy::cast_precision_loss)]
    let total_secs = samples.len() as f64 / f64::from(sample_rate);

    samples
        .chunks(segment_len)
        .enumerate()
        .map(|(i, chunk)| {
            let mut data = chunk.to_vec();
            data.resize(segment_len, 0.0);
            #[allow(clippy::cast_precision_loss)]
            let start_time = (i * segment_len) as f64 / f64::from(sample_rate);
            let end_time = (start_time + f64::from(segment_duration)).min(total_secs);
            AudioSegment {
                samples: data,
                start_time,
                end_time,
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_three_second_segments() {
        let samples = vec![0.0; 48_000 * 6];
        let segments = segment_audio(&samples, 48_000, 3.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start_time, 3.0);
        assert_eq!(segments[1].end_time, 6.0);
    }

    #[test]
    fn test_final_segment_padded_and_clamped() {
        let samples = vec![0.1; 48_000 * 4];
        let segments = segment_audio(&samples, 48_000, 3.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].samples.len(), 144_000);
        assert_eq!(segments[1].end_time, 4.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(segment_audio(&[], 48_000, 3.0).is_empty());
    }
}
