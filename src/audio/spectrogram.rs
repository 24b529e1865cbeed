//! Mel spectrogram rendering for recordings with audio detections.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

use crate::constants::audio::{
    SPECTROGRAM_FMAX, SPECTROGRAM_FMIN, SPECTROGRAM_HEIGHT_PX, SPECTROGRAM_JPEG_QUALITY,
    SPECTROGRAM_MELS, SPECTROGRAM_N_FFT, SPECTROGRAM_TOP_DB,
};
use crate::error::{Error, Result};
use crate::vision::save_jpeg;

/// Magma colormap anchors, evenly spaced from 0 to 1.
const MAGMA: [[f32; 3]; 9] = [
    [0.0, 0.0, 4.0],
    [28.0, 16.0, 68.0],
    [79.0, 18.0, 123.0],
    [129.0, 37.0, 129.0],
    [181.0, 54.0, 122.0],
    [229.0, 80.0, 100.0],
    [251.0, 135.0, 97.0],
    [254.0, 194.0, 135.0],
    [252.0, 253.0, 191.0],
];

/// `spectrogram_<px_per_sec>.jpg` next to the video.
pub fn spectrogram_path(video: &Path, px_per_sec: u32) -> PathBuf {
    video.with_file_name(format!("spectrogram_{px_per_sec}.jpg"))
}

/// Map `t` in [0, 1] onto the magma colormap.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn magma(t: f32) -> Rgb<u8> {
    let scaled = t.clamp(0.0, 1.0) * (MAGMA.len() - 1) as f32;
    let lower = (scaled.floor() as usize).min(MAGMA.len() - 2);
    let frac = scaled - lower as f32;
    let (a, b) = (MAGMA[lower], MAGMA[lower + 1]);
    Rgb([0, 1, 2].map(|c| (a[c] + (b[c] - a[c]) * frac).round() as u8))
}

fn hz_to_mel(hz: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f32.ln() / 27.0;
    if hz < MIN_LOG_HZ {
        hz / F_SP
    } else {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / logstep
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f32.ln() / 27.0;
    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        MIN_LOG_HZ * (logstep * (mel - MIN_LOG_MEL)).exp()
    }
}

/// One triangular mel filter over the FFT bins it touches.
struct MelBand {
    first_bin: usize,
    weights: Vec<f32>,
}

impl MelBand {
    fn apply(&self, power: &[f32]) -> f32 {
        power
            .iter()
            .skip(self.first_bin)
            .zip(&self.weights)
            .map(|(p, w)| p * w)
            .sum()
    }
}

/// Slaney-normalised triangular filters.
#[allow(clippy::cast_precision_loss)]
fn mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    bands: usize,
    fmin: f32,
    fmax: f32,
) -> Vec<MelBand> {
    let bins = n_fft / 2 + 1;
    let bin_hz = sample_rate as f32 / n_fft as f32;
    let (low, high) = (hz_to_mel(fmin), hz_to_mel(fmax));
    let edges: Vec<f32> = (0..bands + 2)
        .map(|i| mel_to_hz(low + (high - low) * i as f32 / (bands + 1) as f32))
        .collect();

    edges
        .windows(3)
        .map(|edge| {
            let (left, center, right) = (edge[0], edge[1], edge[2]);
            let norm = 2.0 / (right - left);
            let weight = |bin: usize| {
                let hz = bin as f32 * bin_hz;
                let rising = (hz - left) / (center - left);
                let falling = (right - hz) / (right - center);
                rising.min(falling).max(0.0) * norm
            };
            let first_bin = (0..bins).find(|&bin| weight(bin) > 0.0).unwrap_or(bins);
            let weights = (first_bin..bins)
                .map(weight)
                .take_while(|&w| w > 0.0)
                .collect();
            MelBand { first_bin, weights }
        })
        .collect()
}

/// Mel power per frame (`frames × bands`), centred frames with zero padding.
#[allow(clippy::cast_precision_loss)]
fn mel_power(samples: &[f32], sample_rate: u32, hop: usize) -> Vec<Vec<f32>> {
    let n_fft = SPECTROGRAM_N_FFT;
    let fmax = SPECTROGRAM_FMAX.min(sample_rate as f32 / 2.0);
    let filters = mel_filterbank(sample_rate, n_fft, SPECTROGRAM_MELS, SPECTROGRAM_FMIN, fmax);
    let window: Vec<f32> = (0..n_fft)
        .map(|i| 0.5 - 0.5 * (std::f32::consts::TAU * i as f32 / n_fft as f32).cos())
        .collect();
    let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);

    let half = n_fft / 2;
    let frames = 1 + samples.len() / hop;
    let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];
    let mut power = vec![0.0f32; half + 1];

    (0..frames)
        .map(|frame| {
            let center = frame * hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = (center + i)
                    .checked_sub(half)
                    .and_then(|index| samples.get(index))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * window[i], 0.0);
            }
            fft.process(&mut buffer);
            for (p, value) in power.iter_mut().zip(&buffer) {
                *p = value.norm_sqr();
            }
            filters.iter().map(|band| band.apply(&power)).collect()
        })
        .collect()
}

/// Render a mel spectrogram of `samples` to a JPEG at `output`.
///
/// The image is `px_per_sec` wide per second of audio and shows
/// 200-12000 Hz, clipped to 60 dB below the loudest bin.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn render_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    px_per_sec: u32,
    output: &Path,
) -> Result<()> {
    if samples.is_empty() || sample_rate == 0 || px_per_sec == 0 {
        return Err(Error::Spectrogram {
            reason: format!(
                "nothing to draw ({} samples at {sample_rate} Hz, {px_per_sec} px/s)",
                samples.len()
            ),
        });
    }

    let hop = (sample_rate / px_per_sec).max(1) as usize;
    let mel = mel_power(samples, sample_rate, hop);
    let peak = mel
        .iter()
        .flatten()
        .fold(f32::MIN_POSITIVE, |acc, &v| acc.max(v));
    let reference_db = 10.0 * peak.log10();

    let bands = SPECTROGRAM_MELS as u32;
    let mut raw = RgbImage::new(mel.len() as u32, bands);
    for (x, frame) in mel.iter().enumerate() {
        for (band, &value) in frame.iter().enumerate() {
            let db = 10.0 * value.max(1e-10).log10() - reference_db;
            let t = (db + SPECTROGRAM_TOP_DB) / SPECTROGRAM_TOP_DB;
            // Low frequencies at the bottom.
            raw.put_pixel(x as u32, bands - 1 - band as u32, magma(t));
        }
    }

    let duration = samples.len() as f64 / f64::from(sample_rate);
    let width = ((duration * f64::from(px_per_sec)) as u32).max(1);
    let image = imageops::resize(&raw, width, SPECTROGRAM_HEIGHT_PX, FilterType::Triangle);
    save_jpeg(&image, output, SPECTROGRAM_JPEG_QUALITY)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;

    fn tone(hz: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
        let count = (sample_rate as f32 * secs) as usize;
        (0..count)
            .map(|i| (std::f32::consts::TAU * hz * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_magma_endpoints() {
        assert_eq!(magma(0.0), Rgb([0, 0, 4]));
        assert_eq!(magma(1.0), Rgb([252, 253, 191]));
        assert_eq!(magma(-3.0), magma(0.0));
        assert_eq!(magma(0.5), Rgb([181, 54, 122]));
    }

    #[test]
    fn test_mel_scale_round_trips() {
        for hz in [200.0, 999.0, 1000.0, 4000.0, 12_000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 0.5, "{hz}");
        }
    }

    #[test]
    fn test_filterbank_peaks_in_band() {
        let filters = mel_filterbank(48_000, 2048, 128, 200.0, 12_000.0);
        assert_eq!(filters.len(), 128);
        let bin_hz = 48_000.0 / 2048.0;
        let first = &filters[0];
        let peak = first
            .weights
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap()
            .0;
        let peak_hz = (first.first_bin + peak) as f32 * bin_hz;
        assert!((150.0..400.0).contains(&peak_hz));
        assert!(filters.iter().all(|band| !band.weights.is_empty()));
    }

    #[test]
    fn test_render_writes_sized_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let output = spectrogram_path(&dir.path().join("video.mp4"), 100);
        let samples = tone(3000.0, 48_000, 2.5);

        render_spectrogram(&samples, 48_000, 100, &output).unwrap();

        assert_eq!(output.file_name().unwrap(), "spectrogram_100.jpg");
        let image = image::open(&output).unwrap();
        assert_eq!(image.width(), 250);
        assert_eq!(image.height(), SPECTROGRAM_HEIGHT_PX);
    }

    #[test]
    fn test_render_rejects_empty_audio() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("spectrogram_200.jpg");
        assert!(matches!(
            render_spectrogram(&[], 48_000, 200, &output),
            Err(Error::Spectrogram { .. })
        ));
        assert!(!output.exists());
    }
}
