//! Audio analysis: extraction, decoding, BirdNET inference, detection merging and spectrograms.

mod analyzer;
mod chunker;
mod decode;
mod extract;
mod merge;
mod regional;
mod spectrogram;

pub use analyzer::{AudioAnalysis, AudioAnalyzer, BirdNetAnalyzer, with_spectrogram};
pub use chunker::{AudioSegment, segment_audio};
pub use decode::{DecodedAudio, read_wav};
pub use extract::{extract_audio, temp_wav_path};
pub use merge::{AudioDetection, merge_detections};
pub use regional::regional_species;
pub use spectrogram::{magma, render_spectrogram, spectrogram_path};
