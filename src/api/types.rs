use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Media payload in the shape the Live API expects: base64 text plus a mime type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EncodedBlob {
    pub data: String,
    pub mime_type: String,
}

impl EncodedBlob {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Decoded PCM ready to hand to an output device.
///
/// Samples are interleaved when `channels > 1` and normalised to [-1.0, 1.0).
#[derive(Clone, Debug)]
pub struct PlaybackChunk {
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PlaybackChunk {
    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds on the output clock.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}
