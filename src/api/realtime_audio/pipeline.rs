//! Per-frame processing between the microphone and the transport.

use super::pcm::encode_frame;
use super::{FRAME_SIZE, SPEAKING_THRESHOLD};
use crate::api::types::EncodedBlob;

/// One fixed-size block of 16 kHz mono microphone samples.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }
}

/// Result of pushing one frame through the pipeline.
#[derive(Clone, Debug)]
pub struct ProcessedFrame {
    pub blob: EncodedBlob,
    pub amplitude: f32,
    pub speaking: bool,
}

/// Mean absolute amplitude; 0.0 for an empty frame.
pub fn mean_abs_amplitude(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}

/// Classifies speech and encodes frames for sending.
///
/// Holds the last "user is speaking" value so callers can publish only changes.
#[derive(Debug, Default)]
pub struct CapturePipeline {
    speaking: bool,
    frames_processed: u64,
}

impl CapturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, frame: &AudioFrame) -> ProcessedFrame {
        let amplitude = mean_abs_amplitude(&frame.samples);
        self.speaking = amplitude > SPEAKING_THRESHOLD;
        self.frames_processed += 1;

        ProcessedFrame {
            blob: encode_frame(&frame.samples),
            amplitude,
            speaking: self.speaking,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn reset(&mut self) {
        self.speaking = false;
        self.frames_processed = 0;
    }
}

/// Cuts an arbitrary stream of samples into exact `FRAME_SIZE` frames.
///
/// Device callbacks deliver whatever buffer size the driver picked; this keeps
/// the leftover between callbacks.
#[derive(Debug)]
pub struct FrameAssembler {
    pending: Vec<f32>,
    frame_size: usize,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(FRAME_SIZE)
    }
}

impl FrameAssembler {
    pub fn new(frame_size: usize) -> Self {
        Self {
            pending: Vec::with_capacity(frame_size * 2),
            frame_size: frame_size.max(1),
        }
    }

    pub fn push(&mut self, samples: &[f32]) -> Vec<AudioFrame> {
        self.pending.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_size {
            let rest = self.pending.split_off(self.frame_size);
            let full = std::mem::replace(&mut self.pending, rest);
            frames.push(AudioFrame::new(full));
        }
        frames
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Average interleaved channels down to mono.
pub fn downmix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation downsampling. Input at or below the target rate is
/// passed through unchanged.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == 0 || from_rate <= to_rate {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio) as usize;
    (0..new_len)
        .map(|i| {
            let src_idx = i as f64 / ratio;
            let idx0 = src_idx as usize;
            let idx1 = (idx0 + 1).min(samples.len() - 1);
            let frac = src_idx - idx0 as f64;
            let s0 = samples[idx0] as f64;
            let s1 = samples[idx1] as f64;
            (s0 + (s1 - s0) * frac) as f32
        })
        .collect()
}
