//! Microphone side of the live session
//!
//! Captures microphone audio, cuts it into fixed 4096-sample frames at 16 kHz,
//! flags whether the user is speaking and encodes each frame as 16-bit PCM
//! for the Gemini Live API.

mod capture;
mod pcm;
mod pipeline;

// Re-export public items
pub use capture::MicCapture;
pub use pcm::{decode_audio_data, decode_blob, encode_frame, quantize};
pub use pipeline::{
    downmix_to_mono, mean_abs_amplitude, resample_linear, AudioFrame, CapturePipeline,
    FrameAssembler, ProcessedFrame,
};

/// Microphone sample rate expected by the Live API
pub const INPUT_SAMPLE_RATE: u32 = 16000;

/// Samples per microphone frame (~256ms at 16 kHz)
pub const FRAME_SIZE: usize = 4096;

/// Mean absolute amplitude above which the user counts as speaking
pub const SPEAKING_THRESHOLD: f32 = 0.01;

pub const INPUT_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Float to i16 scale factor
pub const PCM_SCALE: f32 = 32768.0;
