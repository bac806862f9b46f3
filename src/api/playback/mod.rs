//! Playback of the model's spoken replies
//!
//! The Live API streams its voice as small 24 kHz PCM chunks. The scheduler
//! lines them up on the output clock so they play back-to-back, and the cpal
//! player mixes whatever is scheduled into the default output device.

mod player;
mod scheduler;

pub use player::CpalOutput;
pub use scheduler::{AudioOutput, ChunkId, PlaybackRegistry, PlaybackScheduler, ScheduledChunk};

/// Sample rate of audio coming from Gemini
pub const OUTPUT_SAMPLE_RATE: u32 = 24000;

pub const OUTPUT_CHANNELS: u16 = 1;

/// Playback sample rate (48kHz - most devices support this)
pub const PLAYBACK_SAMPLE_RATE: u32 = 48000;
