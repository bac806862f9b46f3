//! Back-to-back scheduling of streamed reply audio on an output clock.

use std::collections::BTreeMap;

use super::{OUTPUT_CHANNELS, OUTPUT_SAMPLE_RATE};
use crate::api::realtime_audio::decode_audio_data;
use crate::api::types::PlaybackChunk;
use crate::error::FormatError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkId(pub u64);

/// Audio hardware the scheduler plays into.
///
/// `current_time` is the output clock in seconds. Implementations report the
/// natural end of a chunk back to the session as `SessionEvent::PlaybackEnded`;
/// chunks removed with `stop` produce no end report.
pub trait AudioOutput {
    fn current_time(&self) -> f64;
    fn schedule(&mut self, id: ChunkId, chunk: &PlaybackChunk, start_time: f64);
    fn stop(&mut self, id: ChunkId);
    /// Release the device. Must tolerate being called on a closed output.
    fn close(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledChunk {
    pub id: ChunkId,
    pub start_time: f64,
    pub duration: f64,
}

impl ScheduledChunk {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Chunks currently queued or playing, plus the play-head cursor.
#[derive(Debug, Default)]
pub struct PlaybackRegistry {
    chunks: BTreeMap<ChunkId, ScheduledChunk>,
    next_start_time: f64,
}

impl PlaybackRegistry {
    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, id: ChunkId) -> Option<&ScheduledChunk> {
        self.chunks.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledChunk> {
        self.chunks.values()
    }

    fn insert(&mut self, chunk: ScheduledChunk) {
        self.next_start_time = chunk.end_time();
        self.chunks.insert(chunk.id, chunk);
    }

    fn remove(&mut self, id: ChunkId) -> Option<ScheduledChunk> {
        self.chunks.remove(&id)
    }

    /// Empty the registry and rewind the cursor to 0.
    fn reset(&mut self) -> Vec<ChunkId> {
        self.next_start_time = 0.0;
        std::mem::take(&mut self.chunks).into_keys().collect()
    }
}

/// Queues decoded reply audio so consecutive chunks play without gaps or overlap.
pub struct PlaybackScheduler {
    output: Box<dyn AudioOutput>,
    registry: PlaybackRegistry,
    next_id: u64,
    sample_rate: u32,
    channels: u16,
}

impl PlaybackScheduler {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self::with_format(output, OUTPUT_SAMPLE_RATE, OUTPUT_CHANNELS)
    }

    pub fn with_format(output: Box<dyn AudioOutput>, sample_rate: u32, channels: u16) -> Self {
        Self {
            output,
            registry: PlaybackRegistry::default(),
            next_id: 1,
            sample_rate,
            channels,
        }
    }

    /// Decode one PCM payload and queue it right after everything already queued.
    ///
    /// The cursor advances at enqueue time, not when playback ends, so payloads
    /// arriving faster than real time form a queue instead of overlapping.
    pub fn enqueue(&mut self, bytes: &[u8]) -> Result<ScheduledChunk, FormatError> {
        let chunk = decode_audio_data(bytes, self.sample_rate, self.channels)?;
        Ok(self.enqueue_chunk(chunk))
    }

    pub fn enqueue_chunk(&mut self, chunk: PlaybackChunk) -> ScheduledChunk {
        let id = ChunkId(self.next_id);
        self.next_id += 1;

        let start_time = self
            .registry
            .next_start_time()
            .max(self.output.current_time());
        let scheduled = ScheduledChunk {
            id,
            start_time,
            duration: chunk.duration(),
        };

        self.output.schedule(id, &chunk, start_time);
        self.registry.insert(scheduled);

        log::debug!(
            "Scheduled chunk {} at {:.3}s for {:.3}s ({} queued)",
            id.0,
            start_time,
            scheduled.duration,
            self.registry.len()
        );
        scheduled
    }

    /// Release a chunk whose playback ended. Returns true when that leaves
    /// nothing queued, i.e. the model has finished speaking.
    pub fn on_chunk_ended(&mut self, id: ChunkId) -> bool {
        self.registry.remove(id).is_some() && self.registry.is_empty()
    }

    /// Stop and discard everything queued; the next chunk schedules at "now".
    /// Returns how many chunks were cut off.
    pub fn interrupt(&mut self) -> usize {
        let ids = self.registry.reset();
        for id in &ids {
            self.output.stop(*id);
        }
        if !ids.is_empty() {
            log::info!("Playback interrupted, dropped {} chunk(s)", ids.len());
        }
        ids.len()
    }

    pub fn registry(&self) -> &PlaybackRegistry {
        &self.registry
    }

    pub fn is_playing(&self) -> bool {
        !self.registry.is_empty()
    }

    pub fn current_time(&self) -> f64 {
        self.output.current_time()
    }

    /// Stop everything and release the output device.
    pub fn close(mut self) {
        self.interrupt();
        self.output.close();
    }
}
