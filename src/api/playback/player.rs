//! cpal output stream with a frame-counting clock and a small mixer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

use super::scheduler::{AudioOutput, ChunkId};
use super::PLAYBACK_SAMPLE_RATE;
use crate::api::types::PlaybackChunk;
use crate::error::MediaError;
use crate::session::{EventSender, SessionEvent};

/// Device channel count (most devices don't support mono)
const PLAYBACK_CHANNELS: u16 = 2;

struct Voice {
    id: ChunkId,
    start_frame: u64,
    chunk: PlaybackChunk,
}

impl Voice {
    /// Source frame index for a device frame, None before the voice starts.
    fn source_frame(&self, device_frame: u64, device_rate: u32) -> Option<usize> {
        let offset = device_frame.checked_sub(self.start_frame)?;
        Some((offset * self.chunk.sample_rate as u64 / device_rate as u64) as usize)
    }

    fn is_finished(&self, device_frame: u64, device_rate: u32) -> bool {
        self.source_frame(device_frame, device_rate)
            .map(|f| f >= self.chunk.frames())
            .unwrap_or(false)
    }
}

/// Places scheduled chunks on a device-frame timeline.
///
/// The clock is the number of frames rendered so far, so it only advances
/// while the device is actually pulling audio.
pub(crate) struct Mixer {
    frames_played: u64,
    device_rate: u32,
    voices: Vec<Voice>,
}

impl Mixer {
    pub(crate) fn new(device_rate: u32) -> Self {
        Self {
            frames_played: 0,
            device_rate: device_rate.max(1),
            voices: Vec::new(),
        }
    }

    pub(crate) fn current_time(&self) -> f64 {
        self.frames_played as f64 / self.device_rate as f64
    }

    pub(crate) fn add(&mut self, id: ChunkId, chunk: PlaybackChunk, start_time: f64) {
        let start_frame = (start_time.max(0.0) * self.device_rate as f64).round() as u64;
        self.voices.push(Voice {
            id,
            start_frame,
            chunk,
        });
    }

    pub(crate) fn remove(&mut self, id: ChunkId) {
        self.voices.retain(|v| v.id != id);
    }

    pub(crate) fn clear(&mut self) {
        self.voices.clear();
    }

    /// Fill an interleaved output buffer and return the chunks that finished.
    pub(crate) fn render(&mut self, out: &mut [f32], channels: usize) -> Vec<ChunkId> {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            frame.fill(0.0);
            for voice in &self.voices {
                let Some(src) = voice.source_frame(self.frames_played, self.device_rate) else {
                    continue;
                };
                if src >= voice.chunk.frames() {
                    continue;
                }
                let src_channels = voice.chunk.channels.max(1) as usize;
                for (ch, slot) in frame.iter_mut().enumerate() {
                    let src_ch = ch.min(src_channels - 1);
                    *slot += voice.chunk.samples[src * src_channels + src_ch];
                }
            }
            for slot in frame.iter_mut() {
                *slot = slot.clamp(-1.0, 1.0);
            }
            self.frames_played += 1;
        }

        let now = self.frames_played;
        let rate = self.device_rate;
        let mut ended = Vec::new();
        self.voices.retain(|v| {
            if v.is_finished(now, rate) {
                ended.push(v.id);
                false
            } else {
                true
            }
        });
        ended
    }
}

/// Default output device driven by a [`Mixer`].
pub struct CpalOutput {
    stream: Option<cpal::Stream>,
    mixer: Arc<Mutex<Mixer>>,
}

impl CpalOutput {
    pub fn open(events: EventSender) -> Result<Self, MediaError> {
        #[cfg(target_os = "windows")]
        let host = cpal::host_from_id(cpal::HostId::Wasapi).unwrap_or(cpal::default_host());
        #[cfg(not(target_os = "windows"))]
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| MediaError::Unsupported("No audio output device found".into()))?;

        let config = cpal::StreamConfig {
            channels: PLAYBACK_CHANNELS,
            sample_rate: PLAYBACK_SAMPLE_RATE,
            buffer_size: cpal::BufferSize::Default,
        };
        let channels = PLAYBACK_CHANNELS as usize;
        let mixer = Arc::new(Mutex::new(Mixer::new(PLAYBACK_SAMPLE_RATE)));

        let mixer_f32 = mixer.clone();
        let events_f32 = events.clone();
        let stream = match device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let ended = match mixer_f32.lock() {
                    Ok(mut m) => m.render(data, channels),
                    Err(_) => {
                        data.fill(0.0);
                        return;
                    }
                };
                report_ended(&events_f32, ended);
            },
            |err| log::error!("Playback stream error: {}", err),
            None,
        ) {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("Failed to create f32 output stream: {}, trying i16", e);
                let mixer_i16 = mixer.clone();
                let mut scratch: Vec<f32> = Vec::new();
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            scratch.resize(data.len(), 0.0);
                            let ended = match mixer_i16.lock() {
                                Ok(mut m) => m.render(&mut scratch, channels),
                                Err(_) => {
                                    data.fill(0);
                                    return;
                                }
                            };
                            for (out, s) in data.iter_mut().zip(&scratch) {
                                *out = (s * i16::MAX as f32) as i16;
                            }
                            report_ended(&events, ended);
                        },
                        |err| log::error!("Playback stream error: {}", err),
                        None,
                    )
                    .map_err(|e2| MediaError::Device(e2.to_string()))?
            }
        };

        stream
            .play()
            .map_err(|e| MediaError::Device(e.to_string()))?;
        log::info!(
            "Playback output opened ({} Hz, {} channels)",
            PLAYBACK_SAMPLE_RATE,
            PLAYBACK_CHANNELS
        );

        Ok(Self {
            stream: Some(stream),
            mixer,
        })
    }
}

fn report_ended(events: &EventSender, ended: Vec<ChunkId>) {
    for id in ended {
        let _ = events.send(SessionEvent::PlaybackEnded(id));
    }
}

impl AudioOutput for CpalOutput {
    fn current_time(&self) -> f64 {
        self.mixer.lock().map(|m| m.current_time()).unwrap_or(0.0)
    }

    fn schedule(&mut self, id: ChunkId, chunk: &PlaybackChunk, start_time: f64) {
        if let Ok(mut m) = self.mixer.lock() {
            m.add(id, chunk.clone(), start_time);
        }
    }

    fn stop(&mut self, id: ChunkId) {
        if let Ok(mut m) = self.mixer.lock() {
            m.remove(id);
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("Ignoring playback pause failure: {}", e);
            }
            log::info!("Playback output closed");
        }
        if let Ok(mut m) = self.mixer.lock() {
            m.clear();
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.close();
    }
}
