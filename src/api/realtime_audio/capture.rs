//! Microphone capture through cpal

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::pipeline::{downmix_to_mono, resample_linear, FrameAssembler};
use super::INPUT_SAMPLE_RATE;
use crate::error::MediaError;
use crate::session::{EventSender, SessionEvent};

/// Open microphone stream that posts `SessionEvent::AudioFrame`s.
///
/// The stream is built when opened (that is where a missing or refused device
/// shows up) but frames only flow after [`MicCapture::start`].
pub struct MicCapture {
    stream: Option<cpal::Stream>,
    capturing: Arc<AtomicBool>,
}

impl MicCapture {
    pub fn open(events: EventSender) -> Result<Self, MediaError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            MediaError::Unsupported("No microphone available. Please connect a microphone.".into())
        })?;
        let supported = device
            .default_input_config()
            .map_err(|e| MediaError::PermissionDenied(e.to_string()))?;

        log::info!("Microphone config: {:?}", supported);

        let capturing = Arc::new(AtomicBool::new(false));
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                build_input_stream::<f32>(&device, &config, events, capturing.clone())
            }
            cpal::SampleFormat::I16 => {
                build_input_stream::<i16>(&device, &config, events, capturing.clone())
            }
            other => {
                return Err(MediaError::Unsupported(format!(
                    "Unsupported microphone sample format: {:?}",
                    other
                )))
            }
        }
        .map_err(|e| MediaError::Device(e.to_string()))?;

        Ok(Self {
            stream: Some(stream),
            capturing,
        })
    }

    pub fn start(&mut self) -> Result<(), MediaError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| MediaError::Device("Microphone already released".into()))?;
        stream
            .play()
            .map_err(|e| MediaError::Device(e.to_string()))?;
        self.capturing.store(true, Ordering::SeqCst);
        log::info!("Microphone capture started");
        Ok(())
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Relaxed)
    }

    /// Release the device. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("Ignoring microphone pause failure: {}", e);
            }
            log::info!("Microphone capture stopped");
        }
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    events: EventSender,
    capturing: Arc<AtomicBool>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate;
    let mut assembler = FrameAssembler::default();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if !capturing.load(Ordering::Relaxed) {
                return;
            }

            let samples: Vec<f32> = data.iter().map(|s| s.to_sample::<f32>()).collect();
            let mono = downmix_to_mono(&samples, channels);
            let resampled = resample_linear(&mono, sample_rate, INPUT_SAMPLE_RATE);

            for frame in assembler.push(&resampled) {
                if events.send(SessionEvent::AudioFrame(frame)).is_err() {
                    // Event loop is gone
                    capturing.store(false, Ordering::Relaxed);
                    return;
                }
            }
        },
        |err| log::error!("Microphone stream error: {}", err),
        None,
    )
}
