//! Hardware the session acquires and releases

use image::RgbImage;
use std::path::PathBuf;

use super::EventSender;
use crate::api::playback::{AudioOutput, CpalOutput};
use crate::api::realtime_audio::MicCapture;
use crate::api::vision::{FrameSource, SnapshotCamera};
use crate::error::MediaError;

/// Combined microphone + camera capture for one session.
///
/// Opening checks permission and availability; audio frames only flow after
/// `start_capture`.
pub trait MediaStream: FrameSource {
    fn start_capture(&mut self) -> Result<(), MediaError>;

    /// Release every track. Must tolerate repeated calls.
    fn stop(&mut self);
}

pub trait MediaDevices {
    fn open_input(&mut self, events: EventSender) -> Result<Box<dyn MediaStream>, MediaError>;
    fn open_output(&mut self, events: EventSender) -> Result<Box<dyn AudioOutput>, MediaError>;
}

/// Default microphone and speakers through cpal, camera from a snapshot file.
#[derive(Debug, Clone, Default)]
pub struct CpalMediaDevices {
    camera_snapshot_path: Option<PathBuf>,
}

impl CpalMediaDevices {
    pub fn new(camera_snapshot_path: Option<PathBuf>) -> Self {
        Self {
            camera_snapshot_path,
        }
    }
}

impl MediaDevices for CpalMediaDevices {
    fn open_input(&mut self, events: EventSender) -> Result<Box<dyn MediaStream>, MediaError> {
        let mic = MicCapture::open(events)?;
        if self.camera_snapshot_path.is_none() {
            log::warn!("No camera snapshot path configured; running audio-only");
        }
        Ok(Box::new(CpalMediaStream {
            mic,
            camera: SnapshotCamera::new(self.camera_snapshot_path.clone()),
        }))
    }

    fn open_output(&mut self, events: EventSender) -> Result<Box<dyn AudioOutput>, MediaError> {
        Ok(Box::new(CpalOutput::open(events)?))
    }
}

struct CpalMediaStream {
    mic: MicCapture,
    camera: SnapshotCamera,
}

impl FrameSource for CpalMediaStream {
    fn latest_frame(&mut self) -> Option<RgbImage> {
        if !self.mic.is_capturing() {
            return None;
        }
        self.camera.latest_frame()
    }
}

impl MediaStream for CpalMediaStream {
    fn start_capture(&mut self) -> Result<(), MediaError> {
        self.mic.start()
    }

    fn stop(&mut self) {
        self.mic.stop();
    }
}
