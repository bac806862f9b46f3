//! Camera stills for the live session
//!
//! A frame sampler runs on its own wall-clock cadence (independent of the
//! microphone), grabs the newest camera image, shrinks it to 640x360 and
//! sends it as a JPEG.

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::api::types::EncodedBlob;

pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 360;
pub const FRAME_MIME_TYPE: &str = "image/jpeg";
pub const DEFAULT_JPEG_QUALITY: u8 = 60;
pub const DEFAULT_FRAME_RATE: f64 = 1.0;

/// Anything that can hand over the most recent camera image.
pub trait FrameSource {
    /// None while the camera has no usable frame yet.
    fn latest_frame(&mut self) -> Option<RgbImage>;
}

/// Resize to the fixed wire resolution and JPEG-encode.
pub fn encode_jpeg_frame(frame: &RgbImage, quality: u8) -> Result<EncodedBlob, image::ImageError> {
    let resized = if frame.dimensions() == (FRAME_WIDTH, FRAME_HEIGHT) {
        frame.clone()
    } else {
        image::imageops::resize(
            frame,
            FRAME_WIDTH,
            FRAME_HEIGHT,
            image::imageops::FilterType::Triangle,
        )
    };

    let mut jpeg_data: Vec<u8> = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_data, quality.clamp(1, 100));
    resized.write_with_encoder(encoder)?;

    Ok(EncodedBlob::new(
        general_purpose::STANDARD.encode(&jpeg_data),
        FRAME_MIME_TYPE,
    ))
}

/// Periodic still capture. Owning one of these is owning the frame timer:
/// dropping it is what cancels sampling.
#[derive(Debug)]
pub struct FrameSampler {
    interval: Duration,
    next_due: Instant,
    quality: u8,
    frames_sent: u64,
    frames_skipped: u64,
}

impl FrameSampler {
    pub fn new(frame_rate: f64, quality: u8, now: Instant) -> Self {
        let rate = if frame_rate.is_finite() && frame_rate > 0.0 {
            frame_rate
        } else {
            DEFAULT_FRAME_RATE
        };
        let interval = Duration::from_secs_f64(1.0 / rate);
        Self {
            interval,
            next_due: now + interval,
            quality,
            frames_sent: 0,
            frames_skipped: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_due
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Run one timer tick. Returns the encoded still, or None when the camera
    /// is not ready (skipped silently) or encoding failed.
    pub fn tick<S: FrameSource + ?Sized>(
        &mut self,
        now: Instant,
        source: &mut S,
    ) -> Option<EncodedBlob> {
        self.next_due += self.interval;
        if self.next_due <= now {
            // Fell behind (slow event loop); don't burst to catch up
            self.next_due = now + self.interval;
        }

        let Some(frame) = source.latest_frame() else {
            self.frames_skipped += 1;
            return None;
        };

        match encode_jpeg_frame(&frame, self.quality) {
            Ok(blob) => {
                self.frames_sent += 1;
                Some(blob)
            }
            Err(e) => {
                log::warn!("Failed to encode camera frame: {}", e);
                self.frames_skipped += 1;
                None
            }
        }
    }
}

/// Camera backed by a still image on disk that another tool keeps refreshing.
///
/// No path, a missing file or a half-written file all read as "not ready".
#[derive(Debug, Clone, Default)]
pub struct SnapshotCamera {
    path: Option<PathBuf>,
}

impl SnapshotCamera {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl FrameSource for SnapshotCamera {
    fn latest_frame(&mut self) -> Option<RgbImage> {
        let path = self.path.as_ref()?;
        match image::open(path) {
            Ok(img) => Some(img.to_rgb8()),
            Err(e) => {
                log::debug!("Camera snapshot {} not ready: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource(Option<RgbImage>);

    impl FrameSource for StaticSource {
        fn latest_frame(&mut self) -> Option<RgbImage> {
            self.0.clone()
        }
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        })
    }

    #[test]
    fn test_encode_resizes_to_wire_resolution() {
        let blob = encode_jpeg_frame(&gradient(1280, 720), 60).unwrap();
        assert_eq!(blob.mime_type, "image/jpeg");

        let bytes = general_purpose::STANDARD.decode(&blob.data).unwrap();
        assert!(bytes.starts_with(&[0xff, 0xd8, 0xff]));
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (640, 360));
    }

    #[test]
    fn test_tick_skips_when_camera_not_ready() {
        let start = Instant::now();
        let mut sampler = FrameSampler::new(1.0, 60, start);
        let mut source = StaticSource(None);

        assert!(sampler.tick(start + Duration::from_secs(1), &mut source).is_none());
        assert_eq!(sampler.frames_skipped(), 1);
        assert_eq!(sampler.frames_sent(), 0);
    }

    #[test]
    fn test_tick_sends_frame_and_advances_deadline() {
        let start = Instant::now();
        let mut sampler = FrameSampler::new(2.0, 60, start);
        assert_eq!(sampler.interval(), Duration::from_millis(500));
        assert!(!sampler.is_due(start));
        assert!(sampler.is_due(start + Duration::from_millis(500)));

        let mut source = StaticSource(Some(gradient(64, 36)));
        let blob = sampler.tick(start + Duration::from_millis(500), &mut source);
        assert!(blob.is_some());
        assert_eq!(sampler.frames_sent(), 1);
        assert_eq!(sampler.next_due(), start + Duration::from_millis(1000));
    }

    #[test]
    fn test_tick_does_not_burst_after_stall() {
        let start = Instant::now();
        let mut sampler = FrameSampler::new(1.0, 60, start);
        let late = start + Duration::from_secs(10);
        sampler.tick(late, &mut StaticSource(None));
        assert_eq!(sampler.next_due(), late + Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_frame_rate_falls_back_to_default() {
        let sampler = FrameSampler::new(0.0, 60, Instant::now());
        assert_eq!(sampler.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_snapshot_camera_without_path_is_not_ready() {
        assert!(SnapshotCamera::new(None).latest_frame().is_none());
        let missing = std::env::temp_dir().join("live-vision-chat-no-such-frame.jpg");
        assert!(SnapshotCamera::new(Some(missing)).latest_frame().is_none());
    }
}
