//! Config Default implementation.

use super::config_struct::Config;
use crate::api::gemini_live::GEMINI_LIVE_MODEL;
use crate::api::vision::{DEFAULT_FRAME_RATE, DEFAULT_JPEG_QUALITY};

pub const DEFAULT_VOICE_NAME: &str = "Orus";

const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a friendly visual assistant who can see \
through the user's camera. Identify the objects, text and scenes you are shown, answer \
questions about them, and keep spoken replies short and natural. If the image is unclear, \
say so and ask the user to adjust the camera.";

pub fn default_model() -> String {
    GEMINI_LIVE_MODEL.to_string()
}

pub fn default_voice_name() -> String {
    DEFAULT_VOICE_NAME.to_string()
}

pub fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

pub fn default_frame_rate() -> f64 {
    DEFAULT_FRAME_RATE
}

pub fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            model: default_model(),
            voice_name: default_voice_name(),
            system_instruction: default_system_instruction(),
            frame_rate: default_frame_rate(),
            jpeg_quality: default_jpeg_quality(),
            camera_snapshot_path: None,
        }
    }
}
