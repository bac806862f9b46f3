//! Config struct definition.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::{
    default_frame_rate, default_jpeg_quality, default_model, default_system_instruction,
    default_voice_name,
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub gemini_api_key: String,
    /// Live model id, without the `models/` prefix
    #[serde(default = "default_model")]
    pub model: String,
    /// Prebuilt voice for spoken replies
    #[serde(default = "default_voice_name")]
    pub voice_name: String,
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    /// Camera stills per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Still image refreshed by an external capture tool; acts as the camera
    #[serde(default)]
    pub camera_snapshot_path: Option<PathBuf>,
}

impl Config {
    /// The API key, if one is actually set.
    pub fn api_key(&self) -> Option<&str> {
        let key = self.gemini_api_key.trim();
        (!key.is_empty()).then_some(key)
    }
}
