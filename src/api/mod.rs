pub mod gemini_live;
pub mod playback;
pub mod realtime_audio;
pub mod types;
pub mod vision;
