//! Gemini Live realtime session
//!
//! Bidirectional WebSocket to Gemini's native audio model: microphone PCM and
//! camera stills go up as realtime input, the model's voice and transcriptions
//! of both sides come back down.
//!
//! Each session gets its own worker thread that owns the socket. The session
//! talks to it through [`LiveTransport`] and hears back through
//! `SessionEvent::Transport` events.

pub mod types;
pub mod websocket;
pub mod worker;

pub use types::GEMINI_LIVE_MODEL;
pub use worker::{LiveConnector, LiveTransport};
