//! Realtime media session
//!
//! One event-loop thread owns the [`SessionController`]. Hardware callbacks,
//! the transport worker and the front end never touch session state directly;
//! they post [`SessionEvent`]s and the loop applies them one at a time.

mod controller;
mod media;
mod runtime;
mod transcript;
mod transport;

use std::sync::mpsc;

pub use controller::{SessionContext, SessionController};
pub use media::{CpalMediaDevices, MediaDevices, MediaStream};
pub use runtime::{run_event_loop, NoticeReceiver, NoticeSender};
pub use transcript::{FileMetadata, Role, TranscriptBuffer, TranscriptLog, TranscriptionEntry};
pub use transport::{ConnectRequest, ServerMessage, Transport, TransportConnector, TransportEvent};

use crate::api::playback::ChunkId;
use crate::api::realtime_audio::AudioFrame;
use crate::upload::UploadedMedia;

/// Everything the event loop reacts to.
#[derive(Debug)]
pub enum SessionEvent {
    /// A full 16 kHz microphone frame
    AudioFrame(AudioFrame),
    /// The frame sampling deadline passed
    FrameTick,
    /// A scheduled reply chunk played to its end
    PlaybackEnded(ChunkId),
    /// Something happened on the connection opened as `generation`
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    Command(SessionCommand),
}

pub type EventSender = mpsc::Sender<SessionEvent>;
pub type EventReceiver = mpsc::Receiver<SessionEvent>;

/// Requests from the front end.
#[derive(Debug)]
pub enum SessionCommand {
    Start,
    Stop,
    Upload(UploadedMedia),
    Status,
    Shutdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// What the front end gets to observe.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionNotice {
    StateChanged(SessionState),
    UserSpeaking(bool),
    AiSpeaking(bool),
    Transcript(TranscriptionEntry),
    /// Short-lived user-visible message (errors, status)
    Alert(String),
}
