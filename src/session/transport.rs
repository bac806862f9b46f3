//! The narrow contract between the session and the realtime service.

use crate::api::types::EncodedBlob;
use crate::error::TransportError;

use super::EventSender;

/// Everything a transport needs to open a live session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectRequest {
    pub api_key: String,
    pub model: String,
    pub voice_name: String,
    pub system_instruction: String,
}

/// One inbound server message, already unpacked.
///
/// A single message may carry several of these at once; the session handles
/// them in field order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerMessage {
    /// Base64 PCM payloads (24 kHz mono, 16-bit LE)
    pub audio: Vec<String>,
    pub interrupted: bool,
    pub input_transcription: Option<String>,
    pub output_transcription: Option<String>,
    pub turn_complete: bool,
}

impl ServerMessage {
    pub fn is_empty(&self) -> bool {
        self == &ServerMessage::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connected and configured; media may flow
    Opened,
    Message(ServerMessage),
    Error(TransportError),
    /// Closed by the remote side
    Closed { code: u16, reason: String },
}

/// Handle to an open (or opening) realtime session.
pub trait Transport {
    fn send_realtime_input(&mut self, media: &EncodedBlob) -> Result<(), TransportError>;

    /// Tear the session down. Idempotent; never reports an error.
    fn close(&mut self);
}

/// Opens transports. Connecting is asynchronous: `connect` returns a handle at
/// once and the outcome arrives later as `SessionEvent::Transport` events tagged
/// with `generation`.
pub trait TransportConnector {
    fn connect(
        &self,
        request: ConnectRequest,
        generation: u64,
        events: EventSender,
    ) -> Result<Box<dyn Transport>, TransportError>;
}
