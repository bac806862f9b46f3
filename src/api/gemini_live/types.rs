//! Wire types for the Gemini Live BidiGenerateContent stream

use serde::Deserialize;

/// Model for live conversation (native audio in, native audio out)
pub const GEMINI_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-12-2025";

/// Top-level server message. Only the fields the session uses are modelled;
/// everything else is ignored.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub go_away: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
    #[serde(default)]
    pub turn_complete: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub inline_data: Option<InlineData>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub data: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

/// What the worker makes of one text frame.
#[derive(Debug, PartialEq)]
pub enum ParsedMessage {
    SetupComplete,
    Content(crate::session::ServerMessage),
    Error(String),
    /// Valid but irrelevant (usage metadata, tool calls, go-away...)
    Ignored,
}

/// Messages from the session handle to the worker thread
#[derive(Debug)]
pub enum Outbound {
    Media(crate::api::types::EncodedBlob),
    Close,
}
