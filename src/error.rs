//! Error taxonomy for the realtime media session.
//!
//! Every error renders as a short message that can be shown to the user
//! as-is. Only best-effort resource release during cleanup is allowed to
//! swallow failures; everything here is meant to be surfaced.

use thiserror::Error;

/// Missing or unusable configuration. Fatal to a connection attempt and
/// always raised before any hardware is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("No Gemini API key configured (set GEMINI_API_KEY or gemini_api_key in the config file)")]
    MissingApiKey,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Microphone, camera or speaker could not be opened. Not retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("Media permission denied: {0}")]
    PermissionDenied(String),

    #[error("Media device unsupported: {0}")]
    Unsupported(String),

    #[error("Media device error: {0}")]
    Device(String),
}

/// Failure of the realtime transport, either while connecting or at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Server error: {0}")]
    Remote(String),

    #[error("Session closed: {code} - {reason}")]
    Closed { code: u16, reason: String },

    #[error("Send failed: {0}")]
    Send(String),
}

/// Inbound payload text was not valid base64.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed audio payload: {0}")]
pub struct DecodeError(pub String);

impl From<base64::DecodeError> for DecodeError {
    fn from(err: base64::DecodeError) -> Self {
        DecodeError(err.to_string())
    }
}

/// Decoded bytes do not form whole 16-bit PCM frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid PCM length: {len} bytes is not a multiple of {frame_bytes} ({channels} channel(s) x 2 bytes)")]
pub struct FormatError {
    pub len: usize,
    pub channels: u16,
    pub frame_bytes: usize,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Umbrella error returned by the lifecycle controller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("A session is already {0}")]
    AlreadyActive(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_message_carries_code_and_reason() {
        let err = TransportError::Closed {
            code: 1008,
            reason: "API key not valid".to_string(),
        };
        assert_eq!(err.to_string(), "Session closed: 1008 - API key not valid");
    }

    #[test]
    fn test_session_error_is_transparent() {
        let err: SessionError = ConfigError::MissingApiKey.into();
        assert_eq!(err.to_string(), ConfigError::MissingApiKey.to_string());
    }
}
