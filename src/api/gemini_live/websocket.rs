//! WebSocket connection and message codec for the Gemini Live API

use anyhow::Result;
use native_tls::TlsStream;
use std::net::TcpStream;
use std::time::Duration;
use tungstenite::WebSocket;

use super::types::{LiveServerMessage, ParsedMessage};
use crate::api::types::EncodedBlob;
use crate::session::{ConnectRequest, ServerMessage};

pub type LiveSocket = WebSocket<TlsStream<TcpStream>>;

const LIVE_WS_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Read timeout once the session is running. Short so the worker can
/// interleave outbound media and notice shutdown quickly.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Create TLS WebSocket connection to Gemini Live API
pub fn connect_live_websocket(api_key: &str) -> Result<LiveSocket> {
    let ws_url = format!("{}?key={}", LIVE_WS_ENDPOINT, api_key);

    let url = url::Url::parse(&ws_url)?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("No host in URL"))?;
    let port = url.port_or_known_default().unwrap_or(443);

    use std::net::ToSocketAddrs;
    let addr = format!("{}:{}", host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve hostname: {}", host))?;

    let tcp_stream = TcpStream::connect_timeout(&addr, Duration::from_secs(10))?;
    tcp_stream.set_read_timeout(Some(Duration::from_secs(30)))?;
    tcp_stream.set_write_timeout(Some(Duration::from_secs(30)))?;
    tcp_stream.set_nodelay(true)?;

    let connector = native_tls::TlsConnector::new()?;
    let tls_stream = connector.connect(host, tcp_stream)?;

    let (socket, _response) = tungstenite::client::client(&ws_url, tls_stream)?;

    Ok(socket)
}

/// Switch the underlying TCP stream to short polling reads.
pub fn set_poll_timeout(socket: &mut LiveSocket, timeout: Duration) -> Result<()> {
    socket.get_mut().get_mut().set_read_timeout(Some(timeout))?;
    Ok(())
}

/// Setup message: audio responses in the configured voice, with both sides of
/// the conversation transcribed.
pub fn build_setup_message(request: &ConnectRequest) -> serde_json::Value {
    let mut setup = serde_json::json!({
        "setup": {
            "model": format!("models/{}", request.model),
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": {
                            "voiceName": request.voice_name
                        }
                    }
                }
            },
            "inputAudioTranscription": {},
            "outputAudioTranscription": {}
        }
    });

    if !request.system_instruction.trim().is_empty() {
        setup["setup"]["systemInstruction"] = serde_json::json!({
            "parts": [{
                "text": request.system_instruction
            }]
        });
    }

    setup
}

pub fn send_live_setup(socket: &mut LiveSocket, request: &ConnectRequest) -> Result<()> {
    let msg_str = build_setup_message(request).to_string();
    socket.write(tungstenite::Message::Text(msg_str.into()))?;
    socket.flush()?;
    Ok(())
}

/// Envelope for one realtime media chunk (audio frame, camera still, upload)
pub fn build_realtime_input(media: &EncodedBlob) -> serde_json::Value {
    serde_json::json!({
        "realtime_input": {
            "media_chunks": [{
                "mime_type": media.mime_type,
                "data": media.data
            }]
        }
    })
}

pub fn send_realtime_input(socket: &mut LiveSocket, media: &EncodedBlob) -> Result<()> {
    let msg = build_realtime_input(media);
    socket.write(tungstenite::Message::Text(msg.to_string().into()))?;
    socket.flush()?;
    Ok(())
}

/// Classify one inbound text frame.
pub fn parse_server_message(msg: &str) -> ParsedMessage {
    let parsed: LiveServerMessage = match serde_json::from_str(msg) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("Ignoring unparseable server message: {}", e);
            return ParsedMessage::Ignored;
        }
    };

    if let Some(error) = parsed.error {
        return ParsedMessage::Error(error_message(&error));
    }
    if parsed.setup_complete.is_some() {
        return ParsedMessage::SetupComplete;
    }
    if parsed.go_away.is_some() {
        log::warn!("Server announced it will close the session soon");
    }

    let Some(content) = parsed.server_content else {
        return ParsedMessage::Ignored;
    };

    let audio = content
        .model_turn
        .map(|turn| {
            turn.parts
                .into_iter()
                .filter_map(|p| p.inline_data)
                .filter(|d| {
                    d.mime_type
                        .as_deref()
                        .map(|m| m.starts_with("audio/"))
                        .unwrap_or(true)
                })
                .map(|d| d.data)
                .filter(|d| !d.is_empty())
                .collect()
        })
        .unwrap_or_default();

    // Don't trim: leading spaces are word separators between fragments
    let message = ServerMessage {
        audio,
        interrupted: content.interrupted,
        input_transcription: content
            .input_transcription
            .map(|t| t.text)
            .filter(|t| !t.is_empty()),
        output_transcription: content
            .output_transcription
            .map(|t| t.text)
            .filter(|t| !t.is_empty()),
        turn_complete: content.turn_complete,
    };

    if message.is_empty() {
        ParsedMessage::Ignored
    } else {
        ParsedMessage::Content(message)
    }
}

fn error_message(error: &serde_json::Value) -> String {
    error
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ConnectRequest {
        ConnectRequest {
            api_key: "key".into(),
            model: "gemini-test".into(),
            voice_name: "Orus".into(),
            system_instruction: "Be brief.".into(),
        }
    }

    #[test]
    fn test_setup_requests_audio_and_both_transcriptions() {
        let setup = build_setup_message(&request());
        let s = &setup["setup"];
        assert_eq!(s["model"], "models/gemini-test");
        assert_eq!(s["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            s["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Orus"
        );
        assert!(s["inputAudioTranscription"].is_object());
        assert!(s["outputAudioTranscription"].is_object());
        assert_eq!(s["systemInstruction"]["parts"][0]["text"], "Be brief.");
    }

    #[test]
    fn test_setup_omits_blank_instruction() {
        let mut req = request();
        req.system_instruction = "  ".into();
        let setup = build_setup_message(&req);
        assert!(setup["setup"].get("systemInstruction").is_none());
    }

    #[test]
    fn test_realtime_input_envelope() {
        let msg = build_realtime_input(&EncodedBlob::new("AAAA", "audio/pcm;rate=16000"));
        let chunk = &msg["realtime_input"]["media_chunks"][0];
        assert_eq!(chunk["mime_type"], "audio/pcm;rate=16000");
        assert_eq!(chunk["data"], "AAAA");
    }

    #[test]
    fn test_parse_full_content_message() {
        let raw = r#"{"serverContent":{
            "modelTurn":{"parts":[{"inlineData":{"mimeType":"audio/pcm;rate=24000","data":"AQI="}},{"text":"ignored"}]},
            "interrupted":true,
            "inputTranscription":{"text":"hi"},
            "outputTranscription":{"text":" there"},
            "turnComplete":true}}"#;

        let ParsedMessage::Content(m) = parse_server_message(raw) else {
            panic!("expected content");
        };
        assert_eq!(m.audio, vec!["AQI=".to_string()]);
        assert!(m.interrupted);
        assert_eq!(m.input_transcription.as_deref(), Some("hi"));
        assert_eq!(m.output_transcription.as_deref(), Some(" there"));
        assert!(m.turn_complete);
    }

    #[test]
    fn test_parse_setup_complete_and_error() {
        assert_eq!(
            parse_server_message(r#"{"setupComplete":{}}"#),
            ParsedMessage::SetupComplete
        );
        assert_eq!(
            parse_server_message(r#"{"error":{"code":400,"message":"bad model"}}"#),
            ParsedMessage::Error("bad model".into())
        );
    }

    #[test]
    fn test_parse_ignores_noise() {
        assert_eq!(parse_server_message("not json"), ParsedMessage::Ignored);
        assert_eq!(
            parse_server_message(r#"{"usageMetadata":{"totalTokenCount":5}}"#),
            ParsedMessage::Ignored
        );
        assert_eq!(
            parse_server_message(r#"{"serverContent":{"outputTranscription":{"text":""}}}"#),
            ParsedMessage::Ignored
        );
    }
}
