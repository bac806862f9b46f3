//! Worker thread owning one live WebSocket session

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tungstenite::Message;

use super::types::{Outbound, ParsedMessage};
use super::websocket::{
    connect_live_websocket, parse_server_message, send_live_setup, send_realtime_input,
    set_poll_timeout, LiveSocket, POLL_INTERVAL,
};
use crate::api::types::EncodedBlob;
use crate::error::TransportError;
use crate::session::{
    ConnectRequest, EventSender, SessionEvent, Transport, TransportConnector, TransportEvent,
};

/// How long the server gets to acknowledge the setup message
const SETUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Close code reported when the socket drops without a close frame
const ABNORMAL_CLOSURE: u16 = 1006;

/// Opens Gemini Live sessions, one worker thread per session.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveConnector;

impl TransportConnector for LiveConnector {
    fn connect(
        &self,
        request: ConnectRequest,
        generation: u64,
        events: EventSender,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let (outbound_tx, outbound_rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = LiveWorker {
            request,
            generation,
            events,
            outbound: outbound_rx,
            shutdown: shutdown.clone(),
        };
        std::thread::Builder::new()
            .name(format!("gemini-live-{}", generation))
            .spawn(move || worker.run())
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Box::new(LiveTransport {
            outbound: outbound_tx,
            shutdown,
        }))
    }
}

/// Session-side handle; the socket itself lives on the worker thread.
pub struct LiveTransport {
    outbound: Sender<Outbound>,
    shutdown: Arc<AtomicBool>,
}

impl Transport for LiveTransport {
    fn send_realtime_input(&mut self, media: &EncodedBlob) -> Result<(), TransportError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(TransportError::Send("session is closed".into()));
        }
        self.outbound
            .send(Outbound::Media(media.clone()))
            .map_err(|_| TransportError::Send("connection worker has stopped".into()))
    }

    fn close(&mut self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            let _ = self.outbound.send(Outbound::Close);
        }
    }
}

impl Drop for LiveTransport {
    fn drop(&mut self) {
        self.close();
    }
}

enum Exit {
    /// Local close requested; report nothing
    Cancelled,
    Event(TransportEvent),
}

struct LiveWorker {
    request: ConnectRequest,
    generation: u64,
    events: EventSender,
    outbound: Receiver<Outbound>,
    shutdown: Arc<AtomicBool>,
}

impl LiveWorker {
    fn run(self) {
        log::info!(
            "Connecting to Gemini Live (model {}, session {})",
            self.request.model,
            self.generation
        );

        let mut socket = match self.open() {
            Ok(socket) => socket,
            Err(Exit::Cancelled) => {
                log::debug!("Connection attempt {} cancelled", self.generation);
                return;
            }
            Err(Exit::Event(event)) => {
                self.emit(event);
                return;
            }
        };

        if !self.emit(TransportEvent::Opened) {
            let _ = socket.close(None);
            return;
        }
        log::info!("Gemini Live session {} open", self.generation);

        match self.pump(&mut socket) {
            Exit::Cancelled => {
                let _ = socket.close(None);
                let _ = socket.flush();
                log::info!("Gemini Live session {} closed", self.generation);
            }
            Exit::Event(event) => {
                let _ = socket.close(None);
                self.emit(event);
            }
        }
    }

    fn cancelled(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Returns false once nobody is listening anymore.
    fn emit(&self, event: TransportEvent) -> bool {
        self.events
            .send(SessionEvent::Transport {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    /// Connect, send setup and wait for the acknowledgement.
    fn open(&self) -> Result<LiveSocket, Exit> {
        let mut socket = connect_live_websocket(&self.request.api_key).map_err(|e| {
            Exit::Event(TransportEvent::Error(TransportError::Connect(e.to_string())))
        })?;

        if self.cancelled() {
            let _ = socket.close(None);
            return Err(Exit::Cancelled);
        }

        if let Err(e) = send_live_setup(&mut socket, &self.request) {
            let _ = socket.close(None);
            return Err(Exit::Event(TransportEvent::Error(TransportError::Setup(
                e.to_string(),
            ))));
        }

        if let Err(e) = set_poll_timeout(&mut socket, POLL_INTERVAL) {
            log::warn!("Failed to shorten socket read timeout: {}", e);
        }

        let setup_start = Instant::now();
        loop {
            if self.cancelled() {
                let _ = socket.close(None);
                return Err(Exit::Cancelled);
            }

            match socket.read() {
                Ok(Message::Text(msg)) => match parse_server_message(msg.as_str()) {
                    ParsedMessage::SetupComplete => return Ok(socket),
                    ParsedMessage::Error(error) => {
                        let _ = socket.close(None);
                        return Err(Exit::Event(TransportEvent::Error(
                            TransportError::Setup(error),
                        )));
                    }
                    _ => {}
                },
                Ok(Message::Binary(data)) => {
                    if let Ok(text) = std::str::from_utf8(&data) {
                        if parse_server_message(text) == ParsedMessage::SetupComplete {
                            return Ok(socket);
                        }
                    }
                }
                Ok(Message::Close(frame)) => {
                    let (code, reason) = close_details(frame);
                    return Err(Exit::Event(TransportEvent::Error(TransportError::Closed {
                        code,
                        reason,
                    })));
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e)) if is_timeout(e) => {
                    if setup_start.elapsed() > SETUP_TIMEOUT {
                        let _ = socket.close(None);
                        return Err(Exit::Event(TransportEvent::Error(TransportError::Setup(
                            "Setup timeout".into(),
                        ))));
                    }
                }
                Err(e) => {
                    return Err(Exit::Event(TransportEvent::Error(TransportError::Setup(
                        e.to_string(),
                    ))));
                }
            }
        }
    }

    /// Main loop: drain outbound media, then poll for one inbound message.
    fn pump(&self, socket: &mut LiveSocket) -> Exit {
        loop {
            if self.cancelled() {
                return Exit::Cancelled;
            }

            loop {
                match self.outbound.try_recv() {
                    Ok(Outbound::Media(blob)) => {
                        if let Err(e) = send_realtime_input(socket, &blob) {
                            return Exit::Event(TransportEvent::Error(TransportError::Send(
                                e.to_string(),
                            )));
                        }
                    }
                    Ok(Outbound::Close) | Err(TryRecvError::Disconnected) => {
                        return Exit::Cancelled
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }

            match socket.read() {
                Ok(Message::Text(msg)) => {
                    if let Some(exit) = self.dispatch(msg.as_str()) {
                        return exit;
                    }
                }
                Ok(Message::Binary(data)) => {
                    // Raw audio frames are not expected; only JSON payloads matter
                    if let Ok(text) = std::str::from_utf8(&data) {
                        if let Some(exit) = self.dispatch(text) {
                            return exit;
                        }
                    }
                }
                Ok(Message::Close(frame)) => {
                    let (code, reason) = close_details(frame);
                    log::info!("Server closed session: {} - {}", code, reason);
                    return Exit::Event(TransportEvent::Closed { code, reason });
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e)) if is_timeout(e) => {}
                Err(tungstenite::Error::ConnectionClosed)
                | Err(tungstenite::Error::AlreadyClosed) => {
                    return Exit::Event(TransportEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: "Connection closed".into(),
                    });
                }
                Err(e) => {
                    log::error!("Gemini Live read error: {}", e);
                    return Exit::Event(TransportEvent::Error(TransportError::Remote(
                        e.to_string(),
                    )));
                }
            }
        }
    }

    fn dispatch(&self, text: &str) -> Option<Exit> {
        match parse_server_message(text) {
            ParsedMessage::Content(message) => {
                if !self.emit(TransportEvent::Message(message)) {
                    return Some(Exit::Cancelled);
                }
                None
            }
            ParsedMessage::Error(error) => Some(Exit::Event(TransportEvent::Error(
                TransportError::Remote(error),
            ))),
            ParsedMessage::SetupComplete | ParsedMessage::Ignored => None,
        }
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

fn close_details(frame: Option<tungstenite::protocol::CloseFrame>) -> (u16, String) {
    match frame {
        Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_string()),
        // 1005: no status code present
        None => (1005, String::new()),
    }
}
