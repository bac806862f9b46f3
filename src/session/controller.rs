//! Session lifecycle: connect, stream, react to the model, tear down

use std::time::Instant;

use super::media::{MediaDevices, MediaStream};
use super::runtime::NoticeSender;
use super::transcript::{Role, TranscriptBuffer, TranscriptLog, TranscriptionEntry};
use super::transport::{ConnectRequest, ServerMessage, Transport, TransportConnector, TransportEvent};
use super::{EventSender, SessionCommand, SessionEvent, SessionNotice, SessionState};
use crate::api::playback::{ChunkId, PlaybackScheduler};
use crate::api::realtime_audio::{decode_blob, AudioFrame, CapturePipeline};
use crate::api::types::EncodedBlob;
use crate::api::vision::FrameSampler;
use crate::config::Config;
use crate::error::{ConfigError, SessionError, TransportError};
use crate::upload::UploadedMedia;

/// Everything one connection attempt owns.
///
/// Hardware and network handles are only ever acquired into here and only
/// ever released by [`SessionController::cleanup`].
pub struct SessionContext {
    generation: u64,
    state: SessionState,
    transport: Option<Box<dyn Transport>>,
    media: Option<Box<dyn MediaStream>>,
    scheduler: Option<PlaybackScheduler>,
    sampler: Option<FrameSampler>,
    pipeline: CapturePipeline,
    transcript: TranscriptBuffer,
    user_speaking: bool,
    ai_speaking: bool,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            generation: 0,
            state: SessionState::Disconnected,
            transport: None,
            media: None,
            scheduler: None,
            sampler: None,
            pipeline: CapturePipeline::new(),
            transcript: TranscriptBuffer::default(),
            user_speaking: false,
            ai_speaking: false,
        }
    }
}

impl SessionContext {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn scheduler(&self) -> Option<&PlaybackScheduler> {
        self.scheduler.as_ref()
    }

    pub fn transcript(&self) -> &TranscriptBuffer {
        &self.transcript
    }

    pub fn is_user_speaking(&self) -> bool {
        self.user_speaking
    }

    pub fn is_ai_speaking(&self) -> bool {
        self.ai_speaking
    }

    /// True while any hardware or network handle is held.
    pub fn holds_resources(&self) -> bool {
        self.transport.is_some()
            || self.media.is_some()
            || self.scheduler.is_some()
            || self.sampler.is_some()
    }
}

pub struct SessionController {
    config: Config,
    devices: Box<dyn MediaDevices>,
    connector: Box<dyn TransportConnector>,
    events: EventSender,
    notices: NoticeSender,
    ctx: SessionContext,
    log: TranscriptLog,
}

impl SessionController {
    pub fn new(
        config: Config,
        devices: Box<dyn MediaDevices>,
        connector: Box<dyn TransportConnector>,
        events: EventSender,
        notices: NoticeSender,
    ) -> Self {
        Self {
            config,
            devices,
            connector,
            events,
            notices,
            ctx: SessionContext::default(),
            log: TranscriptLog::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.ctx.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn transcript_log(&self) -> &TranscriptLog {
        &self.log
    }

    /// When the loop must wake up for the next camera still, if sampling.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.ctx.sampler.as_ref().map(FrameSampler::next_due)
    }

    /// Begin a connection attempt.
    ///
    /// The credential check happens before any hardware is touched. Media and
    /// synchronous transport failures release whatever this attempt acquired
    /// and leave the session in `Error`. Success means `Connecting`; the
    /// transport's `Opened` event completes the transition.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.ctx.state {
            SessionState::Connecting => return Err(SessionError::AlreadyActive("connecting")),
            SessionState::Connected => return Err(SessionError::AlreadyActive("connected")),
            SessionState::Disconnected | SessionState::Error => {}
        }

        let api_key = self
            .config
            .api_key()
            .ok_or(ConfigError::MissingApiKey)?
            .to_string();

        // Anything still held from a failed attempt goes first
        self.release_resources();

        self.ctx.generation += 1;
        self.set_state(SessionState::Connecting);
        log::info!("Starting session {}", self.ctx.generation);

        let request = ConnectRequest {
            api_key,
            model: self.config.model.clone(),
            voice_name: self.config.voice_name.clone(),
            system_instruction: self.config.system_instruction.clone(),
        };

        if let Err(e) = self.acquire(request) {
            log::error!("Session {} failed to start: {}", self.ctx.generation, e);
            self.release_resources();
            self.set_state(SessionState::Error);
            return Err(e);
        }
        Ok(())
    }

    fn acquire(&mut self, request: ConnectRequest) -> Result<(), SessionError> {
        self.ctx.media = Some(self.devices.open_input(self.events.clone())?);
        let output = self.devices.open_output(self.events.clone())?;
        self.ctx.scheduler = Some(PlaybackScheduler::new(output));
        self.ctx.transport = Some(self.connector.connect(
            request,
            self.ctx.generation,
            self.events.clone(),
        )?);
        Ok(())
    }

    /// End the session. Safe from any state, any number of times.
    pub fn stop(&mut self) {
        self.cleanup();
    }

    /// Release every resource and settle in `Disconnected` with both speaking
    /// flags cleared. Partial transcript text is dropped; the log is kept.
    pub fn cleanup(&mut self) {
        if self.ctx.holds_resources() {
            log::info!("Cleaning up session {}", self.ctx.generation);
        }
        self.release_resources();
        self.ctx.transcript.clear();
        self.set_state(SessionState::Disconnected);
    }

    fn release_resources(&mut self) {
        self.ctx.sampler = None;
        if let Some(mut transport) = self.ctx.transport.take() {
            transport.close();
        }
        if let Some(mut media) = self.ctx.media.take() {
            media.stop();
        }
        if let Some(scheduler) = self.ctx.scheduler.take() {
            scheduler.close();
        }
        self.ctx.pipeline.reset();
        self.set_user_speaking(false);
        self.set_ai_speaking(false);
    }

    /// Apply one event. Returns false when the loop should exit.
    pub fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::AudioFrame(frame) => self.on_audio_frame(frame),
            SessionEvent::FrameTick => self.on_frame_tick(Instant::now()),
            SessionEvent::PlaybackEnded(id) => self.on_playback_ended(id),
            SessionEvent::Transport { generation, event } => {
                self.on_transport_event(generation, event)
            }
            SessionEvent::Command(command) => return self.on_command(command),
        }
        true
    }

    fn on_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Start => {
                if let Err(e) = self.start() {
                    self.alert(e.to_string());
                }
            }
            SessionCommand::Stop => self.stop(),
            SessionCommand::Upload(media) => self.share_upload(media),
            SessionCommand::Status => {
                let queued = self
                    .ctx
                    .scheduler
                    .as_ref()
                    .map(|s| s.registry().len())
                    .unwrap_or(0);
                self.alert(format!(
                    "Status: {} | transcript entries: {} | queued reply chunks: {}",
                    self.ctx.state,
                    self.log.len(),
                    queued
                ));
            }
            SessionCommand::Shutdown => {
                self.stop();
                return false;
            }
        }
        true
    }

    pub fn on_audio_frame(&mut self, frame: AudioFrame) {
        if self.ctx.state != SessionState::Connected {
            return;
        }
        let processed = self.ctx.pipeline.process(&frame);
        self.set_user_speaking(processed.speaking);
        self.send_media(&processed.blob);
    }

    pub fn on_frame_tick(&mut self, now: Instant) {
        if self.ctx.state != SessionState::Connected {
            return;
        }
        let (Some(sampler), Some(media)) = (self.ctx.sampler.as_mut(), self.ctx.media.as_mut())
        else {
            return;
        };
        if !sampler.is_due(now) {
            return;
        }
        if let Some(blob) = sampler.tick(now, media.as_mut()) {
            self.send_media(&blob);
        }
    }

    pub fn on_playback_ended(&mut self, id: ChunkId) {
        let Some(scheduler) = self.ctx.scheduler.as_mut() else {
            return;
        };
        if scheduler.on_chunk_ended(id) {
            self.set_ai_speaking(false);
        }
    }

    pub fn on_transport_event(&mut self, generation: u64, event: TransportEvent) {
        if generation != self.ctx.generation || self.ctx.transport.is_none() {
            log::debug!(
                "Ignoring transport event from session {} (current {})",
                generation,
                self.ctx.generation
            );
            return;
        }

        match event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::Message(message) => self.on_server_message(message),
            TransportEvent::Error(e) => self.fail(e),
            TransportEvent::Closed { code, reason } => {
                let err = TransportError::Closed { code, reason };
                if self.ctx.state == SessionState::Connecting {
                    self.fail(err);
                } else {
                    log::info!("{}", err);
                    self.alert(err.to_string());
                    self.cleanup();
                }
            }
        }
    }

    fn on_opened(&mut self) {
        if self.ctx.state != SessionState::Connecting {
            return;
        }
        if let Some(media) = self.ctx.media.as_mut() {
            if let Err(e) = media.start_capture() {
                log::error!("Failed to start capture: {}", e);
                self.alert(e.to_string());
                self.release_resources();
                self.set_state(SessionState::Error);
                return;
            }
        }
        self.ctx.pipeline.reset();
        self.ctx.sampler = Some(FrameSampler::new(
            self.config.frame_rate,
            self.config.jpeg_quality,
            Instant::now(),
        ));
        self.set_state(SessionState::Connected);
        log::info!("Session {} connected", self.ctx.generation);
    }

    /// Connect failures end in `Error`; failures of a running session report
    /// `Error` and then clean up to `Disconnected`.
    fn fail(&mut self, err: TransportError) {
        log::error!("Session {} transport failure: {}", self.ctx.generation, err);
        self.alert(err.to_string());
        match self.ctx.state {
            SessionState::Connecting => {
                self.release_resources();
                self.ctx.transcript.clear();
                self.set_state(SessionState::Error);
            }
            _ => {
                self.set_state(SessionState::Error);
                self.cleanup();
            }
        }
    }

    /// Handle one server message: audio, then interruption, then transcript
    /// fragments, then turn completion.
    pub fn on_server_message(&mut self, message: ServerMessage) {
        for payload in &message.audio {
            self.play_payload(payload);
        }

        if message.interrupted {
            if let Some(scheduler) = self.ctx.scheduler.as_mut() {
                scheduler.interrupt();
            }
            self.set_ai_speaking(false);
        }

        if let Some(text) = &message.input_transcription {
            self.ctx.transcript.push_input(text);
        }
        if let Some(text) = &message.output_transcription {
            self.ctx.transcript.push_output(text);
        }

        if message.turn_complete {
            for entry in self.ctx.transcript.take_turn() {
                self.append_entry(entry);
            }
        }
    }

    /// Malformed payloads are reported and dropped; the session carries on.
    fn play_payload(&mut self, payload: &str) {
        let Some(scheduler) = self.ctx.scheduler.as_mut() else {
            return;
        };
        let result = decode_blob(payload)
            .map_err(SessionError::from)
            .and_then(|bytes| scheduler.enqueue(&bytes).map_err(SessionError::from));
        match result {
            Ok(_) => self.set_ai_speaking(true),
            Err(e) => {
                log::warn!("Dropping reply audio chunk: {}", e);
                self.alert(e.to_string());
            }
        }
    }

    /// Log an upload in the transcript and, when live and supported, forward
    /// it to the model.
    pub fn share_upload(&mut self, media: UploadedMedia) {
        let entry = TranscriptionEntry::new(Role::User, media.entry_text())
            .with_file(media.metadata());
        self.append_entry(entry);

        if self.ctx.state == SessionState::Connected && media.is_forwardable() {
            log::info!("Forwarding {} ({}) to the model", media.name, media.mime_type);
            self.send_media(&media.to_blob());
        } else if media.is_forwardable() {
            log::debug!("Not connected; {} kept in transcript only", media.name);
        }
    }

    fn send_media(&mut self, blob: &EncodedBlob) {
        let Some(transport) = self.ctx.transport.as_mut() else {
            return;
        };
        // A dead transport reports itself through its own events
        if let Err(e) = transport.send_realtime_input(blob) {
            log::warn!("Failed to send {}: {}", blob.mime_type, e);
        }
    }

    fn append_entry(&mut self, entry: TranscriptionEntry) {
        self.log.push(entry.clone());
        self.notify(SessionNotice::Transcript(entry));
    }

    fn set_state(&mut self, state: SessionState) {
        if self.ctx.state != state {
            log::debug!("Session state {} -> {}", self.ctx.state, state);
            self.ctx.state = state;
            self.notify(SessionNotice::StateChanged(state));
        }
    }

    fn set_user_speaking(&mut self, speaking: bool) {
        if self.ctx.user_speaking != speaking {
            self.ctx.user_speaking = speaking;
            self.notify(SessionNotice::UserSpeaking(speaking));
        }
    }

    fn set_ai_speaking(&mut self, speaking: bool) {
        if self.ctx.ai_speaking != speaking {
            self.ctx.ai_speaking = speaking;
            self.notify(SessionNotice::AiSpeaking(speaking));
        }
    }

    fn alert(&self, message: String) {
        self.notify(SessionNotice::Alert(message));
    }

    fn notify(&self, notice: SessionNotice) {
        // Nobody listening is fine
        let _ = self.notices.send(notice);
    }
}
