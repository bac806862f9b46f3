//! In-memory stand-ins for audio hardware, camera and the live transport

use image::RgbImage;
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::playback::{AudioOutput, ChunkId};
use crate::api::types::{EncodedBlob, PlaybackChunk};
use crate::api::vision::FrameSource;
use crate::error::{MediaError, TransportError};
use crate::session::{
    ConnectRequest, EventSender, MediaDevices, MediaStream, Transport, TransportConnector,
};

#[derive(Default)]
struct OutputState {
    time: f64,
    scheduled: Vec<(ChunkId, f64)>,
    stopped: Vec<ChunkId>,
    closed: bool,
}

/// Output device with a hand-driven clock.
pub struct FakeOutput {
    state: Rc<RefCell<OutputState>>,
}

/// Test-side view of a [`FakeOutput`].
#[derive(Clone)]
pub struct OutputProbe {
    state: Rc<RefCell<OutputState>>,
}

impl FakeOutput {
    pub fn new() -> (FakeOutput, OutputProbe) {
        let state = Rc::new(RefCell::new(OutputState::default()));
        (
            FakeOutput {
                state: state.clone(),
            },
            OutputProbe { state },
        )
    }
}

impl AudioOutput for FakeOutput {
    fn current_time(&self) -> f64 {
        self.state.borrow().time
    }

    fn schedule(&mut self, id: ChunkId, _chunk: &PlaybackChunk, start_time: f64) {
        self.state.borrow_mut().scheduled.push((id, start_time));
    }

    fn stop(&mut self, id: ChunkId) {
        self.state.borrow_mut().stopped.push(id);
    }

    fn close(&mut self) {
        self.state.borrow_mut().closed = true;
    }
}

impl OutputProbe {
    pub fn set_time(&self, time: f64) {
        self.state.borrow_mut().time = time;
    }

    pub fn scheduled(&self) -> Vec<(ChunkId, f64)> {
        self.state.borrow().scheduled.clone()
    }

    pub fn stopped(&self) -> Vec<ChunkId> {
        self.state.borrow().stopped.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

#[derive(Default)]
struct DevicesState {
    inputs_opened: usize,
    inputs_stopped: usize,
    capture_started: bool,
    fail_input: Option<MediaError>,
    fail_output: Option<MediaError>,
    fail_capture: Option<MediaError>,
    frame: Option<RgbImage>,
    output: Option<OutputProbe>,
}

/// Microphone, camera and speakers that always cooperate unless told not to.
#[derive(Clone, Default)]
pub struct FakeDevices {
    state: Rc<RefCell<DevicesState>>,
}

impl FakeDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_input(&self, err: MediaError) {
        self.state.borrow_mut().fail_input = Some(err);
    }

    pub fn fail_output(&self, err: MediaError) {
        self.state.borrow_mut().fail_output = Some(err);
    }

    pub fn fail_capture(&self, err: MediaError) {
        self.state.borrow_mut().fail_capture = Some(err);
    }

    pub fn set_frame(&self, frame: RgbImage) {
        self.state.borrow_mut().frame = Some(frame);
    }

    pub fn inputs_opened(&self) -> usize {
        self.state.borrow().inputs_opened
    }

    pub fn inputs_stopped(&self) -> usize {
        self.state.borrow().inputs_stopped
    }

    pub fn capture_started(&self) -> bool {
        self.state.borrow().capture_started
    }

    /// Probe for the most recently opened output.
    pub fn output_probe(&self) -> OutputProbe {
        self.state
            .borrow()
            .output
            .clone()
            .expect("no output opened yet")
    }
}

impl MediaDevices for FakeDevices {
    fn open_input(&mut self, _events: EventSender) -> Result<Box<dyn MediaStream>, MediaError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.fail_input.clone() {
            return Err(err);
        }
        state.inputs_opened += 1;
        Ok(Box::new(FakeStream {
            state: self.state.clone(),
            stopped: false,
        }))
    }

    fn open_output(&mut self, _events: EventSender) -> Result<Box<dyn AudioOutput>, MediaError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.fail_output.clone() {
            return Err(err);
        }
        let (output, probe) = FakeOutput::new();
        state.output = Some(probe);
        Ok(Box::new(output))
    }
}

struct FakeStream {
    state: Rc<RefCell<DevicesState>>,
    stopped: bool,
}

impl FrameSource for FakeStream {
    fn latest_frame(&mut self) -> Option<RgbImage> {
        self.state.borrow().frame.clone()
    }
}

impl MediaStream for FakeStream {
    fn start_capture(&mut self) -> Result<(), MediaError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.fail_capture.clone() {
            return Err(err);
        }
        state.capture_started = true;
        Ok(())
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.state.borrow_mut().inputs_stopped += 1;
        }
    }
}

#[derive(Default)]
struct TransportState {
    sent: Vec<EncodedBlob>,
    closed: bool,
}

/// Test-side view of one fake transport.
#[derive(Clone)]
pub struct TransportProbe {
    state: Rc<RefCell<TransportState>>,
}

impl TransportProbe {
    pub fn sent(&self) -> Vec<EncodedBlob> {
        self.state.borrow().sent.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

struct FakeTransport {
    state: Rc<RefCell<TransportState>>,
}

impl Transport for FakeTransport {
    fn send_realtime_input(&mut self, media: &EncodedBlob) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(TransportError::Send("closed".into()));
        }
        state.sent.push(media.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.state.borrow_mut().closed = true;
    }
}

#[derive(Default)]
struct ConnectorState {
    requests: Vec<(ConnectRequest, u64)>,
    transports: Vec<TransportProbe>,
}

/// Records connection attempts; the test drives the resulting events by hand.
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Rc<RefCell<ConnectorState>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_count(&self) -> usize {
        self.state.borrow().requests.len()
    }

    pub fn last_request(&self) -> Option<ConnectRequest> {
        self.state.borrow().requests.last().map(|(r, _)| r.clone())
    }

    /// Probe for the `index`th transport handed out.
    pub fn transport(&self, index: usize) -> TransportProbe {
        self.state.borrow().transports[index].clone()
    }
}

impl TransportConnector for FakeConnector {
    fn connect(
        &self,
        request: ConnectRequest,
        generation: u64,
        _events: EventSender,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let transport_state = Rc::new(RefCell::new(TransportState::default()));
        let mut state = self.state.borrow_mut();
        state.requests.push((request, generation));
        state.transports.push(TransportProbe {
            state: transport_state.clone(),
        });
        Ok(Box::new(FakeTransport {
            state: transport_state,
        }))
    }
}
