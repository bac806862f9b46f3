//! The single-threaded event loop driving a session

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Instant;

use super::{EventReceiver, SessionController, SessionEvent, SessionNotice};

pub type NoticeSender = mpsc::Sender<SessionNotice>;
pub type NoticeReceiver = mpsc::Receiver<SessionNotice>;

/// Apply events to the controller until a shutdown command arrives.
///
/// The frame-sampling timer is folded into the wait: when the controller has a
/// deadline, the loop waits at most until then and injects a `FrameTick`.
pub fn run_event_loop(mut controller: SessionController, events: EventReceiver) {
    log::debug!("Session event loop started");

    loop {
        let event = match controller.next_deadline() {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match events.recv_timeout(timeout) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout) => SessionEvent::FrameTick,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match events.recv() {
                Ok(event) => event,
                Err(_) => break,
            },
        };

        if !controller.handle_event(event) {
            break;
        }
    }

    controller.stop();
    log::debug!("Session event loop finished");
}
