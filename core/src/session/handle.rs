//! Session thread handle
//!
//! Provides a handle for sending commands to the session thread, receiving
//! its events, and managing its lifecycle.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::warn;

use crate::transport::{Command, Event};

/// Handle to the session thread
///
/// Returned from [`SessionThread::spawn`](super::SessionThread::spawn).
/// Dropping the handle shuts the session down and joins the thread.
pub struct SessionHandle {
    /// Command sender (Option to allow explicit drop before join)
    pub(super) tx: Option<Sender<Command>>,

    pub(super) events: Receiver<Event>,

    /// Thread join handle
    pub(super) handle: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Queue a command. Returns `false` if the session thread has exited.
    pub fn send(&self, command: Command) -> bool {
        let Some(ref tx) = self.tx else {
            return false;
        };
        if tx.send(command).is_err() {
            warn!("Session thread disconnected");
            return false;
        }
        true
    }

    /// Next event, if one is ready
    pub fn try_event(&self) -> Option<Event> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next event
    pub fn event_timeout(&self, timeout: Duration) -> Option<Event> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Check if the session thread is still running
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        // Drop the sender first: the thread exits when its receive reports
        // Disconnected. Joining first would deadlock.
        drop(self.tx.take());

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
