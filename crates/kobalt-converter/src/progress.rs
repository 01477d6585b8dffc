//! Ordered progress delivery to the connected client.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use kobalt_models::{ProgressEvent, ProgressStatus};

/// Sending half of a job's progress channel.
///
/// Events arrive at the receiver in emit order. Once a terminal event has
/// been emitted every later event is dropped, and progress values never go
/// backwards. A vanished receiver turns `emit` into a no-op.
#[derive(Debug)]
pub struct ProgressStream {
    tx: mpsc::Sender<ProgressEvent>,
    last_progress: AtomicU8,
    terminated: AtomicBool,
    disconnected: AtomicBool,
}

impl ProgressStream {
    /// Create a stream with room for `buffer` undelivered events.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let stream = Self {
            tx,
            last_progress: AtomicU8::new(0),
            terminated: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        };
        (stream, rx)
    }

    /// Deliver one event. Returns `false` when it was not delivered.
    pub async fn emit(&self, mut event: ProgressEvent) -> bool {
        if self.terminated.load(Ordering::Acquire) {
            debug!(status = event.status.as_str(), "Dropping event after terminal event");
            return false;
        }
        if event.is_terminal() {
            self.terminated.store(true, Ordering::Release);
        }

        if event.status == ProgressStatus::Progress {
            if let Some(value) = event.progress {
                let previous = self.last_progress.fetch_max(value, Ordering::AcqRel);
                event.progress = Some(value.max(previous));
            }
        }

        if self.disconnected.load(Ordering::Acquire) {
            return false;
        }

        if self.tx.send(event).await.is_err() {
            if !self.disconnected.swap(true, Ordering::AcqRel) {
                warn!("Client disconnected, dropping further progress events");
            }
            return false;
        }

        true
    }

    /// True once the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.disconnected.load(Ordering::Acquire) || self.tx.is_closed()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}
