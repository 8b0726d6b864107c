//! A mock, useful to exercise the acquisition loop without an actual
//! serial device attached.
//!
//! The device is scripted from the outside while the supervisor reads
//! from it: tests queue lines, read failures and open failures, and the
//! supervisor cannot tell the difference from a real port.

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::source::SourceError;

/// What the scripted device yields next.
#[derive(Debug)]
enum MockEvent {
    /// A line, terminator already stripped.
    Line(String),

    /// Fail the in-flight read.
    ReadError(String),
}

/// A scripted in-memory line source.
///
/// Clones share the same script, so a test keeps one handle to feed
/// the device while the supervisor owns another.
#[derive(Debug, Clone)]
pub struct MockDevice {
    inner: Arc<MockInner>,
}

#[derive(Debug)]
struct MockInner {
    name: String,

    /// Scripted failures for upcoming open attempts, consumed front
    /// first. An empty queue means opening succeeds.
    open_failures: Mutex<VecDeque<String>>,

    event_tx: mpsc::UnboundedSender<MockEvent>,

    /// Only one connection is ever open at a time, so the reader side
    /// is shared between successive connections instead of being
    /// handed over.
    events: AsyncMutex<mpsc::UnboundedReceiver<MockEvent>>,
}

impl MockDevice {
    /// A new scripted device. Opens succeed until told otherwise.
    pub fn new(name: &str) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(MockInner {
                name: name.into(),
                open_failures: Mutex::new(VecDeque::new()),
                event_tx,
                events: AsyncMutex::new(event_rx),
            }),
        }
    }

    /// Make the next open attempt fail with `problem`.
    /// Calling this repeatedly queues one failure per call.
    pub fn fail_next_open(&self, problem: &str) {
        self.inner
            .open_failures
            .lock()
            .expect("Mock script lock should not be poisoned")
            .push_back(problem.into());
    }

    /// Queue a line for the supervisor to read.
    pub fn send_line(&self, line: &str) {
        // The supervisor dropping its end is not the test's problem.
        let _ = self.inner.event_tx.send(MockEvent::Line(line.into()));
    }

    /// Queue a read failure.
    pub fn send_read_error(&self, problem: &str) {
        let _ = self
            .inner
            .event_tx
            .send(MockEvent::ReadError(problem.into()));
    }

    pub(crate) fn try_open(&self) -> Result<(), SourceError> {
        let scripted = self
            .inner
            .open_failures
            .lock()
            .expect("Mock script lock should not be poisoned")
            .pop_front();

        match scripted {
            Some(problem) => Err(SourceError::Mock(problem)),
            None => Ok(()),
        }
    }

    pub(crate) async fn next_line(&self) -> Result<String, SourceError> {
        let mut events = self.inner.events.lock().await;

        match events.recv().await {
            Some(MockEvent::Line(line)) => Ok(line),
            Some(MockEvent::ReadError(problem)) => Err(SourceError::Mock(problem)),
            None => Err(SourceError::Disconnected),
        }
    }

    pub(crate) fn greeting(&self) -> String {
        format!("Using mock device {}", self.inner.name)
    }
}

impl Display for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mock: {}", self.inner.name)
    }
}
