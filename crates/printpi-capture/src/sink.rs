//! Outbound channel for session output.
//!
//! A [`ResultSink`] receives every prompt, error message, template chunk and
//! completion marker a session produces, in order. `push` is synchronous; a
//! front end whose transport is async drains a [`ChannelSink`] on its own
//! task.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Destination of session output.
pub trait ResultSink: Send + Sync {
    /// Deliver one payload. Payloads must reach the peer in call order.
    fn push(&self, bytes: Vec<u8>);

    /// Deliver a UTF-8 message.
    fn push_text(&self, text: &str) {
        self.push(text.as_bytes().to_vec());
    }

    /// Largest payload the transport accepts, when it reports one.
    fn max_payload(&self) -> Option<usize> {
        None
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Arc<S> {
    fn push(&self, bytes: Vec<u8>) {
        (**self).push(bytes);
    }

    fn max_payload(&self) -> Option<usize> {
        (**self).max_payload()
    }
}

/// Sink that forwards payloads to an unbounded channel.
///
/// Payloads pushed after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    max_payload: Option<usize>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                max_payload: None,
            },
            rx,
        )
    }

    /// Report a negotiated payload limit to the session.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = Some(max_payload);
        self
    }
}

impl ResultSink for ChannelSink {
    fn push(&self, bytes: Vec<u8>) {
        if self.tx.send(bytes).is_err() {
            tracing::debug!("Result channel closed, dropping payload");
        }
    }

    fn max_payload(&self) -> Option<usize> {
        self.max_payload
    }
}

/// In-memory sink that keeps every payload.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    payloads: Arc<Mutex<Vec<Vec<u8>>>>,
    max_payload: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = Some(max_payload);
        self
    }

    /// All payloads received so far.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Payloads decoded as UTF-8, lossily.
    pub fn messages(&self) -> Vec<String> {
        self.payloads()
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for RecordingSink {
    fn push(&self, bytes: Vec<u8>) {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bytes);
    }

    fn max_payload(&self) -> Option<usize> {
        self.max_payload
    }
}
