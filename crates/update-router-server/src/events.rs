//! Relay of accepted client events to downstream consumers.
//!
//! After `POST /event` stores a payload, the raw bytes are offered to a
//! bounded channel. Publishing never blocks a request: when the buffer is
//! full or the consumer is gone the payload is dropped with a warning.

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Default relay buffer size.
pub const DEFAULT_EVENT_BUFFER: usize = 1000;

/// Producer side of the relay.
#[derive(Debug, Clone)]
pub struct EventRelay {
    sender: mpsc::Sender<Bytes>,
}

impl EventRelay {
    /// Create a relay with room for `buffer` pending events.
    ///
    /// Returns `None` when `buffer` is zero, which disables relaying.
    pub fn channel(buffer: usize) -> Option<(Self, mpsc::Receiver<Bytes>)> {
        if buffer == 0 {
            return None;
        }
        let (sender, receiver) = mpsc::channel(buffer);
        Some((Self { sender }, receiver))
    }

    /// Offer an event without waiting. Returns whether it was queued.
    pub fn offer(&self, payload: Bytes) -> bool {
        match self.sender.try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(payload)) => {
                tracing::warn!(bytes = payload.len(), "Event buffer full, dropping event");
                false
            }
            Err(TrySendError::Closed(payload)) => {
                tracing::warn!(bytes = payload.len(), "Event consumer gone, dropping event");
                false
            }
        }
    }
}

/// Drain the relay, logging each event. Resolves to the number of events seen
/// once every [`EventRelay`] has been dropped.
pub fn spawn_consumer(mut receiver: mpsc::Receiver<Bytes>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut seen = 0u64;
        while let Some(payload) = receiver.recv().await {
            seen += 1;
            tracing::debug!(bytes = payload.len(), seen, "Relayed client event");
        }
        tracing::debug!(seen, "Event relay closed");
        seen
    })
}
