//! Stream lifecycle state.
//!
//! # Responsibilities
//! - Track where the application is in the send sequence
//! - Reject illegal sends before anything is enqueued
//! - Record how the stream ended
//!
//! ```text
//! Created ──► HeadersSent ──► Closed ──► Completed
//!    │             │            │
//!    └─────────────┴────────────┴──► Cancelled | Errored
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a stream.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Created = 0,
    HeadersSent = 1,
    /// The application has sent its end of stream; the response may still be arriving.
    Closed = 2,
    Completed = 3,
    Cancelled = 4,
    Errored = 5,
}

impl From<u8> for StreamState {
    fn from(val: u8) -> Self {
        match val {
            1 => StreamState::HeadersSent,
            2 => StreamState::Closed,
            3 => StreamState::Completed,
            4 => StreamState::Cancelled,
            5 => StreamState::Errored,
            _ => StreamState::Created,
        }
    }
}

impl StreamState {
    /// No further notifications will be delivered.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Cancelled | StreamState::Errored
        )
    }
}

/// Shared between the [`Stream`](crate::stream::Stream) handle and its driver.
#[derive(Debug)]
pub(crate) struct AtomicStreamState(AtomicU8);

impl AtomicStreamState {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(StreamState::Created as u8))
    }

    pub(crate) fn load(&self) -> StreamState {
        StreamState::from(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`; on failure returns the actual state.
    pub(crate) fn transition(&self, from: StreamState, to: StreamState) -> Result<(), StreamState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(StreamState::from)
    }

    /// Move to `to` unless already terminal; returns the previous state on success.
    pub(crate) fn finish(&self, to: StreamState) -> Result<StreamState, StreamState> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if StreamState::from(current).is_terminal() {
                    None
                } else {
                    Some(to as u8)
                }
            })
            .map(StreamState::from)
            .map_err(StreamState::from)
    }

    /// Record how the driver ended the stream, overriding an earlier terminal state.
    pub(crate) fn store(&self, state: StreamState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
