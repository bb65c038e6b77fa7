//! Boundary to the engine that performs the actual networking.
//!
//! # Responsibilities
//! - Define the [`Engine`] trait streams send through
//! - Provide [`EngineCallbacks`], the only way an engine reports back
//!
//! # Design Decisions
//! - Engine callbacks never run filter code directly; they enqueue onto the
//!   stream's delivery queue, so an engine may call them from any thread.
//! - Streams hold `Weak<dyn Engine>`; the application owns the engine.

pub mod loopback;

use std::fmt;

use bytes::Bytes;

use crate::error::StreamError;
use crate::headers::{HeaderContainer, RequestHeaders, RequestTrailers};
use crate::stream::event::{DeliveryQueue, StreamEvent};

pub use loopback::LoopbackEngine;

/// Engine-assigned identifier of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(u64);

impl StreamHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// The networking engine.
///
/// All methods must return promptly; results come back through the
/// [`EngineCallbacks`] handed to `start_stream`.
pub trait Engine: Send + Sync + 'static {
    fn start_stream(&self, callbacks: EngineCallbacks) -> StreamHandle;

    fn send_headers(&self, stream: StreamHandle, headers: RequestHeaders, end_stream: bool);

    fn send_data(&self, stream: StreamHandle, data: Bytes, end_stream: bool);

    fn send_trailers(&self, stream: StreamHandle, trailers: RequestTrailers);

    /// Reset the stream. A live stream answers with `on_cancel`.
    fn cancel(&self, stream: StreamHandle);
}

/// Inbound side of one stream, held by the engine.
///
/// Cloneable and callable from any thread. Calls after the stream has
/// finished are dropped.
#[derive(Clone)]
pub struct EngineCallbacks {
    queue: DeliveryQueue,
}

impl EngineCallbacks {
    pub(crate) fn new(queue: DeliveryQueue) -> Self {
        Self { queue }
    }

    pub fn on_headers(&self, headers: HeaderContainer, end_stream: bool) {
        self.push(StreamEvent::ResponseHeaders { headers, end_stream });
    }

    pub fn on_data(&self, data: Bytes, end_stream: bool) {
        self.push(StreamEvent::ResponseData { data, end_stream });
    }

    pub fn on_trailers(&self, trailers: HeaderContainer) {
        self.push(StreamEvent::ResponseTrailers(trailers));
    }

    /// Report a transport failure. `code` follows the engine's numeric error
    /// codes; a negative `attempt_count` means unknown.
    pub fn on_error(&self, code: i32, message: impl Into<String>, attempt_count: i32) {
        let error = StreamError::from_engine(code, message.into(), attempt_count);
        self.push(StreamEvent::Error(error));
    }

    pub fn on_cancel(&self) {
        self.push(StreamEvent::EngineCancel);
    }

    pub fn on_complete(&self) {
        self.push(StreamEvent::Complete);
    }

    fn push(&self, event: StreamEvent) {
        let kind = event.kind();
        if !self.queue.push(event) {
            tracing::trace!(event = kind, "Engine callback after stream finished");
        }
    }
}

impl fmt::Debug for EngineCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCallbacks").finish_non_exhaustive()
    }
}
