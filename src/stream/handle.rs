//! The application's handle to a running stream.

use std::fmt;
use std::sync::{Arc, Weak};

use bytes::Bytes;

use crate::engine::{Engine, StreamHandle};
use crate::error::ClientError;
use crate::headers::{RequestHeaders, RequestTrailers};
use crate::stream::event::{DeliveryQueue, StreamEvent};
use crate::stream::state::{AtomicStreamState, StreamState};

/// A started stream.
///
/// All methods take `&self` and may be called from any thread. Sends are
/// checked against the lifecycle before anything is queued; an illegal send
/// returns [`ClientError::InvalidState`] and has no effect.
pub struct Stream {
    handle: StreamHandle,
    engine: Weak<dyn Engine>,
    queue: DeliveryQueue,
    state: Arc<AtomicStreamState>,
}

impl Stream {
    pub(crate) fn new(
        handle: StreamHandle,
        engine: Weak<dyn Engine>,
        queue: DeliveryQueue,
        state: Arc<AtomicStreamState>,
    ) -> Self {
        Self {
            handle,
            engine,
            queue,
            state,
        }
    }

    pub fn id(&self) -> StreamHandle {
        self.handle
    }

    pub fn state(&self) -> StreamState {
        self.state.load()
    }

    /// Send request headers. With `end_stream` the request is complete.
    pub fn send_headers(
        &self,
        headers: RequestHeaders,
        end_stream: bool,
    ) -> Result<(), ClientError> {
        let next = if end_stream {
            StreamState::Closed
        } else {
            StreamState::HeadersSent
        };
        self.advance("send headers", StreamState::Created, next)?;
        self.enqueue(StreamEvent::SendHeaders { headers, end_stream });
        Ok(())
    }

    pub fn send_data(&self, data: impl Into<Bytes>) -> Result<(), ClientError> {
        self.advance("send data", StreamState::HeadersSent, StreamState::HeadersSent)?;
        self.enqueue(StreamEvent::SendData {
            data: data.into(),
            end_stream: false,
        });
        Ok(())
    }

    /// Send a final data chunk, closing the request side.
    pub fn close_with_data(&self, data: impl Into<Bytes>) -> Result<(), ClientError> {
        self.advance("close", StreamState::HeadersSent, StreamState::Closed)?;
        self.enqueue(StreamEvent::SendData {
            data: data.into(),
            end_stream: true,
        });
        Ok(())
    }

    /// Send trailers, closing the request side.
    pub fn close(&self, trailers: RequestTrailers) -> Result<(), ClientError> {
        self.advance("close", StreamState::HeadersSent, StreamState::Closed)?;
        self.enqueue(StreamEvent::SendTrailers(trailers));
        Ok(())
    }

    /// Cancel the stream. Idempotent; does nothing once the stream has finished.
    ///
    /// Events already queued stop reaching filters immediately. A filter
    /// callback that is running completes normally.
    pub fn cancel(&self) {
        if let Err(state) = self.state.finish(StreamState::Cancelled) {
            tracing::debug!(stream = %self.handle, ?state, "Cancel ignored, stream already finished");
            return;
        }
        if !self.queue.cancel() {
            return;
        }
        match self.engine.upgrade() {
            Some(engine) => engine.cancel(self.handle),
            None => tracing::debug!(stream = %self.handle, "Engine no longer running, cancel is local only"),
        }
    }

    fn advance(
        &self,
        operation: &'static str,
        from: StreamState,
        to: StreamState,
    ) -> Result<(), ClientError> {
        self.state.transition(from, to).map_err(|state| {
            tracing::debug!(stream = %self.handle, operation, ?state, "Rejected send");
            ClientError::InvalidState { operation, state }
        })
    }

    fn enqueue(&self, event: StreamEvent) {
        if !self.queue.push(event) {
            tracing::debug!(stream = %self.handle, "Stream driver has stopped, send dropped");
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("handle", &self.handle)
            .field("state", &self.state())
            .finish()
    }
}
