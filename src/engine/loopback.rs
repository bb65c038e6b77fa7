//! In-process engine that echoes requests back.
//!
//! # Responsibilities
//! - Answer each request with `:status 200` and its non-pseudo headers
//! - Echo data and trailers as they arrive
//! - Report completion once the request side ends
//!
//! Used by the command-line tool and the integration tests; nothing leaves the
//! process.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;

use crate::engine::{Engine, EngineCallbacks, StreamHandle};
use crate::headers::{HeaderContainer, Headers, RequestHeaders, RequestTrailers};

#[derive(Debug)]
pub struct LoopbackEngine {
    streams: DashMap<StreamHandle, EngineCallbacks>,
    next_handle: AtomicU64,
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self {
            streams: DashMap::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Streams that have started and not yet ended.
    pub fn active_streams(&self) -> usize {
        self.streams.len()
    }

    fn callbacks(&self, stream: StreamHandle) -> Option<EngineCallbacks> {
        let callbacks = self.streams.get(&stream).map(|entry| entry.value().clone());
        if callbacks.is_none() {
            tracing::debug!(stream = %stream, "Loopback engine has no such stream");
        }
        callbacks
    }

    fn complete(&self, stream: StreamHandle) {
        if let Some((_, callbacks)) = self.streams.remove(&stream) {
            callbacks.on_complete();
        }
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for LoopbackEngine {
    fn start_stream(&self, callbacks: EngineCallbacks) -> StreamHandle {
        let handle = StreamHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.streams.insert(handle, callbacks);
        tracing::trace!(stream = %handle, "Loopback stream opened");
        handle
    }

    fn send_headers(&self, stream: StreamHandle, headers: RequestHeaders, end_stream: bool) {
        let Some(callbacks) = self.callbacks(stream) else {
            return;
        };
        let mut response = vec![(":status".to_string(), vec!["200".to_string()])];
        response.extend(
            headers
                .container()
                .iter()
                .filter(|header| !header.name().starts_with(':'))
                .map(|header| (header.name().to_string(), header.values().to_vec())),
        );
        callbacks.on_headers(HeaderContainer::from_pairs(response), end_stream);
        if end_stream {
            self.complete(stream);
        }
    }

    fn send_data(&self, stream: StreamHandle, data: Bytes, end_stream: bool) {
        let Some(callbacks) = self.callbacks(stream) else {
            return;
        };
        callbacks.on_data(data, end_stream);
        if end_stream {
            self.complete(stream);
        }
    }

    fn send_trailers(&self, stream: StreamHandle, trailers: RequestTrailers) {
        let Some(callbacks) = self.callbacks(stream) else {
            return;
        };
        callbacks.on_trailers(trailers.container().clone());
        self.complete(stream);
    }

    fn cancel(&self, stream: StreamHandle) {
        if let Some((_, callbacks)) = self.streams.remove(&stream) {
            tracing::trace!(stream = %stream, "Loopback stream cancelled");
            callbacks.on_cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{RequestHeadersBuilder, RequestMethod};
    use crate::stream::event::{DeliveryQueue, StreamEvent};

    #[test]
    fn echoes_without_pseudo_headers() {
        let engine = LoopbackEngine::new();
        let (queue, mut events) = DeliveryQueue::channel();
        let handle = engine.start_stream(EngineCallbacks::new(queue));
        assert_eq!(engine.active_streams(), 1);

        let mut builder =
            RequestHeadersBuilder::new(RequestMethod::Get, "https", "example.com", "/");
        builder.add("x-echo", "yes");
        engine.send_headers(handle, builder.build(), true);

        let Ok(StreamEvent::ResponseHeaders { headers, end_stream }) = events.try_recv() else {
            panic!("expected response headers");
        };
        assert!(end_stream);
        assert_eq!(headers.first_value(":status"), Some("200"));
        assert_eq!(headers.first_value("x-echo"), Some("yes"));
        assert!(headers.value(":path").is_none());

        assert!(matches!(events.try_recv(), Ok(StreamEvent::Complete)));
        assert_eq!(engine.active_streams(), 0);
    }

    #[test]
    fn cancel_answers_once() {
        let engine = LoopbackEngine::new();
        let (queue, mut events) = DeliveryQueue::channel();
        let handle = engine.start_stream(EngineCallbacks::new(queue));

        engine.cancel(handle);
        engine.cancel(handle);
        engine.send_data(handle, Bytes::from_static(b"late"), true);

        assert!(matches!(events.try_recv(), Ok(StreamEvent::EngineCancel)));
        assert!(events.try_recv().is_err());
    }
}
