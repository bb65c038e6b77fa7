//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use edge_client::error::StreamError;
use edge_client::headers::{RequestHeaders, RequestTrailers, ResponseHeaders, ResponseTrailers};
use edge_client::stream::StreamPrototype;
use edge_client::{Engine, EngineCallbacks, StreamHandle};

pub const WAIT: Duration = Duration::from_secs(2);

/// What a stream sent to the engine.
#[derive(Debug)]
pub enum Sent {
    Headers(RequestHeaders, bool),
    Data(Bytes, bool),
    Trailers(RequestTrailers),
    Cancel,
}

/// Engine that records every outbound call and lets the test drive responses.
pub struct RecordingEngine {
    streams: Mutex<HashMap<StreamHandle, EngineCallbacks>>,
    next_handle: AtomicU64,
    sent: UnboundedSender<(StreamHandle, Sent)>,
}

impl RecordingEngine {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<(StreamHandle, Sent)>) {
        let (sent, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            streams: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            sent,
        });
        (engine, rx)
    }

    /// The callbacks the engine was handed for `stream`.
    pub fn callbacks(&self, stream: StreamHandle) -> EngineCallbacks {
        self.streams
            .lock()
            .unwrap()
            .get(&stream)
            .cloned()
            .expect("unknown stream")
    }

    fn record(&self, stream: StreamHandle, sent: Sent) {
        let _ = self.sent.send((stream, sent));
    }
}

impl Engine for RecordingEngine {
    fn start_stream(&self, callbacks: EngineCallbacks) -> StreamHandle {
        let handle = StreamHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.streams.lock().unwrap().insert(handle, callbacks);
        handle
    }

    fn send_headers(&self, stream: StreamHandle, headers: RequestHeaders, end_stream: bool) {
        self.record(stream, Sent::Headers(headers, end_stream));
    }

    fn send_data(&self, stream: StreamHandle, data: Bytes, end_stream: bool) {
        self.record(stream, Sent::Data(data, end_stream));
    }

    fn send_trailers(&self, stream: StreamHandle, trailers: RequestTrailers) {
        self.record(stream, Sent::Trailers(trailers));
    }

    fn cancel(&self, stream: StreamHandle) {
        self.record(stream, Sent::Cancel);
        if let Some(callbacks) = self.streams.lock().unwrap().remove(&stream) {
            callbacks.on_cancel();
        }
    }
}

/// What the application callbacks saw.
#[derive(Debug)]
pub enum AppEvent {
    Headers(ResponseHeaders, bool),
    Data(Bytes, bool),
    Trailers(ResponseTrailers),
    Error(StreamError),
    Cancel,
    Complete,
}

impl AppEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppEvent::Error(_) | AppEvent::Cancel | AppEvent::Complete)
    }
}

/// Route every application callback of `prototype` into a channel.
pub fn record_app(prototype: StreamPrototype) -> (StreamPrototype, UnboundedReceiver<AppEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let headers = tx.clone();
    let data = tx.clone();
    let trailers = tx.clone();
    let error = tx.clone();
    let cancel = tx.clone();
    let complete = tx;

    let prototype = prototype
        .set_on_response_headers(move |h, end| {
            let _ = headers.send(AppEvent::Headers(h, end));
        })
        .set_on_response_data(move |d, end| {
            let _ = data.send(AppEvent::Data(d, end));
        })
        .set_on_response_trailers(move |t| {
            let _ = trailers.send(AppEvent::Trailers(t));
        })
        .set_on_error(move |e| {
            let _ = error.send(AppEvent::Error(e));
        })
        .set_on_cancel(move || {
            let _ = cancel.send(AppEvent::Cancel);
        })
        .set_on_complete(move || {
            let _ = complete.send(AppEvent::Complete);
        });
    (prototype, rx)
}

/// Next item, failing the test if none arrives in time.
pub async fn next<T>(rx: &mut UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

/// Assert nothing arrives within a short grace period.
pub async fn assert_quiet<T: std::fmt::Debug>(rx: &mut UnboundedReceiver<T>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if let Ok(item) = rx.try_recv() {
        panic!("unexpected event: {item:?}");
    }
}

/// Collect application events up to and including the first terminal one.
pub async fn until_terminal(rx: &mut UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    loop {
        let event = next(rx).await;
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}
