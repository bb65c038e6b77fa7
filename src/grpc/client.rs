//! gRPC streams layered over plain streams.
//!
//! # Data Flow
//! ```text
//! send_message(bytes) ──encode──► Stream::send_data ──► request filters ──► engine
//! engine ──► response filters ──► on_response_data ──decode──► on_response_message
//! ```
//!
//! # Design Decisions
//! - The decoder lives inside the stream's data callback, so it only ever
//!   runs on the driver task
//! - A malformed frame reaches `on_error` as a protocol violation; the stream
//!   stays open and the caller decides whether to cancel

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::runtime::Handle;

use crate::config::GrpcConfig;
use crate::engine::StreamHandle;
use crate::error::{ClientError, ErrorCode, StreamError};
use crate::filter::instance::lock;
use crate::grpc::codec::{encode_message, GrpcMessageDecoder};
use crate::grpc::headers::grpc_status;
use crate::headers::{Headers, RequestHeaders, ResponseHeaders, ResponseTrailers};
use crate::stream::{Stream, StreamClient, StreamPrototype, StreamState};

type GrpcHeadersCallback = Box<dyn FnMut(ResponseHeaders, i32, bool) + Send>;
type MessageCallback = Box<dyn FnMut(Bytes, bool) + Send>;
type TrailersCallback = Box<dyn FnMut(ResponseTrailers) + Send>;
type ErrorCallback = Box<dyn FnMut(StreamError) + Send>;

/// Starts gRPC streams through a [`StreamClient`].
#[derive(Clone)]
pub struct GrpcClient {
    client: StreamClient,
}

impl GrpcClient {
    pub fn new(client: StreamClient) -> Self {
        Self { client }
    }

    pub fn stream_client(&self) -> &StreamClient {
        &self.client
    }

    pub fn new_grpc_stream(&self) -> GrpcStreamPrototype {
        let config = self.client.config();
        GrpcStreamPrototype::new(self.client.new_stream_prototype(), &config.grpc)
    }
}

/// Collects gRPC callbacks, then starts a [`GrpcStream`].
pub struct GrpcStreamPrototype {
    inner: StreamPrototype,
    default_timeout_ms: Option<u64>,
    max_message_bytes: Option<usize>,
    on_headers: Option<GrpcHeadersCallback>,
    on_message: Option<MessageCallback>,
    on_trailers: Option<TrailersCallback>,
    on_error: Option<ErrorCallback>,
}

impl GrpcStreamPrototype {
    fn new(inner: StreamPrototype, config: &GrpcConfig) -> Self {
        Self {
            inner,
            default_timeout_ms: config.default_timeout_ms,
            max_message_bytes: config.max_message_bytes,
            on_headers: None,
            on_message: None,
            on_trailers: None,
            on_error: None,
        }
    }

    /// Called with the headers, their `grpc-status` (0 if absent) and the end flag.
    pub fn set_on_response_headers<F>(mut self, callback: F) -> Self
    where
        F: FnMut(ResponseHeaders, i32, bool) + Send + 'static,
    {
        self.on_headers = Some(Box::new(callback));
        self
    }

    /// Called once per decoded message.
    pub fn set_on_response_message<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Bytes, bool) + Send + 'static,
    {
        self.on_message = Some(Box::new(callback));
        self
    }

    pub fn set_on_response_trailers<F>(mut self, callback: F) -> Self
    where
        F: FnMut(ResponseTrailers) + Send + 'static,
    {
        self.on_trailers = Some(Box::new(callback));
        self
    }

    /// Receives transport errors and malformed response frames.
    pub fn set_on_error<F>(mut self, callback: F) -> Self
    where
        F: FnMut(StreamError) + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn set_on_cancel<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.inner = self.inner.set_on_cancel(callback);
        self
    }

    pub fn set_on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.inner = self.inner.set_on_complete(callback);
        self
    }

    /// Start on the current Tokio runtime.
    pub fn start(self) -> Result<GrpcStream, ClientError> {
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        self.start_on(&runtime)
    }

    pub fn start_on(self, runtime: &Handle) -> Result<GrpcStream, ClientError> {
        let default_timeout_ms = self.default_timeout_ms;
        let stream = self.wire().start_on(runtime)?;
        Ok(GrpcStream {
            stream,
            default_timeout_ms,
        })
    }

    fn wire(self) -> StreamPrototype {
        let mut inner = self.inner;
        let error = Arc::new(Mutex::new(self.on_error));

        if let Some(mut on_headers) = self.on_headers {
            inner = inner.set_on_response_headers(move |headers, end_stream| {
                let status = grpc_status(&headers);
                on_headers(headers, status, end_stream);
            });
        }

        if let Some(on_trailers) = self.on_trailers {
            inner = inner.set_on_response_trailers(on_trailers);
        }

        let mut decoder = GrpcMessageDecoder::with_max_message_len(self.max_message_bytes);
        let mut on_message = self.on_message;
        let data_error = Arc::clone(&error);
        inner = inner.set_on_response_data(move |chunk, end_stream| {
            let decoded = decoder.decode(&chunk, end_stream, |message, end| {
                if let Some(callback) = on_message.as_mut() {
                    callback(message, end);
                }
            });
            if let Err(err) = decoded {
                tracing::warn!(error = %err, "Malformed gRPC response frame");
                if let Some(callback) = lock(&data_error).as_mut() {
                    callback(StreamError::new(ErrorCode::ProtocolViolation, err.to_string()));
                }
            }
        });

        inner.set_on_error(move |err| {
            if let Some(callback) = lock(&error).as_mut() {
                callback(err);
            }
        })
    }
}

/// A started gRPC stream.
#[derive(Debug)]
pub struct GrpcStream {
    stream: Stream,
    default_timeout_ms: Option<u64>,
}

impl GrpcStream {
    pub fn id(&self) -> StreamHandle {
        self.stream.id()
    }

    pub fn state(&self) -> StreamState {
        self.stream.state()
    }

    /// Send request headers. The configured default timeout is added when the
    /// headers carry no `grpc-timeout` of their own.
    pub fn send_headers(
        &self,
        headers: RequestHeaders,
        end_stream: bool,
    ) -> Result<(), ClientError> {
        let headers = match self.default_timeout_ms {
            Some(ms) if headers.value("grpc-timeout").is_none() => {
                let mut builder = headers.to_builder();
                builder.set("grpc-timeout", vec![format!("{ms}m")]);
                builder.build()
            }
            _ => headers,
        };
        self.stream.send_headers(headers, end_stream)
    }

    /// Frame and send one message.
    pub fn send_message(&self, message: impl AsRef<[u8]>) -> Result<(), ClientError> {
        let frame = encode_message(message.as_ref())?;
        self.stream.send_data(frame)
    }

    /// Close the request side with an empty data frame.
    pub fn close(&self) -> Result<(), ClientError> {
        self.stream.close_with_data(Bytes::new())
    }

    pub fn cancel(&self) {
        self.stream.cancel();
    }
}
