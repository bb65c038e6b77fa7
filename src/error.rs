//! Error types shared by the client.
//!
//! # Taxonomy
//! - [`ClientError`]: a public API call was rejected (bad stream state, no engine, no runtime)
//! - [`StreamError`]: a failure delivered to `on_error` callbacks (transport errors from the
//!   engine, gRPC protocol violations, buffer limit overruns, panicking filters)
//!
//! Filter contract violations live in [`crate::filter::ContractViolation`]; codec failures in
//! [`crate::grpc::GrpcCodecError`]; configuration failures in [`crate::config::ConfigError`].

use std::fmt;

use thiserror::Error;

use crate::grpc::GrpcCodecError;
use crate::stream::StreamState;

/// Failure of a public client operation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The engine behind the client has been torn down.
    #[error("engine is no longer running")]
    EngineUnavailable,

    /// `start()` was called outside of a Tokio runtime.
    #[error("no Tokio runtime available to drive the stream")]
    NoRuntime,

    /// The operation is not legal in the stream's current state.
    #[error("cannot {operation} while stream is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: StreamState,
    },

    /// A gRPC message could not be framed.
    #[error(transparent)]
    Codec(#[from] GrpcCodecError),
}

/// Error codes reported with a [`StreamError`].
///
/// The first five mirror the engine's numeric codes (0 through 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Undefined,
    StreamReset,
    ConnectionFailure,
    BufferLimitExceeded,
    RequestTimeout,
    /// Raised locally when inbound gRPC framing cannot be decoded.
    ProtocolViolation,
    /// Raised locally when a filter panics, including a strict contract violation.
    FilterFailure,
}

impl ErrorCode {
    /// Map a raw engine error code. Unknown codes become [`ErrorCode::Undefined`].
    pub fn from_raw(code: i32) -> Self {
        match code {
            1 => ErrorCode::StreamReset,
            2 => ErrorCode::ConnectionFailure,
            3 => ErrorCode::BufferLimitExceeded,
            4 => ErrorCode::RequestTimeout,
            _ => ErrorCode::Undefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Undefined => "undefined",
            ErrorCode::StreamReset => "stream_reset",
            ErrorCode::ConnectionFailure => "connection_failure",
            ErrorCode::BufferLimitExceeded => "buffer_limit_exceeded",
            ErrorCode::RequestTimeout => "request_timeout",
            ErrorCode::ProtocolViolation => "protocol_violation",
            ErrorCode::FilterFailure => "filter_failure",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error delivered to a stream's error callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct StreamError {
    pub code: ErrorCode,
    pub message: String,
    /// Number of upstream attempts the engine made, when known.
    pub attempt_count: Option<u32>,
}

impl StreamError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            attempt_count: None,
        }
    }

    pub fn with_attempt_count(mut self, attempt_count: u32) -> Self {
        self.attempt_count = Some(attempt_count);
        self
    }

    /// Build from the raw values passed across the engine boundary.
    /// A negative attempt count means "unknown".
    pub(crate) fn from_engine(code: i32, message: String, attempt_count: i32) -> Self {
        Self {
            code: ErrorCode::from_raw(code),
            message,
            attempt_count: u32::try_from(attempt_count).ok(),
        }
    }
}
