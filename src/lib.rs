//! Client-side HTTP/gRPC streaming over a pluggable network engine.
//!
//! # Architecture Overview
//!
//! ```text
//!   application                                                engine
//!   ───────────                                                ──────
//!   Stream::send_* ──► delivery queue ──► request chain  ──► send_headers / data / trailers
//!                          (one per        (registration
//!                           stream)          order)
//!   callbacks     ◄── response chain  ◄── delivery queue ◄── EngineCallbacks
//!                     (reverse order)
//!
//!   GrpcStream  ── encode ──► Stream          Stream callbacks ── decode ──► messages
//! ```
//!
//! Everything for one stream runs on a single driver task, fed by that
//! stream's delivery queue: application sends, engine callbacks, filter
//! resumes and cancellation.

// Core subsystems
pub mod engine;
pub mod filter;
pub mod headers;
pub mod stream;

// Protocols
pub mod grpc;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;

pub use config::ClientConfig;
pub use engine::{Engine, EngineCallbacks, LoopbackEngine, StreamHandle};
pub use error::{ClientError, ErrorCode, StreamError};
pub use grpc::{GrpcClient, GrpcStream, GrpcStreamPrototype};
pub use stream::{Stream, StreamClient, StreamPrototype, StreamState};
