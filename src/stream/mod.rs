//! Streams: the application-facing request/response surface.
//!
//! # Data Flow
//! ```text
//! StreamClient
//!     → new_stream_prototype() (filters + config snapshot)
//!     → StreamPrototype::start()
//!         - engine.start_stream(EngineCallbacks)
//!         - FilterManager built from fresh filter instances
//!         - StreamDriver spawned on the chosen runtime
//!     → Stream (send_headers / send_data / close / cancel)
//! ```
//!
//! # Design Decisions
//! - One delivery queue and one driver task per stream
//! - The handle validates sends against an atomic lifecycle state
//! - Cancel flips a shared flag before enqueueing, so queued events stop
//!   reaching filters at once

pub(crate) mod callbacks;
pub mod client;
pub(crate) mod driver;
pub(crate) mod event;
pub mod handle;
pub mod prototype;
pub mod state;

pub use client::StreamClient;
pub use handle::Stream;
pub use prototype::StreamPrototype;
pub use state::StreamState;
