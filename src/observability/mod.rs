//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (stream, filter, phase)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, filtered by RUST_LOG or config)
//!     → or whatever subscriber the embedding application installs
//! ```

pub mod logging;

pub use logging::init_logging;
