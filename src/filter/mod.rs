//! Filter chain subsystem.
//!
//! # Data Flow
//! ```text
//! FilterRegistry (factories, registration order)
//!     → create_filters() once per stream
//!     → FilterChain
//!         - request chain: registration order
//!         - response chain: reverse registration order
//!     → FilterManager
//!         - request pipeline  ──► engine
//!         - response pipeline ──► app callbacks
//! ```
//!
//! # Design Decisions
//! - Filters declare capabilities once; the chain stores typed entries
//! - Statuses are closed enums, matched exhaustively
//! - Resume is a message on the stream's delivery queue, never a direct call
//! - A broken filter contract panics when strict (the stream driver turns that into a
//!   failed stream), otherwise logs and is ignored

pub mod callbacks;
pub(crate) mod chain;
pub mod instance;
pub mod logging;
pub(crate) mod manager;
pub(crate) mod pipeline;
pub mod status;
pub mod traits;
pub mod violation;

pub use callbacks::{RequestFilterCallbacks, ResponseFilterCallbacks};
pub use instance::{FilterInstance, FilterInstanceBuilder, FilterRegistry};
pub use logging::LoggingFilter;
pub use status::{FilterDataStatus, FilterHeadersStatus, FilterResumeStatus, FilterTrailersStatus};
pub use traits::{AsyncRequestFilter, AsyncResponseFilter, Filter, RequestFilter, ResponseFilter};
pub use violation::ContractViolation;
