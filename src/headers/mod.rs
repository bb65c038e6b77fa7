//! Header and trailer types.
//!
//! # Responsibilities
//! - Case-insensitive multi-value storage ([`HeaderContainer`])
//! - Typed, immutable views for each direction and phase
//! - Builders that enforce the restricted-name policy
//!
//! # Data Flow
//! ```text
//! app ──► RequestHeadersBuilder ──build()──► RequestHeaders ──► filters ──► engine
//! engine ──► HeaderContainer ──► ResponseHeaders ──► filters ──► app callbacks
//! ```

pub mod builder;
pub mod container;
pub mod request;
pub mod response;
pub mod retry;

use std::collections::HashMap;

pub use builder::{is_restricted_header, HeadersBuilder};
pub use container::{Header, HeaderContainer};
pub use request::{
    RequestHeaders, RequestHeadersBuilder, RequestMethod, RequestTrailers,
    RequestTrailersBuilder, UnknownMethod, UpstreamHttpProtocol,
};
pub use response::{
    ResponseHeaders, ResponseHeadersBuilder, ResponseTrailers, ResponseTrailersBuilder,
};
pub use retry::{RetryPolicy, RetryRule, UnknownRetryRule};

pub(crate) mod sealed {
    use super::HeaderContainer;

    /// Construction from raw storage, reserved to this crate.
    pub trait FromContainer {
        fn from_container(container: HeaderContainer) -> Self;
    }
}

/// Read access shared by every typed header value.
pub trait Headers {
    fn container(&self) -> &HeaderContainer;

    /// All values for `name`, matched case-insensitively.
    fn value(&self, name: &str) -> Option<&[String]> {
        self.container().value(name)
    }

    fn first_value(&self, name: &str) -> Option<&str> {
        self.container().first_value(name)
    }

    fn all_headers(&self) -> HashMap<String, Vec<String>> {
        self.container().all_headers()
    }
}
