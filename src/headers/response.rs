//! Response headers and trailers.

use crate::headers::builder::HeadersBuilder;
use crate::headers::container::HeaderContainer;
use crate::headers::{sealed::FromContainer, Headers};

/// Immutable inbound response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    container: HeaderContainer,
}

impl ResponseHeaders {
    /// HTTP status from `:status`, if present and numeric.
    pub fn http_status(&self) -> Option<u16> {
        self.first_value(":status")?.parse().ok()
    }

    pub fn to_builder(&self) -> ResponseHeadersBuilder {
        HeadersBuilder::from(self)
    }
}

impl FromContainer for ResponseHeaders {
    fn from_container(container: HeaderContainer) -> Self {
        Self { container }
    }
}

impl Headers for ResponseHeaders {
    fn container(&self) -> &HeaderContainer {
        &self.container
    }
}

/// Immutable inbound response trailers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseTrailers {
    container: HeaderContainer,
}

impl ResponseTrailers {
    pub fn to_builder(&self) -> ResponseTrailersBuilder {
        HeadersBuilder::from(self)
    }
}

impl FromContainer for ResponseTrailers {
    fn from_container(container: HeaderContainer) -> Self {
        Self { container }
    }
}

impl Headers for ResponseTrailers {
    fn container(&self) -> &HeaderContainer {
        &self.container
    }
}

pub type ResponseHeadersBuilder = HeadersBuilder<ResponseHeaders>;
pub type ResponseTrailersBuilder = HeadersBuilder<ResponseTrailers>;

impl HeadersBuilder<ResponseHeaders> {
    pub fn new() -> Self {
        Self::empty()
    }

    pub fn add_http_status(&mut self, status: u16) -> &mut Self {
        self.internal_set(":status", vec![status.to_string()])
    }
}

impl Default for HeadersBuilder<ResponseHeaders> {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadersBuilder<ResponseTrailers> {
    pub fn new() -> Self {
        Self::empty()
    }
}

impl Default for HeadersBuilder<ResponseTrailers> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status() {
        let mut builder = ResponseHeadersBuilder::new();
        builder.add_http_status(204);
        assert_eq!(builder.build().http_status(), Some(204));

        // the public path cannot forge a status
        let mut builder = ResponseHeadersBuilder::new();
        builder.add(":status", "500");
        assert_eq!(builder.build().http_status(), None);
    }

    #[test]
    fn non_numeric_status() {
        let headers = ResponseHeaders::from_container(HeaderContainer::from_pairs(vec![(
            ":status".to_string(),
            vec!["ok".to_string()],
        )]));
        assert_eq!(headers.http_status(), None);
    }
}
