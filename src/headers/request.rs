//! Request headers and trailers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::headers::builder::HeadersBuilder;
use crate::headers::container::HeaderContainer;
use crate::headers::retry::{RetryPolicy, POLICY_HEADERS};
use crate::headers::{sealed::FromContainer, Headers};

const UPSTREAM_PROTOCOL: &str = "x-envoy-mobile-upstream-protocol";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Delete => "DELETE",
            RequestMethod::Get => "GET",
            RequestMethod::Head => "HEAD",
            RequestMethod::Options => "OPTIONS",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown request method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for RequestMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DELETE" => Ok(RequestMethod::Delete),
            "GET" => Ok(RequestMethod::Get),
            "HEAD" => Ok(RequestMethod::Head),
            "OPTIONS" => Ok(RequestMethod::Options),
            "PATCH" => Ok(RequestMethod::Patch),
            "POST" => Ok(RequestMethod::Post),
            "PUT" => Ok(RequestMethod::Put),
            "TRACE" => Ok(RequestMethod::Trace),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// Protocol the engine should use towards the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamHttpProtocol {
    Http1,
    Http2,
}

impl UpstreamHttpProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamHttpProtocol::Http1 => "http1",
            UpstreamHttpProtocol::Http2 => "http2",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "http1" => Some(UpstreamHttpProtocol::Http1),
            "http2" => Some(UpstreamHttpProtocol::Http2),
            _ => None,
        }
    }
}

/// Immutable outbound request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    container: HeaderContainer,
}

impl RequestHeaders {
    pub fn method(&self) -> Option<RequestMethod> {
        self.first_value(":method")?.parse().ok()
    }

    pub fn scheme(&self) -> Option<&str> {
        self.first_value(":scheme")
    }

    pub fn authority(&self) -> Option<&str> {
        self.first_value(":authority")
    }

    pub fn path(&self) -> Option<&str> {
        self.first_value(":path")
    }

    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        RetryPolicy::from_headers(self)
    }

    pub fn upstream_http_protocol(&self) -> Option<UpstreamHttpProtocol> {
        self.first_value(UPSTREAM_PROTOCOL)
            .and_then(UpstreamHttpProtocol::parse)
    }

    /// Builder seeded with these headers.
    pub fn to_builder(&self) -> RequestHeadersBuilder {
        HeadersBuilder::from(self)
    }
}

impl FromContainer for RequestHeaders {
    fn from_container(container: HeaderContainer) -> Self {
        Self { container }
    }
}

impl Headers for RequestHeaders {
    fn container(&self) -> &HeaderContainer {
        &self.container
    }
}

/// Immutable outbound request trailers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTrailers {
    container: HeaderContainer,
}

impl RequestTrailers {
    pub fn to_builder(&self) -> RequestTrailersBuilder {
        HeadersBuilder::from(self)
    }
}

impl FromContainer for RequestTrailers {
    fn from_container(container: HeaderContainer) -> Self {
        Self { container }
    }
}

impl Headers for RequestTrailers {
    fn container(&self) -> &HeaderContainer {
        &self.container
    }
}

pub type RequestHeadersBuilder = HeadersBuilder<RequestHeaders>;
pub type RequestTrailersBuilder = HeadersBuilder<RequestTrailers>;

impl HeadersBuilder<RequestHeaders> {
    /// Start a request with its four pseudo-headers.
    pub fn new(method: RequestMethod, scheme: &str, authority: &str, path: &str) -> Self {
        let mut builder = Self::empty();
        builder
            .internal_set(":method", vec![method.as_str().to_string()])
            .internal_set(":scheme", vec![scheme.to_string()])
            .internal_set(":authority", vec![authority.to_string()])
            .internal_set(":path", vec![path.to_string()]);
        builder
    }

    /// Write the retry policy headers, replacing any previous policy.
    pub fn add_retry_policy(&mut self, policy: &RetryPolicy) -> &mut Self {
        for name in POLICY_HEADERS {
            self.remove(name);
        }
        for (name, values) in policy.outbound_headers() {
            self.set(name, values);
        }
        self
    }

    pub fn add_upstream_http_protocol(&mut self, protocol: UpstreamHttpProtocol) -> &mut Self {
        self.internal_set(UPSTREAM_PROTOCOL, vec![protocol.as_str().to_string()])
    }
}

impl HeadersBuilder<RequestTrailers> {
    pub fn new() -> Self {
        Self::empty()
    }
}

impl Default for HeadersBuilder<RequestTrailers> {
    fn default() -> Self {
        Self::new()
    }
}
