//! gRPC request headers and response status helpers.

use crate::headers::{
    Headers, HeadersBuilder, RequestHeaders, RequestHeadersBuilder, RequestMethod, ResponseTrailers,
};

const CONTENT_TYPE: &str = "content-type";
const GRPC_CONTENT_TYPE: &str = "application/grpc";
const GRPC_TIMEOUT: &str = "grpc-timeout";
const GRPC_STATUS: &str = "grpc-status";
const GRPC_MESSAGE: &str = "grpc-message";

/// Request headers for a gRPC call: always `POST` with `application/grpc`.
#[derive(Debug, Clone)]
pub struct GrpcRequestHeadersBuilder {
    inner: RequestHeadersBuilder,
}

impl GrpcRequestHeadersBuilder {
    /// `path` is the full method path, e.g. `/pkg.Service/Method`.
    pub fn new(scheme: &str, authority: &str, path: &str) -> Self {
        let mut inner = RequestHeadersBuilder::new(RequestMethod::Post, scheme, authority, path);
        inner.set(CONTENT_TYPE, vec![GRPC_CONTENT_TYPE.to_string()]);
        Self { inner }
    }

    pub fn add(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.inner.add(name, value);
        self
    }

    pub fn set(&mut self, name: &str, values: Vec<String>) -> &mut Self {
        self.inner.set(name, values);
        self
    }

    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.inner.remove(name);
        self
    }

    /// Set `grpc-timeout` in milliseconds, or drop it for `None`.
    pub fn add_timeout_ms(&mut self, timeout_ms: Option<u64>) -> &mut Self {
        match timeout_ms {
            Some(ms) => self.inner.set(GRPC_TIMEOUT, vec![format!("{ms}m")]),
            None => self.inner.remove(GRPC_TIMEOUT),
        };
        self
    }

    pub fn build(&self) -> RequestHeaders {
        self.inner.build()
    }
}

/// `grpc-status` as an integer; 0 when absent or unparseable.
pub fn grpc_status<H: Headers + ?Sized>(headers: &H) -> i32 {
    headers
        .first_value(GRPC_STATUS)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

pub fn grpc_message<H: Headers + ?Sized>(headers: &H) -> Option<&str> {
    headers.first_value(GRPC_MESSAGE)
}

impl HeadersBuilder<ResponseTrailers> {
    pub fn add_grpc_status(&mut self, status: i32) -> &mut Self {
        self.set(GRPC_STATUS, vec![status.to_string()])
    }

    pub fn add_grpc_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.set(GRPC_MESSAGE, vec![message.into()])
    }
}
