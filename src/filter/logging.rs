//! A pass-through filter that logs every phase it sees.

use bytes::Bytes;

use crate::error::StreamError;
use crate::filter::instance::FilterInstance;
use crate::filter::status::{FilterDataStatus, FilterHeadersStatus, FilterTrailersStatus};
use crate::filter::traits::{Filter, RequestFilter, ResponseFilter};
use crate::headers::{Headers, RequestHeaders, RequestTrailers, ResponseHeaders, ResponseTrailers};

/// Logs request and response phases at debug level and never alters them.
#[derive(Debug, Default)]
pub struct LoggingFilter {
    request_bytes: usize,
    response_bytes: usize,
}

impl LoggingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An instance taking part in both directions.
    pub fn instance() -> FilterInstance {
        FilterInstance::builder(Self::new())
            .request()
            .response()
            .build()
    }
}

impl Filter for LoggingFilter {
    fn name(&self) -> &str {
        "logging"
    }
}

impl RequestFilter for LoggingFilter {
    fn on_request_headers(
        &mut self,
        headers: RequestHeaders,
        end_stream: bool,
    ) -> FilterHeadersStatus<RequestHeaders> {
        tracing::debug!(
            method = headers.first_value(":method").unwrap_or("-"),
            authority = headers.authority().unwrap_or("-"),
            path = headers.path().unwrap_or("-"),
            end_stream,
            "Request headers"
        );
        FilterHeadersStatus::Continue(headers)
    }

    fn on_request_data(
        &mut self,
        body: Bytes,
        end_stream: bool,
    ) -> FilterDataStatus<RequestHeaders> {
        self.request_bytes += body.len();
        tracing::debug!(len = body.len(), total = self.request_bytes, end_stream, "Request data");
        FilterDataStatus::Continue(body)
    }

    fn on_request_trailers(
        &mut self,
        trailers: RequestTrailers,
    ) -> FilterTrailersStatus<RequestHeaders, RequestTrailers> {
        tracing::debug!(count = trailers.container().len(), "Request trailers");
        FilterTrailersStatus::Continue(trailers)
    }
}

impl ResponseFilter for LoggingFilter {
    fn on_response_headers(
        &mut self,
        headers: ResponseHeaders,
        end_stream: bool,
    ) -> FilterHeadersStatus<ResponseHeaders> {
        tracing::debug!(status = ?headers.http_status(), end_stream, "Response headers");
        FilterHeadersStatus::Continue(headers)
    }

    fn on_response_data(
        &mut self,
        body: Bytes,
        end_stream: bool,
    ) -> FilterDataStatus<ResponseHeaders> {
        self.response_bytes += body.len();
        tracing::debug!(len = body.len(), total = self.response_bytes, end_stream, "Response data");
        FilterDataStatus::Continue(body)
    }

    fn on_response_trailers(
        &mut self,
        trailers: ResponseTrailers,
    ) -> FilterTrailersStatus<ResponseHeaders, ResponseTrailers> {
        tracing::debug!(count = trailers.container().len(), "Response trailers");
        FilterTrailersStatus::Continue(trailers)
    }

    fn on_error(&mut self, error: &StreamError) {
        tracing::debug!(error = %error, "Stream failed");
    }

    fn on_cancel(&mut self) {
        tracing::debug!("Stream cancelled");
    }

    fn on_complete(&mut self) {
        tracing::debug!(
            request_bytes = self.request_bytes,
            response_bytes = self.response_bytes,
            "Stream complete"
        );
    }
}
