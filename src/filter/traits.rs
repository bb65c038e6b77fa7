//! Filter traits implemented by application code.
//!
//! A filter type implements [`Filter`] plus any of the direction traits. The
//! capabilities it actually takes part in are declared once, when its
//! [`FilterInstance`](crate::filter::FilterInstance) is built.

use bytes::Bytes;

use crate::error::StreamError;
use crate::filter::callbacks::{RequestFilterCallbacks, ResponseFilterCallbacks};
use crate::filter::status::{
    FilterDataStatus, FilterHeadersStatus, FilterResumeStatus, FilterTrailersStatus,
};
use crate::headers::{RequestHeaders, RequestTrailers, ResponseHeaders, ResponseTrailers};

/// Base trait for every filter.
pub trait Filter: Send + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Observes and transforms outbound requests.
///
/// Every callback defaults to passing its input through.
pub trait RequestFilter: Filter {
    fn on_request_headers(
        &mut self,
        headers: RequestHeaders,
        end_stream: bool,
    ) -> FilterHeadersStatus<RequestHeaders> {
        let _ = end_stream;
        FilterHeadersStatus::Continue(headers)
    }

    fn on_request_data(
        &mut self,
        body: Bytes,
        end_stream: bool,
    ) -> FilterDataStatus<RequestHeaders> {
        let _ = end_stream;
        FilterDataStatus::Continue(body)
    }

    fn on_request_trailers(
        &mut self,
        trailers: RequestTrailers,
    ) -> FilterTrailersStatus<RequestHeaders, RequestTrailers> {
        FilterTrailersStatus::Continue(trailers)
    }
}

/// Observes and transforms inbound responses, and is told how the stream ended.
///
/// Exactly one of `on_error`, `on_cancel` or `on_complete` is called per stream.
pub trait ResponseFilter: Filter {
    fn on_response_headers(
        &mut self,
        headers: ResponseHeaders,
        end_stream: bool,
    ) -> FilterHeadersStatus<ResponseHeaders> {
        let _ = end_stream;
        FilterHeadersStatus::Continue(headers)
    }

    fn on_response_data(
        &mut self,
        body: Bytes,
        end_stream: bool,
    ) -> FilterDataStatus<ResponseHeaders> {
        let _ = end_stream;
        FilterDataStatus::Continue(body)
    }

    fn on_response_trailers(
        &mut self,
        trailers: ResponseTrailers,
    ) -> FilterTrailersStatus<ResponseHeaders, ResponseTrailers> {
        FilterTrailersStatus::Continue(trailers)
    }

    fn on_error(&mut self, error: &StreamError) {
        let _ = error;
    }

    fn on_cancel(&mut self) {}

    fn on_complete(&mut self) {}
}

/// A request filter that can halt and later resume on its own schedule.
pub trait AsyncRequestFilter: RequestFilter {
    /// Called once, before any request callback.
    fn set_request_filter_callbacks(&mut self, callbacks: RequestFilterCallbacks);

    /// Called after [`RequestFilterCallbacks::resume_request`], with whatever the
    /// manager is holding at this filter.
    fn on_resume_request(
        &mut self,
        headers: Option<RequestHeaders>,
        data: Option<Bytes>,
        trailers: Option<RequestTrailers>,
        end_stream: bool,
    ) -> FilterResumeStatus<RequestHeaders, RequestTrailers>;
}

/// Response-side counterpart of [`AsyncRequestFilter`].
pub trait AsyncResponseFilter: ResponseFilter {
    fn set_response_filter_callbacks(&mut self, callbacks: ResponseFilterCallbacks);

    fn on_resume_response(
        &mut self,
        headers: Option<ResponseHeaders>,
        data: Option<Bytes>,
        trailers: Option<ResponseTrailers>,
        end_stream: bool,
    ) -> FilterResumeStatus<ResponseHeaders, ResponseTrailers>;
}
