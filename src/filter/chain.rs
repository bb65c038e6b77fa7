//! Partitioning filter instances into the request and response chains.

use bytes::Bytes;

use crate::filter::instance::{lock, FilterInstance, RequestSlot, ResponseSlot};
use crate::filter::pipeline::ChainFilter;
use crate::filter::status::{
    FilterDataStatus, FilterHeadersStatus, FilterResumeStatus, FilterTrailersStatus,
};
use crate::headers::{RequestHeaders, RequestTrailers, ResponseHeaders, ResponseTrailers};

pub(crate) struct RequestEntry {
    pub(crate) name: String,
    pub(crate) slot: RequestSlot,
}

pub(crate) struct ResponseEntry {
    pub(crate) name: String,
    pub(crate) slot: ResponseSlot,
}

/// The two chains of one stream.
pub(crate) struct FilterChain {
    /// Registration order.
    pub(crate) request: Vec<RequestEntry>,
    /// Reverse registration order.
    pub(crate) response: Vec<ResponseEntry>,
}

impl FilterChain {
    pub(crate) fn new(instances: Vec<FilterInstance>) -> Self {
        let mut request = Vec::new();
        let mut response = Vec::new();
        for instance in instances {
            if let Some(slot) = instance.request {
                request.push(RequestEntry {
                    name: instance.name.clone(),
                    slot,
                });
            }
            if let Some(slot) = instance.response {
                response.push(ResponseEntry {
                    name: instance.name,
                    slot,
                });
            }
        }
        response.reverse();
        Self { request, response }
    }
}

impl ChainFilter for RequestEntry {
    type Headers = RequestHeaders;
    type Trailers = RequestTrailers;

    fn name(&self) -> &str {
        &self.name
    }

    fn on_headers(
        &self,
        headers: RequestHeaders,
        end_stream: bool,
    ) -> FilterHeadersStatus<RequestHeaders> {
        match &self.slot {
            RequestSlot::Sync(filter) => lock(filter).on_request_headers(headers, end_stream),
            RequestSlot::Async(filter) => lock(filter).on_request_headers(headers, end_stream),
        }
    }

    fn on_data(&self, data: Bytes, end_stream: bool) -> FilterDataStatus<RequestHeaders> {
        match &self.slot {
            RequestSlot::Sync(filter) => lock(filter).on_request_data(data, end_stream),
            RequestSlot::Async(filter) => lock(filter).on_request_data(data, end_stream),
        }
    }

    fn on_trailers(
        &self,
        trailers: RequestTrailers,
    ) -> FilterTrailersStatus<RequestHeaders, RequestTrailers> {
        match &self.slot {
            RequestSlot::Sync(filter) => lock(filter).on_request_trailers(trailers),
            RequestSlot::Async(filter) => lock(filter).on_request_trailers(trailers),
        }
    }

    fn on_resume(
        &self,
        headers: Option<RequestHeaders>,
        data: Option<Bytes>,
        trailers: Option<RequestTrailers>,
        end_stream: bool,
    ) -> Option<FilterResumeStatus<RequestHeaders, RequestTrailers>> {
        match &self.slot {
            RequestSlot::Sync(_) => None,
            RequestSlot::Async(filter) => {
                Some(lock(filter).on_resume_request(headers, data, trailers, end_stream))
            }
        }
    }
}

impl ChainFilter for ResponseEntry {
    type Headers = ResponseHeaders;
    type Trailers = ResponseTrailers;

    fn name(&self) -> &str {
        &self.name
    }

    fn on_headers(
        &self,
        headers: ResponseHeaders,
        end_stream: bool,
    ) -> FilterHeadersStatus<ResponseHeaders> {
        match &self.slot {
            ResponseSlot::Sync(filter) => lock(filter).on_response_headers(headers, end_stream),
            ResponseSlot::Async(filter) => lock(filter).on_response_headers(headers, end_stream),
        }
    }

    fn on_data(&self, data: Bytes, end_stream: bool) -> FilterDataStatus<ResponseHeaders> {
        match &self.slot {
            ResponseSlot::Sync(filter) => lock(filter).on_response_data(data, end_stream),
            ResponseSlot::Async(filter) => lock(filter).on_response_data(data, end_stream),
        }
    }

    fn on_trailers(
        &self,
        trailers: ResponseTrailers,
    ) -> FilterTrailersStatus<ResponseHeaders, ResponseTrailers> {
        match &self.slot {
            ResponseSlot::Sync(filter) => lock(filter).on_response_trailers(trailers),
            ResponseSlot::Async(filter) => lock(filter).on_response_trailers(trailers),
        }
    }

    fn on_resume(
        &self,
        headers: Option<ResponseHeaders>,
        data: Option<Bytes>,
        trailers: Option<ResponseTrailers>,
        end_stream: bool,
    ) -> Option<FilterResumeStatus<ResponseHeaders, ResponseTrailers>> {
        match &self.slot {
            ResponseSlot::Sync(_) => None,
            ResponseSlot::Async(filter) => {
                Some(lock(filter).on_resume_response(headers, data, trailers, end_stream))
            }
        }
    }
}

impl ResponseEntry {
    pub(crate) fn on_error(&self, error: &crate::error::StreamError) {
        match &self.slot {
            ResponseSlot::Sync(filter) => lock(filter).on_error(error),
            ResponseSlot::Async(filter) => lock(filter).on_error(error),
        }
    }

    pub(crate) fn on_cancel(&self) {
        match &self.slot {
            ResponseSlot::Sync(filter) => lock(filter).on_cancel(),
            ResponseSlot::Async(filter) => lock(filter).on_cancel(),
        }
    }

    pub(crate) fn on_complete(&self) {
        match &self.slot {
            ResponseSlot::Sync(filter) => lock(filter).on_complete(),
            ResponseSlot::Async(filter) => lock(filter).on_complete(),
        }
    }
}
