//! Filter manager for one stream.
//!
//! # Responsibilities
//! - Own the request and response pipelines of a stream
//! - Hand resume callbacks to async filters
//! - Tell response filters how the stream ended
//!
//! The manager is a plain state machine: it is driven from the stream's
//! delivery queue and never blocks or locks anything except the filters it
//! calls.

use bytes::Bytes;

use crate::config::FilterConfig;
use crate::engine::StreamHandle;
use crate::error::StreamError;
use crate::filter::callbacks::{RequestFilterCallbacks, ResponseFilterCallbacks};
use crate::filter::chain::{FilterChain, RequestEntry, ResponseEntry};
use crate::filter::instance::{lock, RequestSlot, ResponseSlot};
use crate::filter::pipeline::{Forwards, Pipeline};
use crate::filter::violation::Direction;
use crate::headers::{RequestHeaders, RequestTrailers, ResponseHeaders, ResponseTrailers};
use crate::stream::event::WeakDeliveryQueue;

pub(crate) type RequestForwards = Forwards<RequestEntry>;
pub(crate) type ResponseForwards = Forwards<ResponseEntry>;

pub(crate) struct FilterManager {
    request: Pipeline<RequestEntry>,
    response: Pipeline<ResponseEntry>,
}

impl FilterManager {
    pub(crate) fn new(
        chain: FilterChain,
        stream: StreamHandle,
        queue: WeakDeliveryQueue,
        config: &FilterConfig,
    ) -> Self {
        for (index, entry) in chain.request.iter().enumerate() {
            if let RequestSlot::Async(filter) = &entry.slot {
                lock(filter).set_request_filter_callbacks(RequestFilterCallbacks::new(
                    index,
                    queue.clone(),
                ));
            }
        }
        for (index, entry) in chain.response.iter().enumerate() {
            if let ResponseSlot::Async(filter) = &entry.slot {
                lock(filter).set_response_filter_callbacks(ResponseFilterCallbacks::new(
                    index,
                    queue.clone(),
                ));
            }
        }

        tracing::debug!(
            stream = %stream,
            request_filters = chain.request.len(),
            response_filters = chain.response.len(),
            "Filter chain built"
        );

        Self {
            request: Pipeline::new(
                Direction::Request,
                stream,
                chain.request,
                config.buffer_limit_bytes,
                config.strict_contract,
            ),
            response: Pipeline::new(
                Direction::Response,
                stream,
                chain.response,
                config.buffer_limit_bytes,
                config.strict_contract,
            ),
        }
    }

    pub(crate) fn send_request_headers(
        &mut self,
        headers: RequestHeaders,
        end_stream: bool,
    ) -> RequestForwards {
        self.request.on_headers(headers, end_stream)
    }

    pub(crate) fn send_request_data(
        &mut self,
        data: Bytes,
        end_stream: bool,
    ) -> Result<RequestForwards, StreamError> {
        self.request.on_data(data, end_stream)
    }

    pub(crate) fn send_request_trailers(
        &mut self,
        trailers: RequestTrailers,
    ) -> Result<RequestForwards, StreamError> {
        self.request.on_trailers(trailers)
    }

    pub(crate) fn resume_request(&mut self, index: usize) -> Result<RequestForwards, StreamError> {
        self.request.resume(index)
    }

    pub(crate) fn receive_response_headers(
        &mut self,
        headers: ResponseHeaders,
        end_stream: bool,
    ) -> ResponseForwards {
        self.response.on_headers(headers, end_stream)
    }

    pub(crate) fn receive_response_data(
        &mut self,
        data: Bytes,
        end_stream: bool,
    ) -> Result<ResponseForwards, StreamError> {
        self.response.on_data(data, end_stream)
    }

    pub(crate) fn receive_response_trailers(
        &mut self,
        trailers: ResponseTrailers,
    ) -> Result<ResponseForwards, StreamError> {
        self.response.on_trailers(trailers)
    }

    pub(crate) fn resume_response(
        &mut self,
        index: usize,
    ) -> Result<ResponseForwards, StreamError> {
        self.response.resume(index)
    }

    /// Every response filter hears about the error, stopped or not.
    pub(crate) fn notify_error(&mut self, error: &StreamError) {
        for filter in self.response.filters() {
            filter.on_error(error);
        }
        self.release();
    }

    pub(crate) fn notify_cancel(&mut self) {
        for filter in self.response.filters() {
            filter.on_cancel();
        }
        self.release();
    }

    pub(crate) fn notify_complete(&mut self) {
        for filter in self.response.filters() {
            filter.on_complete();
        }
        self.release();
    }

    /// Drop held entities and buffers in both directions.
    pub(crate) fn release(&mut self) {
        let buffered = self.request.buffered_bytes() + self.response.buffered_bytes();
        if buffered > 0 {
            tracing::debug!(buffered, "Discarding buffered filter data");
        }
        self.request.clear();
        self.response.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::error::ErrorCode;
    use crate::filter::pipeline::Forward;
    use crate::filter::status::{
        FilterDataStatus, FilterHeadersStatus, FilterResumeStatus, FilterTrailersStatus,
    };
    use crate::filter::traits::{
        AsyncRequestFilter, AsyncResponseFilter, Filter, RequestFilter, ResponseFilter,
    };
    use crate::filter::FilterInstance;
    use crate::headers::{
        Headers, RequestHeadersBuilder, RequestMethod, RequestTrailersBuilder,
        ResponseHeadersBuilder, ResponseTrailersBuilder,
    };
    use crate::stream::event::{DeliveryQueue, StreamEvent};

    type Log = Arc<Mutex<Vec<String>>>;

    fn request_headers() -> RequestHeaders {
        RequestHeadersBuilder::new(RequestMethod::Post, "https", "example.com", "/upload").build()
    }

    fn response_headers() -> ResponseHeaders {
        let mut builder = ResponseHeadersBuilder::new();
        builder.add_http_status(200);
        builder.build()
    }

    fn strict(buffer_limit_bytes: usize) -> FilterConfig {
        FilterConfig {
            buffer_limit_bytes,
            strict_contract: true,
        }
    }

    fn lenient() -> FilterConfig {
        FilterConfig {
            buffer_limit_bytes: 1024,
            strict_contract: false,
        }
    }

    struct Harness {
        manager: FilterManager,
        queue: DeliveryQueue,
        events: UnboundedReceiver<StreamEvent>,
    }

    fn harness(instances: Vec<FilterInstance>) -> Harness {
        harness_with(instances, strict(1024))
    }

    fn harness_with(instances: Vec<FilterInstance>, config: FilterConfig) -> Harness {
        let (queue, events) = DeliveryQueue::channel();
        let manager = FilterManager::new(
            FilterChain::new(instances),
            StreamHandle::from_raw(1),
            queue.downgrade(),
            &config,
        );
        Harness {
            manager,
            queue,
            events,
        }
    }

    impl Harness {
        fn next_request_resume(&mut self) -> usize {
            match self.events.try_recv() {
                Ok(StreamEvent::ResumeRequest { index }) => index,
                _ => panic!("expected a queued request resume"),
            }
        }
    }

    /// Tags headers with its name on both paths and records every call.
    struct Tagger {
        name: &'static str,
        log: Log,
    }

    impl Tagger {
        fn record(&self, event: &str) {
            self.log.lock().unwrap().push(format!("{}:{}", self.name, event));
        }
    }

    impl Filter for Tagger {
        fn name(&self) -> &str {
            self.name
        }
    }

    impl RequestFilter for Tagger {
        fn on_request_headers(
            &mut self,
            headers: RequestHeaders,
            _end_stream: bool,
        ) -> FilterHeadersStatus<RequestHeaders> {
            self.record("request_headers");
            let mut builder = headers.to_builder();
            builder.add("x-seen", self.name);
            FilterHeadersStatus::Continue(builder.build())
        }
    }

    impl ResponseFilter for Tagger {
        fn on_response_headers(
            &mut self,
            headers: ResponseHeaders,
            _end_stream: bool,
        ) -> FilterHeadersStatus<ResponseHeaders> {
            self.record("response_headers");
            let mut builder = headers.to_builder();
            builder.add("x-seen", self.name);
            FilterHeadersStatus::Continue(builder.build())
        }

        fn on_error(&mut self, _error: &StreamError) {
            self.record("error");
        }

        fn on_cancel(&mut self) {
            self.record("cancel");
        }

        fn on_complete(&mut self) {
            self.record("complete");
        }
    }

    fn tagger(name: &'static str, log: &Log) -> FilterInstance {
        FilterInstance::builder(Tagger {
            name,
            log: log.clone(),
        })
        .request()
        .response()
        .build()
    }

    fn seen(headers: &impl Headers) -> Vec<String> {
        headers.value("x-seen").map(<[String]>::to_vec).unwrap_or_default()
    }

    /// Shared view of a [`Gate`] for assertions.
    #[derive(Clone, Default)]
    struct GateLog {
        callbacks: Arc<Mutex<Option<RequestFilterCallbacks>>>,
        headers_calls: Arc<Mutex<usize>>,
        resumes: Arc<Mutex<Vec<(bool, Option<usize>, bool, bool)>>>,
    }

    impl GateLog {
        fn resume(&self) {
            let callbacks = self.callbacks.lock().unwrap().clone();
            callbacks.expect("callbacks installed").resume_request();
        }
    }

    /// Stops on every phase until resumed out of band.
    struct Gate(GateLog);

    impl Filter for Gate {
        fn name(&self) -> &str {
            "gate"
        }
    }

    impl RequestFilter for Gate {
        fn on_request_headers(
            &mut self,
            _headers: RequestHeaders,
            _end_stream: bool,
        ) -> FilterHeadersStatus<RequestHeaders> {
            *self.0.headers_calls.lock().unwrap() += 1;
            FilterHeadersStatus::StopIteration
        }

        fn on_request_data(
            &mut self,
            body: Bytes,
            _end_stream: bool,
        ) -> FilterDataStatus<RequestHeaders> {
            FilterDataStatus::StopIterationAndBuffer(body)
        }

        fn on_request_trailers(
            &mut self,
            _trailers: RequestTrailers,
        ) -> FilterTrailersStatus<RequestHeaders, RequestTrailers> {
            FilterTrailersStatus::StopIteration
        }
    }

    impl AsyncRequestFilter for Gate {
        fn set_request_filter_callbacks(&mut self, callbacks: RequestFilterCallbacks) {
            *self.0.callbacks.lock().unwrap() = Some(callbacks);
        }

        fn on_resume_request(
            &mut self,
            headers: Option<RequestHeaders>,
            data: Option<Bytes>,
            trailers: Option<RequestTrailers>,
            end_stream: bool,
        ) -> FilterResumeStatus<RequestHeaders, RequestTrailers> {
            self.0.resumes.lock().unwrap().push((
                headers.is_some(),
                data.as_ref().map(Bytes::len),
                trailers.is_some(),
                end_stream,
            ));
            FilterResumeStatus::ResumeIteration {
                headers,
                data,
                trailers,
            }
        }
    }

    fn gate() -> (FilterInstance, GateLog) {
        let gated = GateLog::default();
        let instance = FilterInstance::builder(Gate(gated.clone())).async_request().build();
        (instance, gated)
    }

    #[test]
    fn continue_only_chain_is_transparent() {
        let log = Log::default();
        let mut h = harness(vec![FilterInstance::request(Tagger { name: "t", log: log.clone() })]);
        let mut expected = request_headers().to_builder();
        expected.add("x-seen", "t");

        let out = h.manager.send_request_headers(request_headers(), false);
        assert_eq!(out, vec![Forward::Headers(expected.build(), false)]);

        let out = h.manager.send_request_data(Bytes::from_static(b"abc"), true).unwrap();
        assert_eq!(out, vec![Forward::Data(Bytes::from_static(b"abc"), true)]);

        let trailers = ResponseTrailersBuilder::new().build();
        let out = h.manager.receive_response_trailers(trailers.clone()).unwrap();
        assert_eq!(out, vec![Forward::Trailers(trailers)]);
    }

    #[test]
    fn empty_chain_forwards_everything() {
        let mut h = harness(vec![]);
        let out = h.manager.send_request_headers(request_headers(), true);
        assert_eq!(out, vec![Forward::Headers(request_headers(), true)]);
        let out = h.manager.receive_response_headers(response_headers(), false);
        assert_eq!(out, vec![Forward::Headers(response_headers(), false)]);
    }

    #[test]
    fn response_chain_runs_in_reverse() {
        let log = Log::default();
        let mut h = harness(vec![tagger("a", &log), tagger("b", &log)]);

        let out = h.manager.send_request_headers(request_headers(), true);
        let Forward::Headers(sent, true) = &out[0] else {
            panic!("expected headers with end of stream");
        };
        assert_eq!(seen(sent), vec!["a", "b"]);

        let out = h.manager.receive_response_headers(response_headers(), true);
        let Forward::Headers(received, true) = &out[0] else {
            panic!("expected headers with end of stream");
        };
        assert_eq!(seen(received), vec!["b", "a"]);

        h.manager.notify_complete();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:request_headers",
                "b:request_headers",
                "b:response_headers",
                "a:response_headers",
                "b:complete",
                "a:complete",
            ]
        );
    }

    #[test]
    fn halt_then_resume_forwards_once() {
        let log = Log::default();
        let (gate, gated) = gate();
        let mut h = harness(vec![gate, tagger("after", &log)]);

        assert!(h.manager.send_request_headers(request_headers(), false).is_empty());
        assert!(h
            .manager
            .send_request_data(Bytes::from_static(b"hello "), false)
            .unwrap()
            .is_empty());
        assert!(h
            .manager
            .send_request_data(Bytes::from_static(b"world"), true)
            .unwrap()
            .is_empty());
        assert!(log.lock().unwrap().is_empty());

        // nothing resumes on its own
        assert!(h.events.try_recv().is_err());
        gated.resume();
        let index = h.next_request_resume();
        assert_eq!(index, 0);

        let out = h.manager.resume_request(index).unwrap();
        assert_eq!(out.len(), 2);
        let Forward::Headers(headers, false) = &out[0] else {
            panic!("expected headers first");
        };
        assert_eq!(seen(headers), vec!["after"]);
        assert_eq!(out[1], Forward::Data(Bytes::from_static(b"hello world"), true));

        assert_eq!(*gated.resumes.lock().unwrap(), vec![(true, Some(11), false, true)]);
        assert_eq!(*gated.headers_calls.lock().unwrap(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["after:request_headers"]);
    }

    #[test]
    fn resume_with_only_end_of_stream_held() {
        let (gate, gated) = gate();
        let mut h = harness(vec![gate]);

        assert!(h.manager.send_request_headers(request_headers(), true).is_empty());

        gated.resume();
        let index = h.next_request_resume();
        let out = h.manager.resume_request(index).unwrap();
        assert_eq!(out, vec![Forward::Headers(request_headers(), true)]);
    }

    #[test]
    fn resume_carries_held_trailers() {
        let (gate, gated) = gate();
        let mut h = harness(vec![gate]);

        h.manager.send_request_headers(request_headers(), false);
        h.manager.send_request_data(Bytes::from_static(b"body"), false).unwrap();
        let mut trailers = RequestTrailersBuilder::new();
        trailers.add("x-checksum", "abc");
        let trailers = trailers.build();
        assert!(h.manager.send_request_trailers(trailers.clone()).unwrap().is_empty());

        gated.resume();
        let index = h.next_request_resume();
        let out = h.manager.resume_request(index).unwrap();
        assert_eq!(
            out,
            vec![
                Forward::Headers(request_headers(), false),
                Forward::Data(Bytes::from_static(b"body"), false),
                Forward::Trailers(trailers),
            ]
        );
    }

    #[test]
    fn resume_from_inside_callback_is_queued() {
        struct Eager {
            callbacks: Option<RequestFilterCallbacks>,
        }
        impl Filter for Eager {}
        impl RequestFilter for Eager {
            fn on_request_headers(
                &mut self,
                _headers: RequestHeaders,
                _end_stream: bool,
            ) -> FilterHeadersStatus<RequestHeaders> {
                if let Some(callbacks) = &self.callbacks {
                    callbacks.resume_request();
                }
                FilterHeadersStatus::StopIteration
            }
        }
        impl AsyncRequestFilter for Eager {
            fn set_request_filter_callbacks(&mut self, callbacks: RequestFilterCallbacks) {
                self.callbacks = Some(callbacks);
            }
            fn on_resume_request(
                &mut self,
                _headers: Option<RequestHeaders>,
                _data: Option<Bytes>,
                _trailers: Option<RequestTrailers>,
                _end_stream: bool,
            ) -> FilterResumeStatus<RequestHeaders, RequestTrailers> {
                FilterResumeStatus::resume_unchanged()
            }
        }

        let mut h = harness(vec![FilterInstance::builder(Eager { callbacks: None })
            .async_request()
            .build()]);
        assert!(h.manager.send_request_headers(request_headers(), true).is_empty());

        let index = h.next_request_resume();
        let out = h.manager.resume_request(index).unwrap();
        assert_eq!(out, vec![Forward::Headers(request_headers(), true)]);
    }

    /// Buffers data and releases it inline once it has seen `threshold` bytes.
    struct Batcher {
        threshold: usize,
        released: bool,
    }

    impl Filter for Batcher {}

    impl ResponseFilter for Batcher {
        fn on_response_headers(
            &mut self,
            _headers: ResponseHeaders,
            _end_stream: bool,
        ) -> FilterHeadersStatus<ResponseHeaders> {
            FilterHeadersStatus::StopIteration
        }

        fn on_response_data(
            &mut self,
            body: Bytes,
            end_stream: bool,
        ) -> FilterDataStatus<ResponseHeaders> {
            if self.released {
                return FilterDataStatus::Continue(body);
            }
            if body.len() >= self.threshold || end_stream {
                self.released = true;
                FilterDataStatus::ResumeIteration {
                    headers: None,
                    data: body,
                }
            } else {
                FilterDataStatus::StopIterationAndBuffer(body)
            }
        }
    }

    #[test]
    fn inline_resume_from_data() {
        let mut h = harness(vec![FilterInstance::response(Batcher {
            threshold: 6,
            released: false,
        })]);

        assert!(h.manager.receive_response_headers(response_headers(), false).is_empty());
        assert!(h
            .manager
            .receive_response_data(Bytes::from_static(b"abc"), false)
            .unwrap()
            .is_empty());
        let out = h.manager.receive_response_data(Bytes::from_static(b"def"), false).unwrap();
        assert_eq!(
            out,
            vec![
                Forward::Headers(response_headers(), false),
                Forward::Data(Bytes::from_static(b"abcdef"), false),
            ]
        );

        let out = h.manager.receive_response_data(Bytes::from_static(b"g"), true).unwrap();
        assert_eq!(out, vec![Forward::Data(Bytes::from_static(b"g"), true)]);
    }

    /// Stops without buffering, then resumes with a replacement body.
    struct Replacer;

    impl Filter for Replacer {}

    impl RequestFilter for Replacer {
        fn on_request_data(
            &mut self,
            _body: Bytes,
            end_stream: bool,
        ) -> FilterDataStatus<RequestHeaders> {
            if end_stream {
                FilterDataStatus::ResumeIteration {
                    headers: None,
                    data: Bytes::from_static(b"replaced"),
                }
            } else {
                FilterDataStatus::StopIterationNoBuffer
            }
        }
    }

    #[test]
    fn no_buffer_drops_data() {
        let mut h = harness(vec![FilterInstance::request(Replacer)]);

        let out = h.manager.send_request_headers(request_headers(), false);
        assert_eq!(out.len(), 1);
        assert!(h.manager.send_request_data(Bytes::from_static(b"one"), false).unwrap().is_empty());
        let out = h.manager.send_request_data(Bytes::from_static(b"two"), true).unwrap();
        assert_eq!(out, vec![Forward::Data(Bytes::from_static(b"replaced"), true)]);
    }

    #[test]
    fn buffer_limit_fails_stream() {
        let (gate, _gated) = gate();
        let mut h = harness_with(vec![gate], strict(8));

        h.manager.send_request_headers(request_headers(), false);
        h.manager.send_request_data(Bytes::from_static(b"12345"), false).unwrap();
        let err = h.manager.send_request_data(Bytes::from_static(b"6789"), false).unwrap_err();
        assert_eq!(err.code, ErrorCode::BufferLimitExceeded);
    }

    #[test]
    fn buffer_limit_applies_per_filter() {
        let (first, first_gated) = gate();
        let (second, _second_gated) = gate();
        let mut h = harness_with(vec![first, second], strict(8));

        h.manager.send_request_headers(request_headers(), false);
        h.manager.send_request_data(Bytes::from_static(b"123456"), false).unwrap();
        first_gated.resume();
        let index = h.next_request_resume();
        // the second gate now holds the headers and the first six bytes
        assert!(h.manager.resume_request(index).unwrap().is_empty());

        h.manager.send_request_data(Bytes::from_static(b"abcdef"), false).unwrap();
        assert_eq!(h.manager.request.buffered_bytes(), 12);
    }

    #[test]
    #[should_panic(expected = "broke the filter contract")]
    fn strict_resume_while_running_panics() {
        let (gate, _gated) = gate();
        let mut h = harness(vec![gate]);
        let _ = h.manager.resume_request(0);
    }

    #[test]
    fn lenient_resume_while_running_is_ignored() {
        let (gate, _gated) = gate();
        let mut h = harness_with(vec![gate], lenient());
        assert!(h.manager.resume_request(0).unwrap().is_empty());
        assert!(h.manager.resume_request(7).unwrap().is_empty());
    }

    /// Stops on headers but answers data with the default Continue.
    struct Sloppy;

    impl Filter for Sloppy {}

    impl RequestFilter for Sloppy {
        fn on_request_headers(
            &mut self,
            _headers: RequestHeaders,
            _end_stream: bool,
        ) -> FilterHeadersStatus<RequestHeaders> {
            FilterHeadersStatus::StopIteration
        }
    }

    #[test]
    fn lenient_continue_while_stopped_keeps_data() {
        let mut h = harness_with(vec![FilterInstance::request(Sloppy)], lenient());
        h.manager.send_request_headers(request_headers(), false);
        assert!(h
            .manager
            .send_request_data(Bytes::from_static(b"kept"), false)
            .unwrap()
            .is_empty());
        assert_eq!(h.manager.request.buffered_bytes(), 4);
    }

    #[test]
    #[should_panic(expected = "Continue returned while iteration is stopped")]
    fn strict_continue_while_stopped_panics() {
        let mut h = harness(vec![FilterInstance::request(Sloppy)]);
        h.manager.send_request_headers(request_headers(), false);
        let _ = h.manager.send_request_data(Bytes::from_static(b"x"), false);
    }

    /// Async response filter that stops on headers and records errors.
    #[derive(Clone, Default)]
    struct HoldLog {
        callbacks: Arc<Mutex<Option<ResponseFilterCallbacks>>>,
        errors: Log,
    }

    struct Hold(HoldLog);

    impl Filter for Hold {}

    impl ResponseFilter for Hold {
        fn on_response_headers(
            &mut self,
            _headers: ResponseHeaders,
            _end_stream: bool,
        ) -> FilterHeadersStatus<ResponseHeaders> {
            FilterHeadersStatus::StopIteration
        }

        fn on_error(&mut self, error: &StreamError) {
            self.0.errors.lock().unwrap().push(error.message.clone());
        }
    }

    impl AsyncResponseFilter for Hold {
        fn set_response_filter_callbacks(&mut self, callbacks: ResponseFilterCallbacks) {
            *self.0.callbacks.lock().unwrap() = Some(callbacks);
        }

        fn on_resume_response(
            &mut self,
            _headers: Option<ResponseHeaders>,
            _data: Option<Bytes>,
            _trailers: Option<ResponseTrailers>,
            _end_stream: bool,
        ) -> FilterResumeStatus<ResponseHeaders, ResponseTrailers> {
            FilterResumeStatus::resume_unchanged()
        }
    }

    #[test]
    fn error_reaches_stopped_and_running_filters() {
        let log = Log::default();
        let held = HoldLog::default();
        let mut h = harness(vec![
            FilterInstance::builder(Hold(held.clone())).async_response().build(),
            tagger("outer", &log),
        ]);

        // reverse order: "outer" runs first, then the stopping filter
        assert!(h.manager.receive_response_headers(response_headers(), false).is_empty());
        h.manager.notify_error(&StreamError::new(ErrorCode::StreamReset, "reset"));

        assert_eq!(*held.errors.lock().unwrap(), vec!["reset"]);
        assert_eq!(*log.lock().unwrap(), vec!["outer:response_headers", "outer:error"]);
        assert_eq!(h.manager.response.buffered_bytes(), 0);

        // the response index is the position in the reversed chain
        let callbacks = held.callbacks.lock().unwrap().clone().unwrap();
        callbacks.resume_response();
        let Ok(StreamEvent::ResumeResponse { index }) = h.events.try_recv() else {
            panic!("expected a queued response resume");
        };
        assert_eq!(index, 1);
    }

    #[test]
    fn resume_after_queue_dropped_is_noop() {
        let (gate, gated) = gate();
        let h = harness(vec![gate]);
        drop(h.events);
        drop(h.queue);
        gated.resume();
        drop(h.manager);
    }
}
