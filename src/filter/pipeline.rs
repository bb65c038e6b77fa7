//! Iteration over one direction of a filter chain.
//!
//! # Responsibilities
//! - Run headers, data and trailers through the chain in order
//! - Hold entities at a stopped filter and own its data buffer
//! - Restart iteration after a resume, carrying held entities downstream
//! - Enforce the buffer limit
//!
//! # Data Flow
//! ```text
//! entity ──► filter[0] ──► filter[1] ──► ... ──► Forward (engine or app)
//!                              │
//!                         StopIteration
//!                              │
//!                     held at filter[1] ◄── more data (aggregated)
//!                              │
//!                      resume ─┴─► filter[2] ──► ...
//! ```
//!
//! # Design Decisions
//! - The pipeline never calls the transport directly; it returns the entities
//!   that left the chain as a list of [`Forward`]s for the caller to deliver.
//! - End of stream is remembered per filter so a resumed filter forwards the
//!   right end flag, even when only the end itself was held.

use bytes::{Bytes, BytesMut};

use crate::engine::StreamHandle;
use crate::error::{ErrorCode, StreamError};
use crate::filter::status::{
    FilterDataStatus, FilterHeadersStatus, FilterResumeStatus, FilterTrailersStatus,
};
use crate::filter::violation::{report, ContractViolation, Direction};

/// A filter as seen by the pipeline, independent of direction.
pub(crate) trait ChainFilter {
    type Headers: Clone;
    type Trailers: Clone;

    fn name(&self) -> &str;

    fn on_headers(
        &self,
        headers: Self::Headers,
        end_stream: bool,
    ) -> FilterHeadersStatus<Self::Headers>;

    fn on_data(&self, data: Bytes, end_stream: bool) -> FilterDataStatus<Self::Headers>;

    fn on_trailers(
        &self,
        trailers: Self::Trailers,
    ) -> FilterTrailersStatus<Self::Headers, Self::Trailers>;

    /// `None` when the filter has no resume support.
    fn on_resume(
        &self,
        headers: Option<Self::Headers>,
        data: Option<Bytes>,
        trailers: Option<Self::Trailers>,
        end_stream: bool,
    ) -> Option<FilterResumeStatus<Self::Headers, Self::Trailers>>;
}

/// An entity that made it through the whole chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Forward<H, T> {
    Headers(H, bool),
    Data(Bytes, bool),
    Trailers(T),
}

impl<H, T> Forward<H, T> {
    pub(crate) fn ends_stream(&self) -> bool {
        match self {
            Forward::Headers(_, end_stream) | Forward::Data(_, end_stream) => *end_stream,
            Forward::Trailers(_) => true,
        }
    }
}

pub(crate) type Forwards<F> =
    Vec<Forward<<F as ChainFilter>::Headers, <F as ChainFilter>::Trailers>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Headers,
    Data,
    Trailers,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Headers => "headers",
            Phase::Data => "data",
            Phase::Trailers => "trailers",
        }
    }
}

struct FilterState<H, T> {
    stopped_at: Option<Phase>,
    held_headers: Option<H>,
    buffer: BytesMut,
    held_trailers: Option<T>,
    end_stream: bool,
}

impl<H, T> FilterState<H, T> {
    fn new() -> Self {
        Self {
            stopped_at: None,
            held_headers: None,
            buffer: BytesMut::new(),
            held_trailers: None,
            end_stream: false,
        }
    }
}

pub(crate) struct Pipeline<F: ChainFilter> {
    direction: Direction,
    stream: StreamHandle,
    filters: Vec<F>,
    states: Vec<FilterState<F::Headers, F::Trailers>>,
    buffer_limit: usize,
    strict: bool,
}

impl<F: ChainFilter> Pipeline<F> {
    pub(crate) fn new(
        direction: Direction,
        stream: StreamHandle,
        filters: Vec<F>,
        buffer_limit: usize,
        strict: bool,
    ) -> Self {
        let states = filters.iter().map(|_| FilterState::new()).collect();
        Self {
            direction,
            stream,
            filters,
            states,
            buffer_limit,
            strict,
        }
    }

    pub(crate) fn filters(&self) -> &[F] {
        &self.filters
    }

    pub(crate) fn on_headers(&mut self, headers: F::Headers, end_stream: bool) -> Forwards<F> {
        let mut out = Vec::new();
        self.run_headers(0, headers, end_stream, &mut out);
        out
    }

    pub(crate) fn on_data(
        &mut self,
        data: Bytes,
        end_stream: bool,
    ) -> Result<Forwards<F>, StreamError> {
        let mut out = Vec::new();
        self.run_data(0, data, end_stream, &mut out)?;
        Ok(out)
    }

    pub(crate) fn on_trailers(
        &mut self,
        trailers: F::Trailers,
    ) -> Result<Forwards<F>, StreamError> {
        let mut out = Vec::new();
        self.run_trailers(0, trailers, &mut out)?;
        Ok(out)
    }

    /// Handle an out-of-band resume for the filter at `index`.
    pub(crate) fn resume(&mut self, index: usize) -> Result<Forwards<F>, StreamError> {
        let mut out = Vec::new();
        let Some(state) = self.states.get(index) else {
            tracing::warn!(
                stream = %self.stream,
                direction = %self.direction,
                filter_index = index,
                "Resume for unknown filter index"
            );
            return Ok(out);
        };
        if state.stopped_at.is_none() {
            self.violation(index, ContractViolation::ResumeWhileRunning);
            return Ok(out);
        }

        let headers = state.held_headers.clone();
        let data = (!state.buffer.is_empty()).then(|| Bytes::copy_from_slice(&state.buffer));
        let trailers = state.held_trailers.clone();
        let end_stream = state.end_stream;

        match self.filters[index].on_resume(headers, data, trailers, end_stream) {
            Some(FilterResumeStatus::ResumeIteration {
                headers,
                data,
                trailers,
            }) => self.resume_from(index, headers, data, trailers, &mut out)?,
            None => {
                tracing::debug!(
                    stream = %self.stream,
                    direction = %self.direction,
                    filter = self.filters[index].name(),
                    "Filter has no resume hook, forwarding held entities"
                );
                self.resume_from(index, None, None, None, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Drop every held entity and buffer.
    pub(crate) fn clear(&mut self) {
        for state in &mut self.states {
            *state = FilterState::new();
        }
    }

    /// Bytes currently buffered across the chain.
    pub(crate) fn buffered_bytes(&self) -> usize {
        self.states.iter().map(|state| state.buffer.len()).sum()
    }

    fn run_headers(
        &mut self,
        start: usize,
        mut headers: F::Headers,
        end_stream: bool,
        out: &mut Forwards<F>,
    ) {
        for index in start..self.filters.len() {
            if end_stream {
                self.states[index].end_stream = true;
            }
            let held = headers.clone();
            match self.filters[index].on_headers(headers, end_stream) {
                FilterHeadersStatus::Continue(next) => headers = next,
                FilterHeadersStatus::StopIteration => {
                    self.stop(index, Phase::Headers);
                    self.states[index].held_headers = Some(held);
                    return;
                }
            }
        }
        out.push(Forward::Headers(headers, end_stream));
    }

    fn run_data(
        &mut self,
        start: usize,
        mut data: Bytes,
        end_stream: bool,
        out: &mut Forwards<F>,
    ) -> Result<(), StreamError> {
        for index in start..self.filters.len() {
            if end_stream {
                self.states[index].end_stream = true;
            }
            let stopped = self.states[index].stopped_at.is_some();

            // A stopped filter that is buffering sees the aggregate.
            if stopped && !self.states[index].buffer.is_empty() {
                self.check_limit(index, self.states[index].buffer.len() + data.len())?;
                let state = &mut self.states[index];
                state.buffer.extend_from_slice(&data);
                data = state.buffer.split().freeze();
            }

            match self.filters[index].on_data(data, end_stream) {
                FilterDataStatus::Continue(next) => {
                    if stopped {
                        self.violation(index, ContractViolation::ContinueWhileStopped);
                        return self.hold_data(index, next);
                    }
                    data = next;
                }
                FilterDataStatus::StopIterationAndBuffer(next) => {
                    self.stop(index, Phase::Data);
                    return self.hold_data(index, next);
                }
                FilterDataStatus::StopIterationNoBuffer => {
                    self.stop(index, Phase::Data);
                    self.states[index].buffer.clear();
                    return Ok(());
                }
                FilterDataStatus::ResumeIteration { headers, data: next } => {
                    if !stopped {
                        self.violation(index, ContractViolation::ResumeWhileRunning);
                        data = next;
                        continue;
                    }
                    return self.resume_from(index, headers, Some(next), None, out);
                }
            }
        }
        out.push(Forward::Data(data, end_stream));
        Ok(())
    }

    fn run_trailers(
        &mut self,
        start: usize,
        mut trailers: F::Trailers,
        out: &mut Forwards<F>,
    ) -> Result<(), StreamError> {
        for index in start..self.filters.len() {
            self.states[index].end_stream = true;
            let stopped = self.states[index].stopped_at.is_some();
            let held = trailers.clone();

            match self.filters[index].on_trailers(trailers) {
                FilterTrailersStatus::Continue(next) => {
                    if stopped {
                        self.violation(index, ContractViolation::ContinueWhileStopped);
                        self.states[index].held_trailers = Some(next);
                        return Ok(());
                    }
                    trailers = next;
                }
                FilterTrailersStatus::StopIteration => {
                    self.stop(index, Phase::Trailers);
                    self.states[index].held_trailers = Some(held);
                    return Ok(());
                }
                FilterTrailersStatus::ResumeIteration {
                    headers,
                    data,
                    trailers: next,
                } => {
                    if !stopped {
                        self.violation(index, ContractViolation::ResumeWhileRunning);
                        trailers = next;
                        continue;
                    }
                    return self.resume_from(index, headers, data, Some(next), out);
                }
            }
        }
        out.push(Forward::Trailers(trailers));
        Ok(())
    }

    /// Release the filter at `index` and continue from `index + 1`.
    ///
    /// Each `None` argument falls back to what the filter was holding.
    fn resume_from(
        &mut self,
        index: usize,
        headers: Option<F::Headers>,
        data: Option<Bytes>,
        trailers: Option<F::Trailers>,
        out: &mut Forwards<F>,
    ) -> Result<(), StreamError> {
        let state = &mut self.states[index];
        let held_headers = state.held_headers.take();
        let buffered = state.buffer.split().freeze();
        let held_trailers = state.held_trailers.take();
        let end_stream = state.end_stream;
        let stopped_at = state.stopped_at.take();

        let headers = match (headers, held_headers) {
            (Some(_), None) => {
                self.violation(index, ContractViolation::HeadersAlreadyForwarded);
                None
            }
            (Some(replacement), Some(_)) => Some(replacement),
            (None, held) => held,
        };
        let data = data.or_else(|| (!buffered.is_empty()).then_some(buffered));
        let trailers = trailers.or(held_trailers);

        tracing::debug!(
            stream = %self.stream,
            direction = %self.direction,
            filter = self.filters[index].name(),
            stopped_at = stopped_at.map(|phase| phase.as_str()),
            headers = headers.is_some(),
            data_len = data.as_ref().map(Bytes::len),
            trailers = trailers.is_some(),
            end_stream,
            "Resuming filter iteration"
        );

        let next = index + 1;
        let headers_end = end_stream && data.is_none() && trailers.is_none();
        let sent_headers = headers.is_some();
        if let Some(headers) = headers {
            self.run_headers(next, headers, headers_end, out);
        }
        match data {
            Some(data) => self.run_data(next, data, end_stream && trailers.is_none(), out)?,
            // Only the end of stream was held.
            None if headers_end && !sent_headers => self.run_data(next, Bytes::new(), true, out)?,
            None => {}
        }
        if let Some(trailers) = trailers {
            self.run_trailers(next, trailers, out)?;
        }
        Ok(())
    }

    fn hold_data(&mut self, index: usize, payload: Bytes) -> Result<(), StreamError> {
        self.check_limit(index, payload.len())?;
        let buffer = &mut self.states[index].buffer;
        buffer.clear();
        buffer.extend_from_slice(&payload);
        Ok(())
    }

    fn stop(&mut self, index: usize, phase: Phase) {
        let state = &mut self.states[index];
        if state.stopped_at.is_none() {
            state.stopped_at = Some(phase);
            tracing::trace!(
                stream = %self.stream,
                direction = %self.direction,
                filter = self.filters[index].name(),
                phase = phase.as_str(),
                "Filter stopped iteration"
            );
        }
    }

    fn check_limit(&self, index: usize, size: usize) -> Result<(), StreamError> {
        if size <= self.buffer_limit {
            return Ok(());
        }
        let filter = self.filters[index].name();
        tracing::warn!(
            stream = %self.stream,
            direction = %self.direction,
            filter,
            size,
            limit = self.buffer_limit,
            "Filter buffer limit exceeded"
        );
        Err(StreamError::new(
            ErrorCode::BufferLimitExceeded,
            format!(
                "{} filter {} buffered {} bytes, limit is {}",
                self.direction, filter, size, self.buffer_limit
            ),
        ))
    }

    fn violation(&self, index: usize, violation: ContractViolation) {
        report(self.strict, self.direction, self.filters[index].name(), violation);
    }
}
