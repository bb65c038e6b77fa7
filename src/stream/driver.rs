//! The task that owns a stream's filter manager.
//!
//! # Responsibilities
//! - Consume the delivery queue serially
//! - Route request entities to the engine and response entities to the app
//! - Guarantee exactly one terminal notification (error, cancel or complete)
//! - Turn a panicking filter into a failed stream instead of a silent hang
//!
//! # Data Flow
//! ```text
//! Stream handle ─┐
//! EngineCallbacks├─► delivery queue ─► StreamDriver ─► FilterManager
//! filter resumes ┘                         │
//!                          ┌───────────────┴───────────────┐
//!                          ▼                               ▼
//!                    Engine::send_*              ResponseCallbacks (app)
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::engine::{Engine, StreamHandle};
use crate::error::{ErrorCode, StreamError};
use crate::filter::manager::{FilterManager, RequestForwards, ResponseForwards};
use crate::filter::pipeline::Forward;
use crate::headers::sealed::FromContainer;
use crate::headers::{ResponseHeaders, ResponseTrailers};
use crate::stream::callbacks::ResponseCallbacks;
use crate::stream::event::StreamEvent;
use crate::stream::state::{AtomicStreamState, StreamState};

pub(crate) struct StreamDriver {
    handle: StreamHandle,
    engine: Weak<dyn Engine>,
    manager: FilterManager,
    callbacks: ResponseCallbacks,
    state: Arc<AtomicStreamState>,
    cancelled: Arc<AtomicBool>,
    /// The response end of stream has reached the application.
    response_finished: bool,
    /// The engine reported completion before the response end was delivered.
    completion_pending: bool,
    finished: bool,
}

impl StreamDriver {
    pub(crate) fn new(
        handle: StreamHandle,
        engine: Weak<dyn Engine>,
        manager: FilterManager,
        callbacks: ResponseCallbacks,
        state: Arc<AtomicStreamState>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            handle,
            engine,
            manager,
            callbacks,
            state,
            cancelled,
            response_finished: false,
            completion_pending: false,
            finished: false,
        }
    }

    pub(crate) async fn run(mut self, mut events: UnboundedReceiver<StreamEvent>) {
        tracing::debug!(stream = %self.handle, "Stream driver started");

        while let Some(event) = events.recv().await {
            if self.cancelled.load(Ordering::Acquire) && !matches!(event, StreamEvent::Cancel) {
                tracing::trace!(stream = %self.handle, event = event.kind(), "Dropping event after cancel");
                continue;
            }
            self.dispatch(event);
            if self.finished {
                break;
            }
        }

        if !self.finished {
            tracing::debug!(stream = %self.handle, "Delivery queue closed before the stream finished");
            self.manager.release();
        }
        tracing::debug!(stream = %self.handle, state = ?self.state.load(), "Stream driver stopped");
    }

    fn dispatch(&mut self, event: StreamEvent) {
        let kind = event.kind();
        tracing::trace!(stream = %self.handle, event = kind, "Dispatching stream event");
        match panic::catch_unwind(AssertUnwindSafe(|| self.handle_event(event))) {
            Ok(Ok(())) => {}
            Ok(Err(error)) => self.fail(error),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(stream = %self.handle, event = kind, panic = %message, "Stream callback panicked");
                self.fail(StreamError::new(ErrorCode::FilterFailure, message));
            }
        }
    }

    fn handle_event(&mut self, event: StreamEvent) -> Result<(), StreamError> {
        match event {
            StreamEvent::SendHeaders { headers, end_stream } => {
                let out = self.manager.send_request_headers(headers, end_stream);
                self.forward_request(out);
            }
            StreamEvent::SendData { data, end_stream } => {
                let out = self.manager.send_request_data(data, end_stream)?;
                self.forward_request(out);
            }
            StreamEvent::SendTrailers(trailers) => {
                let out = self.manager.send_request_trailers(trailers)?;
                self.forward_request(out);
            }
            StreamEvent::ResumeRequest { index } => {
                let out = self.manager.resume_request(index)?;
                self.forward_request(out);
            }
            StreamEvent::ResponseHeaders { headers, end_stream } => {
                let headers = ResponseHeaders::from_container(headers);
                let out = self.manager.receive_response_headers(headers, end_stream);
                self.deliver_response(out);
            }
            StreamEvent::ResponseData { data, end_stream } => {
                let out = self.manager.receive_response_data(data, end_stream)?;
                self.deliver_response(out);
            }
            StreamEvent::ResponseTrailers(trailers) => {
                let trailers = ResponseTrailers::from_container(trailers);
                let out = self.manager.receive_response_trailers(trailers)?;
                self.deliver_response(out);
            }
            StreamEvent::ResumeResponse { index } => {
                let out = self.manager.resume_response(index)?;
                self.deliver_response(out);
            }
            StreamEvent::Error(error) => self.finish_errored(error),
            StreamEvent::Cancel | StreamEvent::EngineCancel => self.finish_cancelled(),
            StreamEvent::Complete => {
                self.completion_pending = true;
                self.try_complete();
            }
        }
        Ok(())
    }

    fn forward_request(&self, out: RequestForwards) {
        if out.is_empty() {
            return;
        }
        let Some(engine) = self.engine.upgrade() else {
            tracing::debug!(
                stream = %self.handle,
                dropped = out.len(),
                "Engine no longer running, dropping request entities"
            );
            return;
        };
        for forward in out {
            match forward {
                Forward::Headers(headers, end_stream) => {
                    engine.send_headers(self.handle, headers, end_stream)
                }
                Forward::Data(data, end_stream) => engine.send_data(self.handle, data, end_stream),
                Forward::Trailers(trailers) => engine.send_trailers(self.handle, trailers),
            }
        }
    }

    fn deliver_response(&mut self, out: ResponseForwards) {
        for forward in out {
            if forward.ends_stream() {
                self.response_finished = true;
            }
            match forward {
                Forward::Headers(headers, end_stream) => {
                    if let Some(callback) = self.callbacks.on_headers.as_mut() {
                        callback(headers, end_stream);
                    }
                }
                Forward::Data(data, end_stream) => {
                    if let Some(callback) = self.callbacks.on_data.as_mut() {
                        callback(data, end_stream);
                    }
                }
                Forward::Trailers(trailers) => {
                    if let Some(callback) = self.callbacks.on_trailers.as_mut() {
                        callback(trailers);
                    }
                }
            }
        }
        self.try_complete();
    }

    /// Fail the stream for a locally detected error.
    fn fail(&mut self, error: StreamError) {
        match self.engine.upgrade() {
            Some(engine) => engine.cancel(self.handle),
            None => tracing::debug!(stream = %self.handle, "Engine no longer running, nothing to reset"),
        }
        self.finish_errored(error);
    }

    fn finish_errored(&mut self, error: StreamError) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.state.store(StreamState::Errored);
        tracing::warn!(
            stream = %self.handle,
            code = %error.code,
            message = %error.message,
            attempts = ?error.attempt_count,
            "Stream failed"
        );
        guard_filters(self.handle, "error", || self.manager.notify_error(&error));
        if let Some(callback) = self.callbacks.on_error.as_mut() {
            callback(error);
        }
    }

    fn finish_cancelled(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.state.store(StreamState::Cancelled);
        tracing::debug!(stream = %self.handle, "Stream cancelled");
        guard_filters(self.handle, "cancel", || self.manager.notify_cancel());
        if let Some(callback) = self.callbacks.on_cancel.as_mut() {
            callback();
        }
    }

    fn try_complete(&mut self) {
        if self.finished || !self.completion_pending {
            return;
        }
        if !self.response_finished {
            tracing::trace!(stream = %self.handle, "Completion held until the response end is delivered");
            return;
        }
        self.finished = true;
        self.state.store(StreamState::Completed);
        tracing::debug!(stream = %self.handle, "Stream complete");
        guard_filters(self.handle, "complete", || self.manager.notify_complete());
        if let Some(callback) = self.callbacks.on_complete.as_mut() {
            callback();
        }
    }
}

/// Notify filters of a terminal event. A panicking filter is logged and skipped.
fn guard_filters(handle: StreamHandle, phase: &'static str, notify: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(notify)) {
        tracing::error!(
            stream = %handle,
            phase,
            panic = %panic_message(payload.as_ref()),
            "Filter panicked during terminal notification"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "filter panicked".to_string()
    }
}
