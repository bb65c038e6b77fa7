//! The per-stream delivery queue.
//!
//! Every input to a stream (application sends, engine callbacks, filter
//! resumes, cancellation) becomes a [`StreamEvent`] on one unbounded channel.
//! The stream driver is the single consumer, so all filter and codec work for
//! a stream happens serially on one task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};

use crate::error::StreamError;
use crate::headers::{HeaderContainer, RequestHeaders, RequestTrailers};

pub(crate) enum StreamEvent {
    SendHeaders { headers: RequestHeaders, end_stream: bool },
    SendData { data: Bytes, end_stream: bool },
    SendTrailers(RequestTrailers),
    ResumeRequest { index: usize },
    ResponseHeaders { headers: HeaderContainer, end_stream: bool },
    ResponseData { data: Bytes, end_stream: bool },
    ResponseTrailers(HeaderContainer),
    ResumeResponse { index: usize },
    Error(StreamError),
    /// Cancel requested by the application.
    Cancel,
    /// Cancel reported by the engine.
    EngineCancel,
    Complete,
}

impl StreamEvent {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            StreamEvent::SendHeaders { .. } => "send_headers",
            StreamEvent::SendData { .. } => "send_data",
            StreamEvent::SendTrailers(_) => "send_trailers",
            StreamEvent::ResumeRequest { .. } => "resume_request",
            StreamEvent::ResponseHeaders { .. } => "response_headers",
            StreamEvent::ResponseData { .. } => "response_data",
            StreamEvent::ResponseTrailers(_) => "response_trailers",
            StreamEvent::ResumeResponse { .. } => "resume_response",
            StreamEvent::Error(_) => "error",
            StreamEvent::Cancel => "cancel",
            StreamEvent::EngineCancel => "engine_cancel",
            StreamEvent::Complete => "complete",
        }
    }
}

/// Sending half of a stream's delivery queue plus its cancel flag.
#[derive(Clone)]
pub(crate) struct DeliveryQueue {
    tx: UnboundedSender<StreamEvent>,
    cancelled: Arc<AtomicBool>,
}

impl DeliveryQueue {
    pub(crate) fn channel() -> (Self, UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self {
            tx,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        (queue, rx)
    }

    /// Enqueue an event. Returns false once the driver has gone away.
    pub(crate) fn push(&self, event: StreamEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Flip the cancel flag and enqueue the terminal cancel.
    ///
    /// Returns false if the stream was already cancelled.
    pub(crate) fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.push(StreamEvent::Cancel);
        true
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// A handle that does not keep the queue open.
    pub(crate) fn downgrade(&self) -> WeakDeliveryQueue {
        WeakDeliveryQueue {
            tx: self.tx.downgrade(),
        }
    }
}

/// Non-owning handle given to filters, which live inside the driver itself.
#[derive(Clone)]
pub(crate) struct WeakDeliveryQueue {
    tx: WeakUnboundedSender<StreamEvent>,
}

impl WeakDeliveryQueue {
    pub(crate) fn push(&self, event: StreamEvent) -> bool {
        self.tx
            .upgrade()
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false)
    }
}
