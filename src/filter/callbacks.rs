//! Handles async filters use to resume iteration.

use std::fmt;

use crate::stream::event::{StreamEvent, WeakDeliveryQueue};

/// Given to an [`AsyncRequestFilter`](crate::filter::AsyncRequestFilter) when its stream starts.
#[derive(Clone)]
pub struct RequestFilterCallbacks {
    index: usize,
    queue: WeakDeliveryQueue,
}

impl RequestFilterCallbacks {
    pub(crate) fn new(index: usize, queue: WeakDeliveryQueue) -> Self {
        Self { index, queue }
    }

    /// Resume request iteration at this filter.
    ///
    /// Callable from any thread, including from inside the filter's own
    /// callbacks; the resume is handled after the current callback returns.
    /// Does nothing once the stream has finished.
    pub fn resume_request(&self) {
        if !self.queue.push(StreamEvent::ResumeRequest { index: self.index }) {
            tracing::debug!(filter_index = self.index, "Request resume dropped, stream finished");
        }
    }
}

impl fmt::Debug for RequestFilterCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestFilterCallbacks")
            .field("index", &self.index)
            .finish()
    }
}

/// Given to an [`AsyncResponseFilter`](crate::filter::AsyncResponseFilter) when its stream starts.
#[derive(Clone)]
pub struct ResponseFilterCallbacks {
    index: usize,
    queue: WeakDeliveryQueue,
}

impl ResponseFilterCallbacks {
    pub(crate) fn new(index: usize, queue: WeakDeliveryQueue) -> Self {
        Self { index, queue }
    }

    /// Resume response iteration at this filter. Same rules as
    /// [`RequestFilterCallbacks::resume_request`].
    pub fn resume_response(&self) {
        if !self.queue.push(StreamEvent::ResumeResponse { index: self.index }) {
            tracing::debug!(filter_index = self.index, "Response resume dropped, stream finished");
        }
    }
}

impl fmt::Debug for ResponseFilterCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFilterCallbacks")
            .field("index", &self.index)
            .finish()
    }
}
