//! Application callbacks for response events.

use bytes::Bytes;

use crate::error::StreamError;
use crate::headers::{ResponseHeaders, ResponseTrailers};

pub(crate) type HeadersCallback = Box<dyn FnMut(ResponseHeaders, bool) + Send>;
pub(crate) type DataCallback = Box<dyn FnMut(Bytes, bool) + Send>;
pub(crate) type TrailersCallback = Box<dyn FnMut(ResponseTrailers) + Send>;
pub(crate) type ErrorCallback = Box<dyn FnMut(StreamError) + Send>;
pub(crate) type EventCallback = Box<dyn FnMut() + Send>;

/// Callbacks run on the stream's driver task, one at a time.
#[derive(Default)]
pub(crate) struct ResponseCallbacks {
    pub(crate) on_headers: Option<HeadersCallback>,
    pub(crate) on_data: Option<DataCallback>,
    pub(crate) on_trailers: Option<TrailersCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) on_cancel: Option<EventCallback>,
    pub(crate) on_complete: Option<EventCallback>,
}
