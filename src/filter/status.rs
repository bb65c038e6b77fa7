//! Return values of filter callbacks.
//!
//! Every status is a closed enum; the manager matches them exhaustively.
//! `H` is the headers type of the direction and `T` the trailers type.

use bytes::Bytes;

/// Result of a headers callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterHeadersStatus<H> {
    /// Forward (possibly modified) headers to the next filter.
    Continue(H),
    /// Hold the headers at this filter until it resumes.
    StopIteration,
}

/// Result of a data callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDataStatus<H> {
    /// Forward (possibly modified) data to the next filter.
    Continue(Bytes),
    /// Halt and let the manager keep the returned bytes as the buffer.
    ///
    /// While halted the filter is handed the buffer plus each new chunk, so the
    /// returned payload should be the full aggregate to keep.
    StopIterationAndBuffer(Bytes),
    /// Halt and discard anything buffered so far.
    StopIterationNoBuffer,
    /// Only valid while halted: forward `headers` (if still held) and `data`
    /// downstream and continue iteration.
    ResumeIteration { headers: Option<H>, data: Bytes },
}

/// Result of a trailers callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterTrailersStatus<H, T> {
    Continue(T),
    StopIteration,
    /// Only valid while halted: forward held entities and `trailers`.
    ResumeIteration {
        headers: Option<H>,
        data: Option<Bytes>,
        trailers: T,
    },
}

/// Result of an out-of-band resume.
///
/// `None` for an entity forwards whatever the manager was holding for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterResumeStatus<H, T> {
    ResumeIteration {
        headers: Option<H>,
        data: Option<Bytes>,
        trailers: Option<T>,
    },
}

impl<H, T> FilterResumeStatus<H, T> {
    /// Resume forwarding everything that was held, unchanged.
    pub fn resume_unchanged() -> Self {
        FilterResumeStatus::ResumeIteration {
            headers: None,
            data: None,
            trailers: None,
        }
    }
}
