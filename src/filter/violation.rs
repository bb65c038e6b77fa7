//! Filter contract violations.

use std::fmt;

use thiserror::Error;

/// A filter returned a status that is illegal in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("resume requested while iteration is not stopped at this filter")]
    ResumeWhileRunning,

    #[error("Continue returned while iteration is stopped; use ResumeIteration instead")]
    ContinueWhileStopped,

    #[error("headers returned on resume after they were already forwarded")]
    HeadersAlreadyForwarded,
}

/// Which chain a filter runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Request,
    Response,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Request => f.write_str("request"),
            Direction::Response => f.write_str("response"),
        }
    }
}

/// Report a violation: panic when `strict`, otherwise log it so the caller can ignore it.
///
/// The panic unwinds to the stream driver, which fails the stream with
/// [`crate::error::ErrorCode::FilterFailure`].
pub(crate) fn report(
    strict: bool,
    direction: Direction,
    filter: &str,
    violation: ContractViolation,
) {
    if strict {
        panic!("{direction} filter {filter} broke the filter contract: {violation}");
    }
    tracing::error!(
        direction = %direction,
        filter,
        violation = %violation,
        "Filter contract violation ignored"
    );
}
