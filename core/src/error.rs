//! Error types reported to a [`Sink`](crate::Sink).
//!
//! Every failure the [`Driver`](crate::Driver) observes, whether it comes from
//! the parse procedure, its cleanup path, the sink itself or a resource limit,
//! is delivered exactly once through [`Sink::error`](crate::Sink::error). The
//! host-facing methods of the driver never return these errors.
//!
//! User-defined procedures keep their own error type `E`; the driver wraps it
//! in [`StreamError::Procedure`] or [`StreamError::Cleanup`].

use thiserror::Error;

/// Failure reported by a [`Sink`](crate::Sink) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The receiving side of the sink has gone away.
    #[error("sink closed")]
    Closed,

    /// The sink refused the call.
    #[error("sink rejected value: {0}")]
    Rejected(String),
}

/// Terminal error of a parsed stream.
///
/// # Example
///
/// ```ignore
/// match reason {
///     StreamError::Procedure(e) => tracing::error!("bad input: {e}"),
///     StreamError::Cleanup(e) => tracing::error!("flush failed: {e}"),
///     other => tracing::error!("{other}"),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError<E> {
    /// The parse procedure failed while computing a request or a value.
    #[error("parse procedure failed: {0}")]
    Procedure(E),

    /// The session's cleanup path failed during a flush.
    ///
    /// This supersedes whatever reason caused the abort.
    #[error("session cleanup failed: {0}")]
    Cleanup(E),

    /// The sink failed to accept a value or the terminate signal.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// A session asked for more bytes than the configured maximum.
    ///
    /// `requested` saturates at `usize::MAX` when the element count times the
    /// element width overflows.
    #[error("request of {requested} bytes exceeds maximum {max}")]
    RequestTooLarge {
        /// Size of the rejected request, in bytes.
        requested: usize,
        /// Configured maximum, in bytes.
        max: usize,
    },

    /// More sessions than
    /// [`max_idle_sessions`](crate::DriverConfig::max_idle_sessions) completed
    /// in a row without consuming any input.
    #[error("session made no progress on its input")]
    Stalled,
}

impl<E> StreamError<E> {
    /// Short label for the error category, suitable for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamError::Procedure(_) => "procedure",
            StreamError::Cleanup(_) => "cleanup",
            StreamError::Sink(_) => "sink",
            StreamError::RequestTooLarge { .. } => "request_too_large",
            StreamError::Stalled => "stalled",
        }
    }

    /// Returns the procedure's own error, if this error carries one.
    pub fn procedure_error(&self) -> Option<&E> {
        match self {
            StreamError::Procedure(e) | StreamError::Cleanup(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the procedure error type, leaving engine errors untouched.
    pub fn map<F, U>(self, f: F) -> StreamError<U>
    where
        F: FnOnce(E) -> U,
    {
        match self {
            StreamError::Procedure(e) => StreamError::Procedure(f(e)),
            StreamError::Cleanup(e) => StreamError::Cleanup(f(e)),
            StreamError::Sink(e) => StreamError::Sink(e),
            StreamError::RequestTooLarge { requested, max } => {
                StreamError::RequestTooLarge { requested, max }
            }
            StreamError::Stalled => StreamError::Stalled,
        }
    }
}
