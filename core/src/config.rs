//! Driver configuration for resource limits.
//!
//! This module provides [`DriverConfig`] for bounding how much a single
//! session may ask the [`Driver`](crate::Driver) to buffer.
//!
//! # Request Limits
//!
//! A session decides its own request sizes, often from bytes it has just read
//! (a length prefix, for example). An untrusted stream can therefore ask the
//! driver to allocate an arbitrarily large owned buffer as soon as the request
//! spans two chunks. Setting [`DriverConfig::max_request_bytes`] turns such a
//! request into [`StreamError::RequestTooLarge`](crate::StreamError) instead.
//!
//! # Idle Sessions
//!
//! A session may complete without reading anything, such as a header value a
//! stateful parser hands out before its byte-reading sessions. A parser that
//! only ever produces such sessions would spin forever on the same input, so
//! [`DriverConfig::max_idle_sessions`] bounds how many may complete in a row
//! before the stream fails with [`StreamError::Stalled`](crate::StreamError).
//!
//! # Example
//!
//! ```ignore
//! use chunkwise_core::config::DriverConfig;
//!
//! // No limit (default)
//! let config = DriverConfig::default();
//!
//! // Refuse requests above 1 MiB
//! let config = DriverConfig::new()
//!     .with_max_request_bytes(1 << 20);
//! ```

use crate::StreamError;

/// Configuration for driver behavior and resource limits.
///
/// # Default Values
///
/// | Setting | Default | Rationale |
/// |---------|---------|-----------|
/// | `max_request_bytes` | `usize::MAX` | No limit by default |
/// | `push_capacity_hint` | 4 | Typical pushes per step |
/// | `max_idle_sessions` | 16 | Room for header sessions |
///
/// # Example
///
/// ```ignore
/// let config = DriverConfig::new().with_max_request_bytes(64 * 1024);
/// let mut driver = Driver::with_config(parser, config);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Maximum size of a single request, in bytes.
    ///
    /// Checked after converting an element count into bytes, so a typed view
    /// with a wide element reaches the limit with a smaller count.
    ///
    /// Default: `usize::MAX` (no limit)
    pub max_request_bytes: usize,

    /// Initial capacity of the queue holding values a session pushes during
    /// one step.
    ///
    /// Default: 4
    pub push_capacity_hint: usize,

    /// Number of consecutive sessions that may complete without consuming a
    /// byte. The next one fails the stream as stalled.
    ///
    /// A session that keeps requesting zero elements without completing is
    /// not bounded here.
    ///
    /// Default: 16
    pub max_idle_sessions: usize,
}

impl Default for DriverConfig {
    /// Returns the default configuration.
    ///
    /// - `max_request_bytes`: `usize::MAX`
    /// - `push_capacity_hint`: 4
    /// - `max_idle_sessions`: 16
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl DriverConfig {
    /// Default configuration, usable in const contexts.
    pub const DEFAULT: Self = Self {
        max_request_bytes: usize::MAX,
        push_capacity_hint: 4,
        max_idle_sessions: 16,
    };

    /// Creates a new configuration with default values.
    #[inline]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    /// Sets the maximum request size in bytes.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Largest request a session may make. Use `usize::MAX` to disable.
    #[inline]
    pub const fn with_max_request_bytes(mut self, bytes: usize) -> Self {
        self.max_request_bytes = bytes;
        self
    }

    /// Sets the initial capacity of the push queue.
    #[inline]
    pub const fn with_push_capacity_hint(mut self, capacity: usize) -> Self {
        self.push_capacity_hint = capacity;
        self
    }

    /// Sets how many sessions in a row may complete without consuming input.
    #[inline]
    pub const fn with_max_idle_sessions(mut self, sessions: usize) -> Self {
        self.max_idle_sessions = sessions;
        self
    }

    /// Never fail a stream for completing sessions without consuming input.
    ///
    /// # Warning
    ///
    /// A parser whose sessions never read will then enqueue values forever
    /// from a single call.
    #[inline]
    pub const fn disable_stall_check(self) -> Self {
        self.with_max_idle_sessions(usize::MAX)
    }

    /// Removes the request size limit.
    ///
    /// # Warning
    ///
    /// Only use this when the stream is trusted! A hostile length prefix can
    /// otherwise make the driver allocate an arbitrarily large buffer.
    #[inline]
    pub const fn disable_request_limit(self) -> Self {
        self.with_max_request_bytes(usize::MAX)
    }

    /// Converts a request of `count` elements of `width` bytes into a byte
    /// count, enforcing [`max_request_bytes`](Self::max_request_bytes).
    pub fn request_bytes<E>(&self, count: usize, width: usize) -> Result<usize, StreamError<E>> {
        let bytes = count
            .checked_mul(width)
            .ok_or(StreamError::RequestTooLarge {
                requested: usize::MAX,
                max: self.max_request_bytes,
            })?;
        if bytes > self.max_request_bytes {
            Err(StreamError::RequestTooLarge {
                requested: bytes,
                max: self.max_request_bytes,
            })
        } else {
            Ok(bytes)
        }
    }
}
