//! Receivers of parsed values and of the terminal signal.
//!
//! A [`Sink`] sees any number of [`enqueue`](Sink::enqueue) calls followed by
//! exactly one of [`error`](Sink::error) or [`terminate`](Sink::terminate).
//! The [`Driver`](crate::Driver) guarantees that ordering; sinks do not need to
//! defend against calls after the terminal one.

use crate::error::{SinkError, StreamError};

/// Destination of a parsed stream.
///
/// # Example
///
/// ```ignore
/// struct Printer;
///
/// impl Sink<Packet, Infallible> for Printer {
///     fn enqueue(&mut self, value: Packet) -> Result<(), SinkError> {
///         println!("{value:?}");
///         Ok(())
///     }
///
///     fn error(&mut self, reason: StreamError<Infallible>) {
///         eprintln!("stream failed: {reason}");
///     }
///
///     fn terminate(&mut self) -> Result<(), SinkError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Sink<T, E> {
    /// Accept one value.
    ///
    /// Returning an error ends the stream: the driver reports it back through
    /// [`error`](Self::error).
    fn enqueue(&mut self, value: T) -> Result<(), SinkError>;

    /// The stream ended with an error. Final call.
    fn error(&mut self, reason: StreamError<E>);

    /// The stream ended normally. Final call, unless it fails, in which case
    /// the failure is reported through [`error`](Self::error).
    fn terminate(&mut self) -> Result<(), SinkError>;
}

impl<T, E, S> Sink<T, E> for &mut S
where
    S: Sink<T, E> + ?Sized,
{
    #[inline]
    fn enqueue(&mut self, value: T) -> Result<(), SinkError> {
        (**self).enqueue(value)
    }

    #[inline]
    fn error(&mut self, reason: StreamError<E>) {
        (**self).error(reason)
    }

    #[inline]
    fn terminate(&mut self) -> Result<(), SinkError> {
        (**self).terminate()
    }
}

impl<T, E, S> Sink<T, E> for Box<S>
where
    S: Sink<T, E> + ?Sized,
{
    #[inline]
    fn enqueue(&mut self, value: T) -> Result<(), SinkError> {
        (**self).enqueue(value)
    }

    #[inline]
    fn error(&mut self, reason: StreamError<E>) {
        (**self).error(reason)
    }

    #[inline]
    fn terminate(&mut self) -> Result<(), SinkError> {
        (**self).terminate()
    }
}

/// One call observed by a [`Collect`] sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent<T, E> {
    /// A value was enqueued.
    Enqueue(T),
    /// The stream errored.
    Error(StreamError<E>),
    /// The stream terminated normally.
    Terminate,
}

/// In-memory sink that records every call it receives.
///
/// Useful in tests and for draining a whole input synchronously. It can be
/// configured to fail, to exercise the driver's sink error path.
///
/// # Example
///
/// ```ignore
/// let mut driver = Driver::new(|| FixedChunks::<Bytes>::new(3));
/// driver.start(Collect::new());
/// driver.on_chunk(&b"abcdef"[..]);
/// driver.flush();
///
/// let sink = driver.into_sink().unwrap();
/// assert_eq!(sink.enqueued(), 2);
/// assert!(sink.is_terminated());
/// ```
#[derive(Debug, Clone)]
pub struct Collect<T, E> {
    events: Vec<SinkEvent<T, E>>,
    enqueued: usize,
    capacity: Option<usize>,
    refuse_terminate: bool,
}

impl<T, E> Default for Collect<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Collect<T, E> {
    /// An empty sink that accepts everything.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            enqueued: 0,
            capacity: None,
            refuse_terminate: false,
        }
    }

    /// Reject every value after the first `capacity`.
    pub fn failing_after(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Refuse the terminate signal.
    pub fn failing_terminate(mut self) -> Self {
        self.refuse_terminate = true;
        self
    }

    /// Every call received, in order.
    #[inline]
    pub fn events(&self) -> &[SinkEvent<T, E>] {
        &self.events
    }

    /// The enqueued values, in order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.events.iter().filter_map(|event| match event {
            SinkEvent::Enqueue(value) => Some(value),
            _ => None,
        })
    }

    /// Consume the sink, keeping only the enqueued values.
    pub fn into_values(self) -> Vec<T> {
        self.events
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Enqueue(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Number of accepted values.
    #[inline]
    pub fn enqueued(&self) -> usize {
        self.enqueued
    }

    /// The reported error, if the stream errored.
    pub fn failure(&self) -> Option<&StreamError<E>> {
        self.events.iter().find_map(|event| match event {
            SinkEvent::Error(error) => Some(error),
            _ => None,
        })
    }

    /// Returns true if `terminate` was accepted.
    pub fn is_terminated(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, SinkEvent::Terminate))
    }

    /// Returns true once either terminal call was received.
    pub fn is_closed(&self) -> bool {
        self.terminal_calls() > 0
    }

    /// Number of terminal calls received. Never above one when driven by a
    /// [`Driver`](crate::Driver).
    pub fn terminal_calls(&self) -> usize {
        self.events
            .iter()
            .filter(|event| !matches!(event, SinkEvent::Enqueue(_)))
            .count()
    }
}

impl<T, E> Sink<T, E> for Collect<T, E> {
    fn enqueue(&mut self, value: T) -> Result<(), SinkError> {
        if let Some(capacity) = self.capacity {
            if self.enqueued >= capacity {
                return Err(SinkError::Rejected(format!(
                    "capacity of {capacity} values reached"
                )));
            }
        }
        self.enqueued += 1;
        self.events.push(SinkEvent::Enqueue(value));
        Ok(())
    }

    fn error(&mut self, reason: StreamError<E>) {
        self.events.push(SinkEvent::Error(reason));
    }

    fn terminate(&mut self) -> Result<(), SinkError> {
        if self.refuse_terminate {
            return Err(SinkError::Rejected("terminate refused".into()));
        }
        self.events.push(SinkEvent::Terminate);
        Ok(())
    }
}
