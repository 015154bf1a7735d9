//! The resumable parse procedure and its outcome protocol.
//!
//! A [`ParseSession`] is one run of a user-supplied procedure. The driver
//! steps it with `None` first, then with exactly the view it asked for each
//! time it suspended:
//!
//! ```text
//! step(None)        -> Suspended(1)
//! step(Some([3]))   -> Suspended(3)
//! step(Some([a,b,c])) -> Completed(Packet { .. })
//! ```
//!
//! A session that completes is replaced by a fresh one from its [`Parser`].
//! A session may also never complete and instead hand values out through the
//! [`Emitter`] before suspending again; both styles can be mixed.

use crate::view::ElementView;
use bytes::Bytes;

/// Outcome of one step of a [`ParseSession`].
///
/// # Example
///
/// ```ignore
/// match session.step(input, &mut out) {
///     ParseOutcome::Suspended(n) => {
///         // Gather n elements, then step again
///     }
///     ParseOutcome::Completed(value) => {
///         // Forward value, start a new session
///     }
///     ParseOutcome::Failed(error) => {
///         // Report error, stream is over
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T, E> {
    /// The session needs this many elements before it can continue.
    Suspended(usize),
    /// The session produced its value and ended.
    Completed(T),
    /// The session failed.
    Failed(E),
}

impl<T, E> ParseOutcome<T, E> {
    /// Returns the pending request, if the session suspended.
    #[inline]
    pub fn request(&self) -> Option<usize> {
        match self {
            ParseOutcome::Suspended(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true if the session ended, either way.
    #[inline]
    pub fn is_finished(&self) -> bool {
        !matches!(self, ParseOutcome::Suspended(_))
    }
}

impl<T, E> From<Result<T, E>> for ParseOutcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => ParseOutcome::Completed(value),
            Err(error) => ParseOutcome::Failed(error),
        }
    }
}

/// Collects values a session pushes during a single step.
///
/// The driver forwards pushed values to the sink as soon as the step returns
/// and before it acts on the step's outcome, so a value pushed right before
/// `Completed(v)` reaches the sink ahead of `v`.
#[derive(Debug)]
pub struct Emitter<'a, T> {
    queue: &'a mut Vec<T>,
}

impl<'a, T> Emitter<'a, T> {
    /// Wrap a queue. The caller drains it after the step.
    #[inline]
    pub fn new(queue: &'a mut Vec<T>) -> Self {
        Self { queue }
    }

    /// Emit a value without ending the session.
    #[inline]
    pub fn push(&mut self, value: T) {
        self.queue.push(value);
    }

    /// Number of values pushed and not yet forwarded.
    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// A resumable parse procedure.
///
/// Implementations keep whatever they need across suspension points in their
/// own fields. The view passed to [`step`](Self::step) aliases host storage
/// when possible; keeping it past the call is allowed (it is reference
/// counted) but pins the chunk it came from.
///
/// # Example
///
/// ```ignore
/// enum Packetizer {
///     Size,
///     Data { size: u8 },
/// }
///
/// impl ParseSession for Packetizer {
///     type View = Bytes;
///     type Output = Packet;
///     type Error = Infallible;
///
///     fn step(&mut self, input: Option<Bytes>, _out: &mut Emitter<'_, Packet>)
///         -> ParseOutcome<Packet, Infallible>
///     {
///         match (&*self, input) {
///             (Packetizer::Size, None) => ParseOutcome::Suspended(1),
///             (Packetizer::Size, Some(b)) => {
///                 *self = Packetizer::Data { size: b[0] };
///                 ParseOutcome::Suspended(b[0] as usize)
///             }
///             (Packetizer::Data { size }, Some(data)) => {
///                 ParseOutcome::Completed(Packet { size: *size, data })
///             }
///             _ => ParseOutcome::Suspended(0),
///         }
///     }
/// }
/// ```
pub trait ParseSession {
    /// The shape requested bytes are delivered in. Requests count elements
    /// of this view.
    type View: ElementView;
    /// The value a session produces.
    type Output;
    /// The procedure's own error type.
    type Error;

    /// Resume the procedure.
    ///
    /// Called with `None` exactly once, first. Every later call carries a view
    /// of exactly the size the previous step asked for.
    fn step(
        &mut self,
        input: Option<Self::View>,
        out: &mut Emitter<'_, Self::Output>,
    ) -> ParseOutcome<Self::Output, Self::Error>;

    /// Run the cleanup path of a session that is being drained mid-request.
    ///
    /// May return one trailing value. A failure here supersedes any other
    /// reason the stream is ending. The default has no cleanup path.
    fn abort(
        &mut self,
        out: &mut Emitter<'_, Self::Output>,
    ) -> Result<Option<Self::Output>, Self::Error> {
        let _ = out;
        Ok(None)
    }
}

/// Creates the sessions a [`Driver`](crate::Driver) runs one after another.
pub trait Parser {
    /// The session type produced.
    type Session: ParseSession;

    /// Start a fresh session.
    fn new_session(&mut self) -> Self::Session;
}

impl<F, S> Parser for F
where
    F: FnMut() -> S,
    S: ParseSession,
{
    type Session = S;

    #[inline]
    fn new_session(&mut self) -> S {
        self()
    }
}

/// A session that cuts the stream into blocks of a fixed number of elements,
/// pushing each block and never completing.
///
/// A size of zero has no blocks to cut; each session then completes at once
/// with an empty view instead, so the driver's idle session bound applies.
///
/// ```ignore
/// let mut driver = Driver::new(|| FixedChunks::<Bytes>::new(3));
/// ```
#[derive(Debug, Clone)]
pub struct FixedChunks<V = Bytes> {
    size: usize,
    _marker: core::marker::PhantomData<fn() -> V>,
}

impl<V> FixedChunks<V> {
    /// Blocks of `size` elements.
    #[inline]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            _marker: core::marker::PhantomData,
        }
    }
}

impl<V: ElementView> ParseSession for FixedChunks<V> {
    type View = V;
    type Output = V;
    type Error = core::convert::Infallible;

    fn step(
        &mut self,
        input: Option<V>,
        out: &mut Emitter<'_, V>,
    ) -> ParseOutcome<V, Self::Error> {
        if self.size == 0 {
            return ParseOutcome::Completed(V::from_bytes(Bytes::new()));
        }
        if let Some(block) = input {
            out.push(block);
        }
        ParseOutcome::Suspended(self.size)
    }
}
