//! Linear parse procedures.
//!
//! Writing a [`ParseSession`] by hand means turning the procedure inside out
//! into a state machine. [`Coroutine`] lets it be written top to bottom as an
//! `async` block instead; each `read(n).await` is a suspension point.
//!
//! ```ignore
//! use chunkwise_core::{Coroutine, Driver, Reader};
//! use bytes::Bytes;
//!
//! async fn packet(io: Reader<Bytes, Packet>) -> Result<Packet, Infallible> {
//!     let size = io.read(1).await[0];
//!     let data = io.read(size as usize).await;
//!     Ok(Packet { size, data })
//! }
//!
//! let mut driver = Driver::new(|| Coroutine::new(packet));
//! ```
//!
//! Built on [`genawaiter::rc::Gen`]: the generator yields a [`Yield`] for each
//! request or pushed value and is resumed with the filled view. Flushing
//! mid-request drops the generator; a procedure built with
//! [`Coroutine::with_cleanup`] runs its cleanup first.
//!
//! ```ignore
//! let flusher = || {
//!     Coroutine::with_cleanup(
//!         |io: Reader<Bytes, u8>| async move { Ok(io.read(3).await[0]) },
//!         |_out: &mut Emitter<'_, u8>| Ok(Some(42)),
//!     )
//! };
//! ```

use crate::{ElementView, Emitter, ParseOutcome, ParseSession};
use bytes::Bytes;
use core::future::Future;
use genawaiter::GeneratorState;
use genawaiter::rc::{Co, Gen};

/// What a linear procedure hands back to the driver at a suspension point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Yield<T> {
    /// Wait for this many elements.
    Read(usize),
    /// Emit a value and continue immediately.
    Push(T),
}

/// Handle a linear procedure uses to talk to the driver.
pub struct Reader<V, T> {
    co: Co<Yield<T>, V>,
}

impl<V: ElementView, T> Reader<V, T> {
    /// Suspend until `count` elements are available, then return them.
    pub async fn read(&self, count: usize) -> V {
        self.co.yield_(Yield::Read(count)).await
    }

    /// Emit `value` without ending the procedure.
    pub async fn push(&self, value: T) {
        let _ = self.co.yield_(Yield::Push(value)).await;
    }
}

/// Cleanup of a [`Coroutine`] built without one.
pub type NoCleanup<T, E> = fn(&mut Emitter<'_, T>) -> Result<Option<T>, E>;

/// A linear `async` procedure run as a [`ParseSession`].
pub struct Coroutine<V, T, E, F, C = NoCleanup<T, E>>
where
    F: Future<Output = Result<T, E>>,
{
    generator: Gen<Yield<T>, V, F>,
    cleanup: Option<C>,
}

impl<V, T, E, F> Coroutine<V, T, E, F>
where
    V: ElementView,
    F: Future<Output = Result<T, E>>,
{
    /// Wrap a procedure. It starts running on the driver's first step.
    pub fn new(procedure: impl FnOnce(Reader<V, T>) -> F) -> Self {
        Self {
            generator: Gen::new(|co| procedure(Reader { co })),
            cleanup: None,
        }
    }
}

impl<V, T, E, F, C> Coroutine<V, T, E, F, C>
where
    V: ElementView,
    F: Future<Output = Result<T, E>>,
{
    /// Wrap a procedure together with the cleanup the driver runs when the
    /// stream ends while the procedure waits on a read.
    ///
    /// `cleanup` may push values and returns the trailing value, or the error
    /// that replaces termination.
    pub fn with_cleanup(procedure: impl FnOnce(Reader<V, T>) -> F, cleanup: C) -> Self
    where
        C: FnOnce(&mut Emitter<'_, T>) -> Result<Option<T>, E>,
    {
        Self {
            generator: Gen::new(|co| procedure(Reader { co })),
            cleanup: Some(cleanup),
        }
    }
}

impl<V, T, E, F, C> ParseSession for Coroutine<V, T, E, F, C>
where
    V: ElementView,
    F: Future<Output = Result<T, E>>,
    C: FnOnce(&mut Emitter<'_, T>) -> Result<Option<T>, E>,
{
    type View = V;
    type Output = T;
    type Error = E;

    fn step(&mut self, input: Option<V>, out: &mut Emitter<'_, T>) -> ParseOutcome<T, E> {
        // The first resume argument never reaches the procedure, and pushes
        // resume with nothing to deliver.
        let mut resume = input.unwrap_or_else(empty);
        loop {
            match self.generator.resume_with(resume) {
                GeneratorState::Yielded(Yield::Read(count)) => {
                    return ParseOutcome::Suspended(count);
                }
                GeneratorState::Yielded(Yield::Push(value)) => {
                    out.push(value);
                    resume = empty();
                }
                GeneratorState::Complete(result) => return result.into(),
            }
        }
    }

    fn abort(&mut self, out: &mut Emitter<'_, T>) -> Result<Option<T>, E> {
        match self.cleanup.take() {
            Some(cleanup) => cleanup(out),
            None => Ok(None),
        }
    }
}

impl<V, T, E, F, C> core::fmt::Debug for Coroutine<V, T, E, F, C>
where
    F: Future<Output = Result<T, E>>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Coroutine")
            .field("cleanup", &self.cleanup.is_some())
            .finish_non_exhaustive()
    }
}

fn empty<V: ElementView>() -> V {
    V::from_bytes(Bytes::new())
}
