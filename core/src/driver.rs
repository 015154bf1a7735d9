//! The engine loop.
//!
//! A [`Driver`] owns the current session, the carry left over from the last
//! chunk and the accumulator of the pending request. The host feeds it chunks
//! with [`on_chunk`](Driver::on_chunk) and ends the stream with
//! [`flush`](Driver::flush); every result, including errors, leaves through
//! the [`Sink`].
//!
//! # State Machine
//!
//! ```text
//! NotStarted --start--> Running --flush--> Draining --> Terminated
//!                          |                   |
//!                          +------error--------+------> Errored
//! ```
#![cfg_attr(feature = "docs", doc = simple_mermaid::mermaid!("../docs/diagrams/driver.mmd"))]
//!
//! # Example
//!
//! ```ignore
//! use chunkwise_core::{Collect, Driver, FixedChunks};
//! use bytes::Bytes;
//!
//! let mut driver = Driver::new(|| FixedChunks::<Bytes>::new(3));
//! driver.start(Collect::new());
//!
//! driver.on_chunk(Bytes::from_static(&[1, 2]));
//! driver.on_chunk(Bytes::from_static(&[3, 4, 5, 6, 7])); // completes [1,2,3] and [4,5,6]
//! driver.flush(); // drops [7], terminates
//! ```

use crate::{
    Accumulator, DriverConfig, ElementView, Emitter, ParseOutcome, ParseSession, Parser, Sink,
    StreamError,
};
use bytes::Bytes;
use core::mem;
use tracing::{debug, trace, warn};

/// Lifecycle of a [`Driver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// `start` has not been called yet.
    NotStarted,
    /// Accepting chunks.
    Running,
    /// `flush` is running the session's cleanup path.
    Draining,
    /// The sink accepted `terminate`.
    Terminated,
    /// The sink received `error`.
    Errored,
}

impl DriverState {
    /// Returns true once the sink has received its final call.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, DriverState::Terminated | DriverState::Errored)
    }
}

type SessionOf<P> = <P as Parser>::Session;
type ViewOf<P> = <SessionOf<P> as ParseSession>::View;
type OutputOf<P> = <SessionOf<P> as ParseSession>::Output;
type ErrorOf<P> = <SessionOf<P> as ParseSession>::Error;

/// Feeds an arbitrarily chunked byte stream through a sequence of sessions.
pub struct Driver<P, K>
where
    P: Parser,
{
    parser: P,
    sink: Option<K>,
    session: Option<SessionOf<P>>,
    request: Option<Accumulator>,
    carry: Bytes,
    pushed: Vec<OutputOf<P>>,
    /// Bytes handed to the current session so far.
    session_bytes: usize,
    /// Sessions in a row that completed without consuming input.
    idle_sessions: usize,
    state: DriverState,
    config: DriverConfig,
}

impl<P, K> Driver<P, K>
where
    P: Parser,
{
    /// Create a driver with default configuration.
    pub fn new(parser: P) -> Self {
        Self::with_config(parser, DriverConfig::default())
    }

    /// Create a driver with custom configuration.
    pub fn with_config(parser: P, config: DriverConfig) -> Self {
        Self {
            parser,
            sink: None,
            session: None,
            request: None,
            carry: Bytes::new(),
            pushed: Vec::with_capacity(config.push_capacity_hint),
            session_bytes: 0,
            idle_sessions: 0,
            state: DriverState::NotStarted,
            config,
        }
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// The configuration in use.
    #[inline]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The sink, once started.
    #[inline]
    pub fn sink(&self) -> Option<&K> {
        self.sink.as_ref()
    }

    /// Mutable access to the sink, once started.
    #[inline]
    pub fn sink_mut(&mut self) -> Option<&mut K> {
        self.sink.as_mut()
    }

    /// Give up the driver and return its sink.
    #[inline]
    pub fn into_sink(self) -> Option<K> {
        self.sink
    }

    /// Bytes currently held: the carry plus the partial fill of the pending
    /// request.
    pub fn buffered(&self) -> usize {
        self.carry.len() + self.request.as_ref().map_or(0, Accumulator::filled)
    }

    /// Size in bytes of the request the current session is waiting on.
    pub fn pending_request(&self) -> Option<usize> {
        self.request.as_ref().map(Accumulator::needed)
    }
}

impl<P, K> Driver<P, K>
where
    P: Parser,
    K: Sink<OutputOf<P>, ErrorOf<P>>,
{
    /// Record the sink and run the first session up to its first request.
    ///
    /// Ignored unless the driver has not been started yet.
    pub fn start(&mut self, sink: K) {
        if self.state != DriverState::NotStarted {
            debug!(state = ?self.state, "start ignored");
            return;
        }
        self.sink = Some(sink);
        self.state = DriverState::Running;
        debug!("driver started");
        self.open_session();
        self.drive(None);
    }

    /// Feed one chunk.
    ///
    /// Every value the chunk completes is enqueued before this returns. Chunks
    /// delivered before `start` or after the stream ended are ignored.
    pub fn on_chunk(&mut self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        if self.state != DriverState::Running {
            debug!(state = ?self.state, len = chunk.len(), "chunk ignored");
            return;
        }
        let Some(request) = self.request.take() else {
            return;
        };
        if let Some(view) = self.fill(request, chunk) {
            self.drive(Some(view));
        }
    }

    /// End the stream.
    ///
    /// Runs the current session's cleanup path, forwards its trailing value if
    /// any, then terminates the sink. Bytes of an unfinished request and any
    /// carry are dropped. Ignored unless the driver is running.
    pub fn flush(&mut self) {
        if self.state != DriverState::Running {
            debug!(state = ?self.state, "flush ignored");
            return;
        }
        self.state = DriverState::Draining;
        let dropped = self.buffered();
        self.request = None;
        self.carry = Bytes::new();
        debug!(dropped, "draining");

        let cleanup = match self.session.take() {
            Some(mut session) => session.abort(&mut Emitter::new(&mut self.pushed)),
            None => Ok(None),
        };
        if !self.forward_pushed() {
            return;
        }
        match cleanup {
            Ok(Some(trailing)) => {
                if !self.enqueue(trailing) {
                    return;
                }
            }
            Ok(None) => {}
            Err(error) => return self.fail(StreamError::Cleanup(error)),
        }

        self.state = DriverState::Terminated;
        if let Some(sink) = self.sink.as_mut() {
            if let Err(error) = sink.terminate() {
                self.state = DriverState::Errored;
                warn!(kind = "sink", "terminate refused");
                sink.error(StreamError::Sink(error));
                return;
            }
        }
        debug!("driver terminated");
    }

    /// Step the current session until it waits on bytes that are not there
    /// yet, or the stream ends.
    fn drive(&mut self, mut input: Option<ViewOf<P>>) {
        loop {
            let outcome = match self.session.as_mut() {
                Some(session) => session.step(input.take(), &mut Emitter::new(&mut self.pushed)),
                None => return,
            };
            if !self.forward_pushed() {
                return;
            }

            match outcome {
                ParseOutcome::Suspended(count) => {
                    let needed = match self
                        .config
                        .request_bytes(count, <ViewOf<P> as ElementView>::WIDTH)
                    {
                        Ok(needed) => needed,
                        Err(error) => return self.fail(error),
                    };
                    let carry = mem::take(&mut self.carry);
                    match self.fill(Accumulator::new(needed), carry) {
                        Some(view) => input = Some(view),
                        None => return,
                    }
                }
                ParseOutcome::Completed(value) => {
                    if self.session_bytes > 0 {
                        self.idle_sessions = 0;
                    } else if self.idle_sessions >= self.config.max_idle_sessions {
                        return self.fail(StreamError::Stalled);
                    } else {
                        self.idle_sessions += 1;
                    }
                    debug!(consumed = self.session_bytes, "session completed");
                    if !self.enqueue(value) {
                        return;
                    }
                    self.open_session();
                }
                ParseOutcome::Failed(error) => {
                    return self.fail(StreamError::Procedure(error));
                }
            }
        }
    }

    /// Feed `chunk` into `request`. Returns the view once the request is
    /// satisfied; otherwise parks the request until the next chunk.
    fn fill(&mut self, mut request: Accumulator, chunk: Bytes) -> Option<ViewOf<P>> {
        self.carry = request.consume(chunk);
        let needed = request.needed();
        let copied = request.is_copied();
        match request.finish() {
            Ok(bytes) => {
                trace!(needed, copied, carry = self.carry.len(), "request satisfied");
                self.session_bytes += needed;
                Some(<ViewOf<P> as ElementView>::from_bytes(bytes))
            }
            Err(request) => {
                trace!(needed, filled = request.filled(), "request pending");
                self.request = Some(request);
                None
            }
        }
    }

    fn open_session(&mut self) {
        self.session = Some(self.parser.new_session());
        self.session_bytes = 0;
        trace!("session opened");
    }

    fn forward_pushed(&mut self) -> bool {
        if self.pushed.is_empty() {
            return true;
        }
        let mut pushed = mem::take(&mut self.pushed);
        let mut accepted = true;
        for value in pushed.drain(..) {
            accepted = accepted && self.enqueue(value);
        }
        self.pushed = pushed;
        accepted
    }

    fn enqueue(&mut self, value: OutputOf<P>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };
        match sink.enqueue(value) {
            Ok(()) => true,
            Err(error) => {
                self.fail(StreamError::Sink(error));
                false
            }
        }
    }

    fn fail(&mut self, error: StreamError<ErrorOf<P>>) {
        warn!(kind = error.kind(), state = ?self.state, "stream errored");
        self.state = DriverState::Errored;
        self.session = None;
        self.request = None;
        self.carry = Bytes::new();
        if let Some(sink) = self.sink.as_mut() {
            sink.error(error);
        }
    }
}

impl<P, K> core::fmt::Debug for Driver<P, K>
where
    P: Parser,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Driver")
            .field("state", &self.state)
            .field("carry", &self.carry.len())
            .field("request", &self.request)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
