//! Async adapters around the synchronous [`Driver`].
//!
//! The driver never blocks and never awaits; these adapters only move chunks
//! in and results out.
//!
//! - `tokio_impl` (feature `tokio`): a channel-backed [`Sink`] and a task body
//!   that feeds a driver from an `mpsc` receiver of chunks.
//! - `futures_impl` (feature `futures`): a runtime-agnostic `Stream` adapter.
//!
//! # Example
//!
//! ```ignore
//! use chunkwise::async_stream::tokio_impl::{drive, ChannelSink};
//!
//! async fn parse_socket(rx: tokio::sync::mpsc::Receiver<Bytes>) {
//!     let (sink, mut packets) = ChannelSink::channel();
//!
//!     tokio::spawn(drive(Driver::new(|| Coroutine::new(packet)), sink, rx));
//!
//!     while let Some(packet) = packets.recv().await {
//!         match packet {
//!             Ok(packet) => handle(packet),
//!             Err(e) => tracing::error!("stream failed: {e}"),
//!         }
//!     }
//! }
//! ```

use crate::{Driver, ParseSession, Parser, Sink, SinkError, StreamError};
use std::collections::VecDeque;

type OutputOf<P> = <<P as Parser>::Session as ParseSession>::Output;
type ErrorOf<P> = <<P as Parser>::Session as ParseSession>::Error;

/// Item type produced by the async adapters.
pub type StreamItem<T, E> = Result<T, StreamError<E>>;

/// Sink buffering results until a consumer polls them.
#[derive(Debug)]
pub struct Queue<T, E> {
    items: VecDeque<StreamItem<T, E>>,
    closed: bool,
}

impl<T, E> Default for Queue<T, E> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
            closed: false,
        }
    }
}

impl<T, E> Queue<T, E> {
    /// Take the oldest buffered result.
    #[inline]
    pub fn pop(&mut self) -> Option<StreamItem<T, E>> {
        self.items.pop_front()
    }

    /// Number of buffered results.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true once the stream ended, either way.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T, E> Sink<T, E> for Queue<T, E> {
    fn enqueue(&mut self, value: T) -> Result<(), SinkError> {
        self.items.push_back(Ok(value));
        Ok(())
    }

    fn error(&mut self, reason: StreamError<E>) {
        self.items.push_back(Err(reason));
        self.closed = true;
    }

    fn terminate(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(feature = "tokio")]
pub mod tokio_impl {
    //! Tokio-based adapter.

    use super::*;
    use ::tokio::sync::mpsc;
    use bytes::Bytes;
    use tracing::debug;

    /// Forwards results into an unbounded channel.
    ///
    /// Terminal calls drop the sender, so the receiver sees the end of the
    /// stream once the last result has been read.
    #[derive(Debug)]
    pub struct ChannelSink<T, E> {
        tx: Option<mpsc::UnboundedSender<StreamItem<T, E>>>,
    }

    impl<T, E> ChannelSink<T, E> {
        /// Wrap an existing sender.
        pub fn new(tx: mpsc::UnboundedSender<StreamItem<T, E>>) -> Self {
            Self { tx: Some(tx) }
        }

        /// Create a sink and the receiver it feeds.
        pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamItem<T, E>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self::new(tx), rx)
        }
    }

    impl<T, E> Sink<T, E> for ChannelSink<T, E> {
        fn enqueue(&mut self, value: T) -> Result<(), SinkError> {
            let tx = self.tx.as_ref().ok_or(SinkError::Closed)?;
            tx.send(Ok(value)).map_err(|_| SinkError::Closed)
        }

        fn error(&mut self, reason: StreamError<E>) {
            if let Some(tx) = self.tx.take() {
                // A gone receiver has nobody left to tell.
                let _ = tx.send(Err(reason));
            }
        }

        fn terminate(&mut self) -> Result<(), SinkError> {
            self.tx.take().map(drop).ok_or(SinkError::Closed)
        }
    }

    /// Feed `driver` from `chunks` until the sender side closes, then flush.
    ///
    /// Returns the driver so the caller can inspect its final state. Stops
    /// reading early once the stream has errored.
    pub async fn drive<P, K>(
        mut driver: Driver<P, K>,
        sink: K,
        mut chunks: mpsc::Receiver<Bytes>,
    ) -> Driver<P, K>
    where
        P: Parser,
        K: Sink<OutputOf<P>, ErrorOf<P>>,
    {
        driver.start(sink);
        while let Some(chunk) = chunks.recv().await {
            driver.on_chunk(chunk);
            if driver.state().is_terminal() {
                debug!(state = ?driver.state(), "input abandoned");
                return driver;
            }
        }
        driver.flush();
        driver
    }
}

#[cfg(feature = "futures")]
pub mod futures_impl {
    //! Futures-based adapter (runtime-agnostic).

    use super::*;
    use bytes::Bytes;
    use core::pin::Pin;
    use core::task::{Context, Poll};
    use futures_core::Stream;

    /// Adapts a stream of chunks into a stream of parsed values.
    ///
    /// Yields every value in completion order, then the error if the stream
    /// failed, then ends. The inner stream ending flushes the driver.
    pub struct ParseStream<S, P>
    where
        P: Parser,
    {
        inner: S,
        driver: Driver<P, Queue<OutputOf<P>, ErrorOf<P>>>,
    }

    impl<S, P> ParseStream<S, P>
    where
        S: Stream<Item = Bytes>,
        P: Parser,
    {
        /// Wrap a chunk stream.
        pub fn new(inner: S, parser: P) -> Self {
            Self::with_driver(inner, Driver::new(parser))
        }

        /// Wrap a chunk stream with a preconfigured driver.
        pub fn with_driver(inner: S, mut driver: Driver<P, Queue<OutputOf<P>, ErrorOf<P>>>) -> Self {
            driver.start(Queue::default());
            Self { inner, driver }
        }

        /// The underlying driver.
        pub fn driver(&self) -> &Driver<P, Queue<OutputOf<P>, ErrorOf<P>>> {
            &self.driver
        }
    }

    impl<S, P> Stream for ParseStream<S, P>
    where
        S: Stream<Item = Bytes> + Unpin,
        P: Parser,
        Self: Unpin,
    {
        type Item = StreamItem<OutputOf<P>, ErrorOf<P>>;

        fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            let this = self.get_mut();
            loop {
                let Some(queue) = this.driver.sink_mut() else {
                    return Poll::Ready(None);
                };
                if let Some(item) = queue.pop() {
                    return Poll::Ready(Some(item));
                }
                if queue.is_closed() {
                    return Poll::Ready(None);
                }

                match Pin::new(&mut this.inner).poll_next(cx) {
                    Poll::Ready(Some(chunk)) => this.driver.on_chunk(chunk),
                    Poll::Ready(None) => this.driver.flush(),
                    Poll::Pending => return Poll::Pending,
                }
            }
        }
    }
}
