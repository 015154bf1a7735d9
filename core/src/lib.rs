#![deny(
    unsafe_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod accumulator;
pub mod config;
mod driver;
mod error;
mod session;
mod sink;
pub mod view;

#[cfg(feature = "coroutine")]
pub mod coroutine;

#[cfg(any(feature = "tokio", feature = "futures"))]
pub mod async_stream;

pub use accumulator::Accumulator;
pub use config::DriverConfig;
pub use driver::{Driver, DriverState};
pub use error::{SinkError, StreamError};
pub use session::{Emitter, FixedChunks, ParseOutcome, ParseSession, Parser};
pub use sink::{Collect, Sink, SinkEvent};
pub use view::{Element, ElementView, Elements};

#[cfg(feature = "coroutine")]
pub use coroutine::{Coroutine, NoCleanup, Reader, Yield};

pub use bytes::Bytes;
