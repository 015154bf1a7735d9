//! Resumable byte-request parsing over arbitrarily chunked byte streams.
//!
//! A parse procedure asks for exact byte counts; the [`Driver`] gathers them
//! from whatever chunks arrive, aliasing the input when a chunk covers a whole
//! request and copying only when a request spans chunks. Results go to a
//! [`Sink`].
//!
//! ```ignore
//! use chunkwise::{Collect, Coroutine, Driver, Reader};
//!
//! let mut driver = Driver::new(|| Coroutine::new(|io: Reader<Bytes, Bytes>| async move {
//!     Ok::<_, Infallible>(io.read(3).await)
//! }));
//! driver.start(Collect::new());
//! driver.on_chunk(Bytes::from_static(&[1]));
//! driver.on_chunk(Bytes::from_static(&[2, 3, 4]));
//! driver.flush();
//! ```
#![deny(
    unsafe_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]
pub use chunkwise_core::*;
