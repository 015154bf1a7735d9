//! Partial-fill state for one outstanding request.
//!
//! An [`Accumulator`] is created for every request a session makes and
//! dropped once the request is satisfied. It is fed chunks (the driver's carry
//! first, then whatever the host delivers next) and hands back the unused
//! suffix of each one.
//!
//! # Copy Policy
//!
//! The common case is a transport whose chunks line up with request sizes. If
//! the very first bytes fed to a request already cover all of it, the request
//! is satisfied by [`Bytes::slice`] of that chunk: same allocation, no copy.
//! Once a chunk falls short, an owned buffer of exactly the requested size is
//! allocated and every later fill for this request copies into it. A request
//! is never assembled from "part alias, part copy".
//!
//! ```text
//! request 3, chunks [1,2] [3,4,5]
//!
//!   [1,2]    -> short: owned = [1,2,_]          carry = []
//!   [3,4,5]  -> copy 1: owned = [1,2,3]         carry = [4,5]
//!
//! request 3, chunk [1,2,3,4]
//!
//!   [1,2,3,4] -> alias chunk[0..3]              carry = [4]
//! ```

use bytes::{Bytes, BytesMut};

#[derive(Debug)]
enum Storage {
    Alias(Bytes),
    Owned(BytesMut),
}

/// Accumulates exactly `needed` bytes across chunk boundaries.
#[derive(Debug)]
pub struct Accumulator {
    needed: usize,
    filled: usize,
    storage: Option<Storage>,
}

impl Accumulator {
    /// Start a request for `needed` bytes.
    #[inline]
    pub fn new(needed: usize) -> Self {
        Self {
            needed,
            filled: 0,
            storage: None,
        }
    }

    /// Total size of the request in bytes.
    #[inline]
    pub fn needed(&self) -> usize {
        self.needed
    }

    /// Bytes gathered so far.
    #[inline]
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Bytes still missing.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.needed - self.filled
    }

    /// Returns true once `filled == needed`.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.filled == self.needed
    }

    /// Returns true if any fill for this request was copied.
    #[inline]
    pub fn is_copied(&self) -> bool {
        matches!(self.storage, Some(Storage::Owned(_)))
    }

    /// Feed one chunk, returning the part of it this request did not use.
    ///
    /// An empty chunk is a no-op. Feeding a complete request returns the
    /// chunk untouched.
    pub fn consume(&mut self, chunk: Bytes) -> Bytes {
        if chunk.is_empty() || self.is_complete() {
            return chunk;
        }
        let remaining = self.remaining();
        let usable = chunk.len().min(remaining);

        if chunk.len() < remaining {
            self.copy_in(&chunk);
            return Bytes::new();
        }

        if self.storage.is_none() && self.filled == 0 && usable == self.needed {
            self.storage = Some(Storage::Alias(chunk.slice(..usable)));
            self.filled = usable;
        } else {
            self.copy_in(&chunk[..usable]);
        }
        chunk.slice(usable..)
    }

    /// Hand out the gathered bytes.
    ///
    /// Returns `None` while the request is incomplete. A zero-byte request
    /// yields an empty view without allocating.
    pub fn take(self) -> Option<Bytes> {
        self.finish().ok()
    }

    /// Hand out the gathered bytes, or give the accumulator back if the
    /// request is still short.
    pub fn finish(self) -> Result<Bytes, Self> {
        if !self.is_complete() {
            return Err(self);
        }
        Ok(match self.storage {
            Some(Storage::Alias(bytes)) => bytes,
            Some(Storage::Owned(owned)) => owned.freeze(),
            None => Bytes::new(),
        })
    }

    fn copy_in(&mut self, src: &[u8]) {
        if !self.is_copied() {
            self.storage = Some(Storage::Owned(BytesMut::zeroed(self.needed)));
        }
        if let Some(Storage::Owned(owned)) = &mut self.storage {
            owned[self.filled..self.filled + src.len()].copy_from_slice(src);
        }
        self.filled += src.len();
    }
}
