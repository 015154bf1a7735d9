//! Views handed to a session when a request is satisfied.
//!
//! A session chooses the shape of the bytes it receives through
//! [`ParseSession::View`](crate::ParseSession::View). Raw [`Bytes`] is the
//! default; [`Elements`] decodes fixed-width numbers for formats whose atomic
//! unit is wider than one byte. Requests are counted in elements of the view,
//! so a session reading `Elements<u32>` that asks for 3 receives 12 bytes.
//!
//! Views may alias the storage of the chunk that satisfied the request. They
//! are reference counted, so a session may keep one in its output without
//! copying; the chunk allocation then lives as long as the output does.

use bytes::Bytes;
use core::fmt;
use core::marker::PhantomData;

/// A type a satisfied request can be delivered as.
pub trait ElementView: Sized {
    /// Width in bytes of one element.
    const WIDTH: usize;

    /// Wrap exactly `count * WIDTH` bytes.
    fn from_bytes(bytes: Bytes) -> Self;
}

impl ElementView for Bytes {
    const WIDTH: usize = 1;

    #[inline]
    fn from_bytes(bytes: Bytes) -> Self {
        bytes
    }
}

/// A fixed-width number that can be decoded from a byte view.
pub trait Element: Copy {
    /// Width in bytes.
    const WIDTH: usize;

    /// Decode from exactly `WIDTH` little-endian bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                const WIDTH: usize = core::mem::size_of::<$ty>();

                #[inline]
                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// A view of `E` elements over a byte buffer.
///
/// Elements are decoded on access rather than reinterpreted in place because
/// the underlying bytes may sit at any offset of the chunk they came from.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Elements<E> {
    bytes: Bytes,
    _marker: PhantomData<E>,
}

impl<E: Element> Elements<E> {
    /// Number of elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / E::WIDTH
    }

    /// Returns true if the view holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the element at `index`.
    pub fn get(&self, index: usize) -> Option<E> {
        let start = index.checked_mul(E::WIDTH)?;
        let end = start.checked_add(E::WIDTH)?;
        self.bytes.get(start..end).map(E::from_le_slice)
    }

    /// Iterate over the decoded elements.
    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        self.bytes.chunks_exact(E::WIDTH).map(E::from_le_slice)
    }

    /// Decode all elements into a vector.
    pub fn to_vec(&self) -> Vec<E> {
        self.iter().collect()
    }

    /// The raw bytes behind the view.
    #[inline]
    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Unwrap the raw bytes behind the view.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl<E: Element> ElementView for Elements<E> {
    const WIDTH: usize = E::WIDTH;

    #[inline]
    fn from_bytes(bytes: Bytes) -> Self {
        Self {
            bytes,
            _marker: PhantomData,
        }
    }
}

impl<E: Element + fmt::Debug> fmt::Debug for Elements<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
