use memmap2::Mmap;

enum ByteContainerInner<'bytes> {
    Owned(Vec<u8>),
    Borrowed(&'bytes [u8]),
    Mapped(Mmap),
}

use ByteContainerInner::*;

/// The backing storage of a byte source: a mapped save file, a caller's buffer, or the output of
/// a decompression layer.
pub(crate) struct ByteContainer<'bytes> {
    inner: ByteContainerInner<'bytes>,
}

impl<'bytes> ByteContainer<'bytes> {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.inner {
            Owned(x) => x,
            Borrowed(x) => x,
            Mapped(x) => x,
        }
    }

    #[must_use]
    pub fn from_borrowed(bytes: &'bytes [u8]) -> Self {
        Self {
            inner: Borrowed(bytes),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }
}

impl ByteContainer<'static> {
    #[must_use]
    pub fn from_owned(bytes: Vec<u8>) -> Self {
        Self {
            inner: Owned(bytes),
        }
    }

    #[must_use]
    pub fn from_mapped(mapping: Mmap) -> Self {
        Self {
            inner: Mapped(mapping),
        }
    }
}

impl<'bytes> Default for ByteContainer<'bytes> {
    fn default() -> Self {
        Self {
            inner: Owned(Vec::new()),
        }
    }
}
