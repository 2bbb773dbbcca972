use crate::{containers::ByteContainer, Error, Malformed, Result};
use flate2::read::ZlibDecoder;
use lzzzz::lz4;
use memmap2::Mmap;
use std::{
    fs::File,
    io::{Read, SeekFrom},
};

/// The most an lz4 block can expand per compressed byte.
const LZ4_MAX_RATIO: usize = 255;

/// A seekable stream of bytes, which a [`FieldReader`](crate::reader::FieldReader) consumes.
///
/// A failed read or seek leaves the source in a sticky failure state, where every subsequent
/// operation fails until [`clear`](Source::clear) is called.
pub(crate) trait Source {
    /// Moves the cursor, returning `false` if the destination lies outside of the stream.
    fn seek(&mut self, pos: SeekFrom) -> bool;

    #[must_use]
    fn stream_position(&self) -> usize;

    /// Reads exactly `len` bytes, or nothing at all.
    fn read_bytes(&mut self, len: usize) -> Option<&[u8]>;

    fn clear(&mut self);
}

/// Reads exactly `len` bytes, converting a short read into a positioned error.
///
/// On failure the source is cleared and moved to its end, so that a later
/// [`stream_position`](Source::stream_position) reports how far the stream reached.
pub(crate) fn read_exact<S>(source: &mut S, len: usize) -> Result<&[u8]>
where
    S: ?Sized + Source,
{
    let offset = source.stream_position();
    if source.read_bytes(len).is_none() {
        tracing::trace!(offset, requested = len, "short read");
        source.clear();
        source.seek(SeekFrom::End(0));
        return Err(Error::Malformed {
            offset,
            cause: Malformed::UnexpectedEof { requested: len },
        });
    }

    // rewind and hand out the bytes we just validated
    source.seek(SeekFrom::Start(offset as u64));
    source.read_bytes(len).ok_or(Error::Malformed {
        offset,
        cause: Malformed::UnexpectedEof { requested: len },
    })
}

pub(crate) fn try_alloc(len: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory(len))?;
    Ok(bytes)
}

#[derive(Default)]
struct MemorySource<'bytes> {
    bytes: ByteContainer<'bytes>,
    pos: usize,
    failed: bool,
}

impl<'bytes> MemorySource<'bytes> {
    fn new(bytes: ByteContainer<'bytes>) -> Self {
        Self {
            bytes,
            pos: 0,
            failed: false,
        }
    }
}

impl<'bytes> Source for MemorySource<'bytes> {
    fn seek(&mut self, pos: SeekFrom) -> bool {
        if self.failed {
            return false;
        }

        let len = self.bytes.len();
        let destination = match pos {
            SeekFrom::Start(x) => usize::try_from(x).ok(),
            SeekFrom::Current(x) => isize::try_from(x)
                .ok()
                .and_then(|x| self.pos.checked_add_signed(x)),
            SeekFrom::End(x) => isize::try_from(x)
                .ok()
                .and_then(|x| len.checked_add_signed(x)),
        };

        match destination {
            Some(x) if x <= len => {
                self.pos = x;
                true
            }
            _ => {
                self.failed = true;
                false
            }
        }
    }

    fn stream_position(&self) -> usize {
        self.pos
    }

    fn read_bytes(&mut self, len: usize) -> Option<&[u8]> {
        if self.failed {
            return None;
        }

        let start = self.pos;
        match start.checked_add(len) {
            Some(stop) if stop <= self.bytes.len() => {
                self.pos = stop;
                Some(&self.bytes.as_bytes()[start..stop])
            }
            _ => {
                self.failed = true;
                None
            }
        }
    }

    fn clear(&mut self) {
        self.failed = false;
    }
}

macro_rules! delegate_source {
    ($this:ident) => {
        impl<'bytes> Source for $this<'bytes> {
            fn seek(&mut self, pos: SeekFrom) -> bool {
                self.0.seek(pos)
            }

            fn stream_position(&self) -> usize {
                self.0.stream_position()
            }

            fn read_bytes(&mut self, len: usize) -> Option<&[u8]> {
                self.0.read_bytes(len)
            }

            fn clear(&mut self) {
                self.0.clear();
            }
        }
    };
}

/// Reads straight from the save file, or from a buffer the caller handed us.
#[derive(Default)]
pub(crate) struct DirectSource<'bytes>(MemorySource<'bytes>);

delegate_source!(DirectSource);

impl<'bytes> DirectSource<'bytes> {
    #[must_use]
    pub fn from_borrowed(bytes: &'bytes [u8]) -> Self {
        Self(MemorySource::new(ByteContainer::from_borrowed(bytes)))
    }
}

impl DirectSource<'static> {
    #[must_use]
    pub fn from_owned(bytes: Vec<u8>) -> Self {
        Self(MemorySource::new(ByteContainer::from_owned(bytes)))
    }
}

impl TryFrom<&File> for DirectSource<'static> {
    type Error = std::io::Error;

    fn try_from(value: &File) -> core::result::Result<Self, Self::Error> {
        let mapping = unsafe { Mmap::map(value) }?;
        Ok(Self(MemorySource::new(ByteContainer::from_mapped(mapping))))
    }
}

/// The decompressed remainder of a save, stored as an lz4 block.
pub(crate) struct Lz4Source<'bytes>(MemorySource<'bytes>);

delegate_source!(Lz4Source);

impl Lz4Source<'static> {
    pub fn new<S>(wrapped: &mut S, compressed_len: usize, decompressed_len: usize) -> Result<Self>
    where
        S: ?Sized + Source,
    {
        let start = wrapped.stream_position();
        let ceiling = compressed_len.saturating_mul(LZ4_MAX_RATIO).saturating_add(64);
        if decompressed_len > ceiling {
            return Err(Error::Malformed {
                offset: start,
                cause: Malformed::ImplausibleDecompressedSize {
                    compressed: compressed_len,
                    decompressed: decompressed_len,
                },
            });
        }

        let compressed = read_exact(wrapped, compressed_len)?;
        let offset = start + compressed_len;

        let mut out = try_alloc(decompressed_len)?;
        out.resize(decompressed_len, 0);
        let out_len = lz4::decompress(compressed, &mut out).map_err(|err| Error::Malformed {
            offset,
            cause: Malformed::LZ4(err),
        })?;

        check_decompressed_len(offset, decompressed_len, out_len)?;
        Ok(Self(MemorySource::new(ByteContainer::from_owned(out))))
    }
}

/// The decompressed remainder of a save, stored as a zlib stream.
pub(crate) struct ZlibSource<'bytes>(MemorySource<'bytes>);

delegate_source!(ZlibSource);

impl ZlibSource<'static> {
    pub fn new<S>(wrapped: &mut S, compressed_len: usize, decompressed_len: usize) -> Result<Self>
    where
        S: ?Sized + Source,
    {
        let start = wrapped.stream_position();
        let compressed = read_exact(wrapped, compressed_len)?;
        let offset = start + compressed_len;
        let zlib_error = |err| Error::Malformed {
            offset,
            cause: Malformed::Zlib(err),
        };

        // stop one byte past the declared size, which is enough to detect a mismatch
        let limit = decompressed_len as u64 + 1;
        let mut out = try_alloc(decompressed_len)?;
        ZlibDecoder::new(compressed)
            .take(limit)
            .read_to_end(&mut out)
            .map_err(zlib_error)?;

        check_decompressed_len(offset, decompressed_len, out.len())?;
        Ok(Self(MemorySource::new(ByteContainer::from_owned(out))))
    }
}

fn check_decompressed_len(offset: usize, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::Malformed {
            offset,
            cause: Malformed::DecompressionSizeMismatch { expected, actual },
        })
    }
}

/// The codec which a save declares for its compressed remainder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CompressionFormat {
    Zlib,
    LZ4,
}

impl CompressionFormat {
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Zlib),
            2 => Some(Self::LZ4),
            _ => None,
        }
    }
}

/// The byte source that is currently active for a read.
pub(crate) enum Stream<'bytes> {
    Direct(DirectSource<'bytes>),
    LZ4(Lz4Source<'static>),
    Zlib(ZlibSource<'static>),
}

impl<'bytes> Stream<'bytes> {
    /// Reads a compressed block from the current stream and returns a stream over its contents.
    ///
    /// The returned stream starts at position 0.
    pub fn decompress(
        &mut self,
        format: CompressionFormat,
        compressed_len: usize,
        decompressed_len: usize,
    ) -> Result<Self> {
        let stream = match format {
            CompressionFormat::Zlib => {
                Self::Zlib(ZlibSource::new(self, compressed_len, decompressed_len)?)
            }
            CompressionFormat::LZ4 => {
                Self::LZ4(Lz4Source::new(self, compressed_len, decompressed_len)?)
            }
        };
        tracing::debug!(
            ?format,
            compressed_len,
            decompressed_len,
            "installed decompression layer"
        );
        Ok(stream)
    }
}

impl<'bytes> From<DirectSource<'bytes>> for Stream<'bytes> {
    fn from(value: DirectSource<'bytes>) -> Self {
        Self::Direct(value)
    }
}

impl<'bytes> Source for Stream<'bytes> {
    fn seek(&mut self, pos: SeekFrom) -> bool {
        match self {
            Self::Direct(x) => x.seek(pos),
            Self::LZ4(x) => x.seek(pos),
            Self::Zlib(x) => x.seek(pos),
        }
    }

    fn stream_position(&self) -> usize {
        match self {
            Self::Direct(x) => x.stream_position(),
            Self::LZ4(x) => x.stream_position(),
            Self::Zlib(x) => x.stream_position(),
        }
    }

    fn read_bytes(&mut self, len: usize) -> Option<&[u8]> {
        match self {
            Self::Direct(x) => x.read_bytes(len),
            Self::LZ4(x) => x.read_bytes(len),
            Self::Zlib(x) => x.read_bytes(len),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Direct(x) => x.clear(),
            Self::LZ4(x) => x.clear(),
            Self::Zlib(x) => x.clear(),
        }
    }
}
