use crate::{
    io::{self, CompressionFormat, Source, Stream},
    CodePage, Dimensions, Error, Malformed, Result,
};
use bstr::ByteSlice as _;
use core::mem;
use std::io::SeekFrom;

const FIELD_SEPARATOR: u8 = b'|';
const MAX_DIMENSION: u32 = 2000;
const MAX_PLUGIN_NAME_LEN: usize = 256;

/// A value with a fixed size on disk.
pub(crate) trait Fixed: Sized {
    const SIZE: usize;

    /// `bytes` is always exactly [`SIZE`](Fixed::SIZE) bytes long.
    fn from_le_bytes(bytes: &[u8]) -> Self;
}

macro_rules! make_fixed {
    ($t:ty) => {
        impl Fixed for $t {
            const SIZE: usize = mem::size_of::<$t>();

            fn from_le_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }
        }
    };
}

make_fixed!(u8);
make_fixed!(u16);
make_fixed!(u32);
make_fixed!(u64);
make_fixed!(i32);
make_fixed!(f32);

/// How fields are framed on disk.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Framing {
    /// Every fixed size field, and every non-empty string, is followed by a `'|'`.
    pub field_markers: bool,
    /// Strings have a one byte length prefix and a null terminator, instead of a two byte
    /// length prefix.
    pub bz_strings: bool,
}

pub(crate) struct Screenshot {
    pub dimensions: Dimensions,
    pub pixels: Vec<u8>,
}

/// A cursor over the fields of a save, in whichever framing the current title uses.
pub(crate) struct FieldReader<'bytes> {
    stream: Stream<'bytes>,
    framing: Framing,
    code_page: CodePage,
}

impl<'bytes> FieldReader<'bytes> {
    #[must_use]
    pub fn new(stream: Stream<'bytes>, code_page: CodePage) -> Self {
        Self {
            stream,
            framing: Framing::default(),
            code_page,
        }
    }

    pub fn set_field_markers(&mut self, field_markers: bool) {
        self.framing.field_markers = field_markers;
    }

    pub fn set_bz_strings(&mut self, bz_strings: bool) {
        self.framing.bz_strings = bz_strings;
    }

    #[must_use]
    pub fn stream_position(&self) -> usize {
        self.stream.stream_position()
    }

    pub fn seek_absolute(&mut self, pos: usize) -> Result<()> {
        if self.stream.seek(SeekFrom::Start(pos as u64)) {
            Ok(())
        } else {
            self.stream.clear();
            Err(self.malformed(Malformed::UnexpectedEof { requested: 0 }))
        }
    }

    pub fn read<T>(&mut self) -> Result<T>
    where
        T: Fixed,
    {
        let result = T::from_le_bytes(self.read_raw(T::SIZE)?);
        if self.framing.field_markers {
            self.read_field_separator()?;
        }
        Ok(result)
    }

    /// Skips over `count` values of `T` without looking at them, or at any field markers.
    pub fn skip<T>(&mut self, count: usize) -> Result<()>
    where
        T: Fixed,
    {
        let len = count * T::SIZE;
        let offset = self.stream_position();
        #[allow(clippy::cast_possible_wrap)]
        let delta = len as i64;
        if self.stream.seek(SeekFrom::Current(delta)) {
            Ok(())
        } else {
            self.stream.clear();
            self.stream.seek(SeekFrom::End(0));
            Err(Error::Malformed {
                offset,
                cause: Malformed::UnexpectedEof { requested: len },
            })
        }
    }

    /// Reads a length prefixed string and transcodes it using the current code page.
    pub fn read_string(&mut self) -> Result<String> {
        let Framing {
            field_markers,
            bz_strings,
        } = self.framing;
        let len: usize = if bz_strings {
            self.read::<u8>()?.into()
        } else {
            self.read::<u16>()?.into()
        };
        if len == 0 {
            return Ok(String::new());
        }

        let code_page = self.code_page;
        let bytes = self.read_raw(len)?;
        let bytes = if bz_strings { &bytes[..len - 1] } else { bytes };
        let result = code_page.decode(bytes);

        if field_markers {
            self.read_field_separator()?;
        }
        Ok(result)
    }

    /// Reads a string with a one byte length prefix and no null terminator, without transcoding.
    pub fn read_bstring(&mut self) -> Result<String> {
        let len: u8 = self.read()?;
        let bytes = self.read_raw(len.into())?;
        Ok(bytes.to_str_lossy().into_owned())
    }

    /// Reads a screenshot, and normalizes it into rgba.
    ///
    /// If `dimensions` is `None`, then the width and height are read from the stream, immediately
    /// preceding the pixel data.
    pub fn read_image(&mut self, dimensions: Option<Dimensions>, alpha: bool) -> Result<Screenshot> {
        let Dimensions { width, height } = match dimensions {
            Some(x) => x,
            None => Dimensions {
                width: self.read()?,
                height: self.read()?,
            },
        };

        // guards against absurd allocations from a garbled header
        if width >= MAX_DIMENSION {
            return Err(self.malformed(Malformed::InvalidWidth(width)));
        }
        if height >= MAX_DIMENSION {
            return Err(self.malformed(Malformed::InvalidHeight(height)));
        }

        let pixel_count = width as usize * height as usize;
        let mut pixels = io::try_alloc(pixel_count * 4)?;
        if alpha {
            pixels.extend_from_slice(self.read_raw(pixel_count * 4)?);
        } else {
            let rgb = self.read_raw(pixel_count * 3)?;
            for pixel in rgb.chunks_exact(3) {
                pixels.extend_from_slice(pixel);
                pixels.push(0xFF);
            }
        }

        Ok(Screenshot {
            dimensions: Dimensions { width, height },
            pixels,
        })
    }

    /// Reads the load order, appending it to `plugins`.
    pub fn read_plugins(&mut self, bstrings: bool, plugins: &mut Vec<String>) -> Result<()> {
        let count: u8 = self.read()?;
        Self::reserve(plugins, count.into())?;
        for _ in 0..count {
            let name = if bstrings {
                self.read_bstring()?
            } else {
                self.read_string()?
            };
            self.check_plugin_name(&name, Malformed::PluginNameTooLong)?;
            plugins.push(name);
        }
        Ok(())
    }

    /// Reads the light plugin load order, appending it to `plugins`.
    pub fn read_light_plugins(&mut self, plugins: &mut Vec<String>) -> Result<()> {
        let count: u16 = self.read()?;
        Self::reserve(plugins, count.into())?;
        for _ in 0..count {
            let name = self.read_string()?;
            self.check_plugin_name(&name, Malformed::LightPluginNameTooLong)?;
            plugins.push(name);
        }
        Ok(())
    }

    /// Treats the next `compressed_len` bytes as a compressed block, and continues reading from
    /// its decompressed contents, starting at position 0.
    ///
    /// Unknown compression formats leave the stream as is.
    pub fn set_compression(
        &mut self,
        format: u16,
        compressed_len: u32,
        decompressed_len: u32,
    ) -> Result<()> {
        let Some(format) = CompressionFormat::from_code(format) else {
            tracing::warn!(format, "unknown compression format, assuming uncompressed");
            return Ok(());
        };

        self.stream = self.stream.decompress(
            format,
            compressed_len as usize,
            decompressed_len as usize,
        )?;
        Ok(())
    }

    fn check_plugin_name(&self, name: &str, too_long: fn(usize) -> Malformed) -> Result<()> {
        let len = name.chars().count();
        if len == 0 {
            Err(self.malformed(Malformed::EmptyPluginName))
        } else if len > MAX_PLUGIN_NAME_LEN {
            Err(self.malformed(too_long(len)))
        } else {
            Ok(())
        }
    }

    fn reserve(plugins: &mut Vec<String>, additional: usize) -> Result<()> {
        plugins
            .try_reserve(additional)
            .map_err(|_| Error::OutOfMemory(additional * mem::size_of::<String>()))
    }

    fn read_field_separator(&mut self) -> Result<()> {
        let offset = self.stream_position();
        let found = self.read_raw(1)?[0];
        if found == FIELD_SEPARATOR {
            Ok(())
        } else {
            Err(Error::Malformed {
                offset,
                cause: Malformed::MissingFieldSeparator { found },
            })
        }
    }

    fn read_raw(&mut self, len: usize) -> Result<&[u8]> {
        io::read_exact(&mut self.stream, len)
    }

    #[must_use]
    fn malformed(&self, cause: Malformed) -> Error {
        Error::Malformed {
            offset: self.stream_position(),
            cause,
        }
    }
}
