//! Save games come in various flavors, and each game writes its own variation of the header. Every supported flavor is listed under [`FileFormat`], and [`SaveGame`] reads any of them.
//!
//! # Reading
//! ```rust
//! use gamebryo_save::{prelude::*, ReadOptions, SaveGame};
//! use std::path::Path;
//!
//! fn example() -> Option<()> {
//!     let path = Path::new("path/to/Saves/Save 3 - Prisoner  Helgen Keep  00 02 13.ess");
//!     let options = ReadOptions::builder().quick(true).build();
//!     let save = SaveGame::read(path, &options).ok()?;
//!     println!("{} (level {})", save.character_name(), save.character_level());
//!     Some(())
//! }
//! ```

#![warn(
    clippy::pedantic,
    clippy::single_char_lifetime_names,
    clippy::std_instead_of_core
)]
#![allow(
    unknown_lints,
    clippy::enum_glob_use,
    clippy::missing_errors_doc,
    clippy::struct_field_names
)]

mod containers;
mod encoding;
#[cfg(test)]
mod fixtures;
mod fo3;
mod fo4;
mod guess;
mod io;
mod reader;
mod save;
mod tes4;
mod tes5;
mod time;

pub use self::{
    encoding::{guess_code_page, CodePage},
    guess::{guess_format, FileFormat},
    save::{Dimensions, ReadOptions, ReadOptionsBuilder, SaveGame},
    time::windows_ticks_to_epoch,
};

use std::io as std_io;

/// Reads from a borrowed, in-memory buffer.
///
/// The lifetime of the buffer only needs to cover the read itself.
pub struct Borrowed<'borrow>(pub &'borrow [u8]);

/// Reads from a deep copy of the input.
pub struct Copied<'copy>(pub &'copy [u8]);

mod private {
    pub trait Sealed {}
}

use private::Sealed;

/// A trait that enables reading from various sources, with configuration options.
pub trait ReaderWithOptions<T>: Sealed {
    type Error;
    type Item;
    type Options;

    /// Reads an instance of `Self::Item` from the given source, using the given options.
    fn read(source: T, options: &Self::Options) -> core::result::Result<Self::Item, Self::Error>;
}

/// Convenience using statements for traits that are needed to work with the library.
pub mod prelude {
    pub use crate::ReaderWithOptions as _;
}

/// The reason a save game was rejected as corrupt, or as an unhandled variant of its format.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Malformed {
    #[error("buffer failed to decompress to the expected size... expected {expected} bytes, but got {actual} bytes")]
    DecompressionSizeMismatch { expected: usize, actual: usize },

    #[error("plugin name was empty")]
    EmptyPluginName,

    #[error("implausible decompressed size: {decompressed} bytes from {compressed} compressed bytes")]
    ImplausibleDecompressedSize {
        compressed: usize,
        decompressed: usize,
    },

    #[error("invalid screenshot height: {0}")]
    InvalidHeight(u32),

    #[error("invalid screenshot width: {0}")]
    InvalidWidth(u32),

    #[error("invalid light plugin name ({0} characters)")]
    LightPluginNameTooLong(usize),

    #[error("failed to decompress lz4 block: {0}")]
    LZ4(#[source] lzzzz::Error),

    #[error("expected field separator, but found {found:#04x}")]
    MissingFieldSeparator { found: u8 },

    #[error("invalid plugin name ({0} characters)")]
    PluginNameTooLong(usize),

    #[error("unexpected end of file (read of {requested} bytes)")]
    UnexpectedEof { requested: usize },

    #[error("failed to decompress zlib block: {0}")]
    Zlib(#[source] std_io::Error),
}

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{cause} at offset {offset}")]
    Malformed { offset: usize, cause: Malformed },

    #[error("failed to {syscall} \"{file_name}\": {source}")]
    Open {
        syscall: &'static str,
        file_name: String,
        #[source]
        source: std_io::Error,
    },

    #[error("ran out of memory while allocating {0} bytes")]
    OutOfMemory(usize),

    #[error("invalid file header")]
    UnrecognizedFormat,
}

impl Error {
    /// The operating system's error code, if the file could not be opened.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Open { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// The offset into the active byte stream at which the problem was detected.
    ///
    /// Offsets past the point where a compressed block begins are relative to the decompressed
    /// stream.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Malformed { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
