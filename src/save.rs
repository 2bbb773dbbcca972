use crate::{
    encoding, fo3, fo4, guess,
    io::{DirectSource, Stream},
    reader::{FieldReader, Screenshot},
    tes4, tes5, Borrowed, CodePage, Copied, Error, FileFormat, ReaderWithOptions, Result, Sealed,
};
use std::{
    fs::{self, File, Metadata},
    io,
    path::Path,
    time::UNIX_EPOCH,
};

/// The size of a screenshot, in pixels.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default)]
#[repr(transparent)]
pub struct ReadOptionsBuilder(ReadOptions);

impl ReadOptionsBuilder {
    #[must_use]
    pub fn build(self) -> ReadOptions {
        self.0
    }

    #[must_use]
    pub fn code_page(mut self, code_page: CodePage) -> Self {
        self.0.code_page = Some(code_page);
        self
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn quick(mut self, quick: bool) -> Self {
        self.0.quick = quick;
        self
    }
}

/// Common parameters to configure how saves are read.
///
/// ```rust
/// use gamebryo_save::{CodePage, ReadOptions};
///
/// // Read only the character info, skipping the screenshot and load order
/// let _ = ReadOptions::builder().quick(true).build();
///
/// // Read everything, decoding text from a russian install
/// let _ = ReadOptions::builder()
///     .code_page(CodePage::Cyrillic)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadOptions {
    quick: bool,
    code_page: Option<CodePage>,
}

impl ReadOptions {
    #[must_use]
    pub fn builder() -> ReadOptionsBuilder {
        ReadOptionsBuilder::new()
    }

    /// The code page to decode text with, if the caller chose one.
    ///
    /// When unset, the code page is guessed from the file name, or defaults to
    /// [`CodePage::Utf8OrLatin1`] if there is none.
    #[must_use]
    pub fn code_page(&self) -> Option<CodePage> {
        self.code_page
    }

    /// Whether reading stops before the screenshot and the load order.
    #[must_use]
    pub fn quick(&self) -> bool {
        self.quick
    }
}

/// The header of a save game.
///
/// ```rust
/// use gamebryo_save::{prelude::*, ReadOptions, SaveGame};
/// use std::path::Path;
///
/// fn example() -> Option<()> {
///     let path = Path::new("path/to/Fallout4/Saves/Save1_0E5F5A1E_0_4E617465_Commonwealth_000042_20231105213427_3_1.fos");
///     let save = SaveGame::read(path, &ReadOptions::default()).ok()?;
///     for plugin in save.plugins() {
///         println!("{plugin}");
///     }
///     let dimensions = save.screenshot_dimensions();
///     assert_eq!(
///         save.screenshot().len(),
///         (dimensions.width * dimensions.height * 4) as usize
///     );
///     Some(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct SaveGame {
    pub(crate) file_name: String,
    pub(crate) quick_read: bool,
    pub(crate) format: FileFormat,
    pub(crate) character_name: String,
    pub(crate) character_level: u16,
    pub(crate) location: String,
    pub(crate) play_time: String,
    pub(crate) save_number: u32,
    pub(crate) creation_time: u32,
    pub(crate) plugins: Vec<String>,
    pub(crate) screenshot_dimensions: Dimensions,
    pub(crate) screenshot: Vec<u8>,
}

impl Sealed for SaveGame {}

impl SaveGame {
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Whether the screenshot and the load order were skipped.
    #[must_use]
    pub fn is_quick_read(&self) -> bool {
        self.quick_read
    }

    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.format
    }

    #[must_use]
    pub fn character_name(&self) -> &str {
        &self.character_name
    }

    #[must_use]
    pub fn character_level(&self) -> u16 {
        self.character_level
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The in-game time played, formatted however the game chose to format it.
    #[must_use]
    pub fn play_time(&self) -> &str {
        &self.play_time
    }

    #[must_use]
    pub fn save_number(&self) -> u32 {
        self.save_number
    }

    /// When the save was made, in seconds since the unix epoch.
    ///
    /// If the save itself does not record this, then the file's modification time is used
    /// instead, when available.
    #[must_use]
    pub fn creation_time(&self) -> u32 {
        self.creation_time
    }

    /// The load order, with any light plugins following the full plugins.
    #[must_use]
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    #[must_use]
    pub fn screenshot_dimensions(&self) -> Dimensions {
        self.screenshot_dimensions
    }

    /// The screenshot, as row-major rgba.
    #[must_use]
    pub fn screenshot(&self) -> &[u8] {
        &self.screenshot
    }

    pub(crate) fn set_screenshot(&mut self, screenshot: Screenshot) {
        self.screenshot_dimensions = screenshot.dimensions;
        self.screenshot = screenshot.pixels;
    }

    fn do_read(
        mut stream: Stream<'_>,
        file_name: String,
        code_page: CodePage,
        options: &ReadOptions,
    ) -> Result<Self> {
        let format = guess::detect(&mut stream).ok_or(Error::UnrecognizedFormat)?;
        tracing::debug!(?format, ?code_page, %file_name, "reading save game");

        let mut reader = FieldReader::new(stream, code_page);
        let mut save = Self {
            file_name,
            quick_read: options.quick,
            format,
            character_name: String::new(),
            character_level: 0,
            location: String::new(),
            play_time: String::new(),
            save_number: 0,
            creation_time: 0,
            plugins: Vec::new(),
            screenshot_dimensions: Dimensions::default(),
            screenshot: Vec::new(),
        };

        match format {
            FileFormat::TES4 => tes4::read(&mut reader, &mut save),
            FileFormat::TES5 => tes5::read(&mut reader, &mut save),
            FileFormat::FO3 => fo3::read(&mut reader, &mut save),
            FileFormat::FO4 => fo4::read(&mut reader, &mut save),
        }?;

        Ok(save)
    }

    fn fall_back_to_modified_time(&mut self, metadata: io::Result<Metadata>) {
        if self.creation_time != 0 {
            return;
        }

        match metadata.and_then(|x| x.modified()) {
            #[allow(clippy::cast_possible_truncation)]
            Ok(modified) => {
                self.creation_time = modified
                    .duration_since(UNIX_EPOCH)
                    .map_or(0, |x| x.as_secs() as u32);
            }
            Err(err) => {
                tracing::warn!(file_name = %self.file_name, %err, "failed to query modification time");
            }
        }
    }
}

impl<'bytes> ReaderWithOptions<Borrowed<'bytes>> for SaveGame {
    type Error = Error;
    type Item = SaveGame;
    type Options = ReadOptions;

    fn read(source: Borrowed<'bytes>, options: &Self::Options) -> Result<Self::Item> {
        let source = DirectSource::from_borrowed(source.0);
        let code_page = options.code_page.unwrap_or_default();
        Self::do_read(source.into(), String::new(), code_page, options)
    }
}

impl<'bytes> ReaderWithOptions<Copied<'bytes>> for SaveGame {
    type Error = Error;
    type Item = SaveGame;
    type Options = ReadOptions;

    fn read(source: Copied<'bytes>, options: &Self::Options) -> Result<Self::Item> {
        let source = DirectSource::from_owned(source.0.to_vec());
        let code_page = options.code_page.unwrap_or_default();
        Self::do_read(source.into(), String::new(), code_page, options)
    }
}

impl ReaderWithOptions<&File> for SaveGame {
    type Error = Error;
    type Item = SaveGame;
    type Options = ReadOptions;

    fn read(source: &File, options: &Self::Options) -> Result<Self::Item> {
        let mapped = DirectSource::try_from(source).map_err(|source| Error::Open {
            syscall: "mmap",
            file_name: String::new(),
            source,
        })?;
        let code_page = options.code_page.unwrap_or_default();
        let mut save = Self::do_read(mapped.into(), String::new(), code_page, options)?;
        save.fall_back_to_modified_time(source.metadata());
        Ok(save)
    }
}

impl ReaderWithOptions<&Path> for SaveGame {
    type Error = Error;
    type Item = SaveGame;
    type Options = ReadOptions;

    fn read(source: &Path, options: &Self::Options) -> Result<Self::Item> {
        let file_name = source.to_string_lossy().into_owned();
        let open_error = |syscall| {
            let file_name = file_name.clone();
            move |source| Error::Open {
                syscall,
                file_name,
                source,
            }
        };

        let fd = File::open(source).map_err(open_error("open"))?;
        let mapped = DirectSource::try_from(&fd).map_err(open_error("mmap"))?;
        let code_page = options
            .code_page
            .unwrap_or_else(|| encoding::guess_code_page(source));

        let mut save = Self::do_read(mapped.into(), file_name, code_page, options)?;
        save.fall_back_to_modified_time(fs::metadata(source));
        Ok(save)
    }
}
