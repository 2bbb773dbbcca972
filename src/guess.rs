use crate::io::Source;
use std::io::{Read, SeekFrom};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FileFormat {
    /// The Elder Scrolls IV: Oblivion.
    #[doc(alias = "oblivion")]
    TES4,
    /// The Elder Scrolls V: Skyrim, and Skyrim: Special Edition.
    #[doc(alias = "skyrim")]
    #[doc(alias = "sse")]
    TES5,
    /// Fallout 3, and Fallout: New Vegas.
    #[doc(alias = "new vegas")]
    #[doc(alias = "fnv")]
    FO3,
    /// Fallout 4.
    FO4,
}

impl FileFormat {
    const ALL: [Self; 4] = [Self::TES4, Self::TES5, Self::FO3, Self::FO4];

    /// The identifier that the game writes at the very start of the save.
    #[must_use]
    pub fn magic(self) -> &'static [u8] {
        match self {
            Self::TES4 => b"TES4SAVEGAME",
            Self::TES5 => b"TESV_SAVEGAME",
            Self::FO3 => b"FO3SAVEGAME",
            Self::FO4 => b"FO4_SAVEGAME",
        }
    }
}

/// Guesses the format of a save game from the first few bytes of `source`.
#[allow(clippy::module_name_repetitions)]
pub fn guess_format<In>(source: &mut In) -> Option<FileFormat>
where
    In: ?Sized + Read,
{
    let longest = FileFormat::ALL
        .iter()
        .map(|x| x.magic().len())
        .max()
        .unwrap_or_default();
    let mut buf = Vec::with_capacity(longest);
    source.take(longest as u64).read_to_end(&mut buf).ok()?;
    FileFormat::ALL
        .into_iter()
        .find(|x| buf.starts_with(x.magic()))
}

/// Matches the start of `source` against every known magic, leaving the cursor right after the
/// magic that matched.
pub(crate) fn detect<S>(source: &mut S) -> Option<FileFormat>
where
    S: ?Sized + Source,
{
    let result = FileFormat::ALL.into_iter().find(|format| {
        let magic = format.magic();
        source.clear();
        source.seek(SeekFrom::Start(0)) && source.read_bytes(magic.len()) == Some(magic)
    });
    source.clear();
    result
}
