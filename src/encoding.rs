use bstr::ByteSlice as _;
use encoding_rs::{WINDOWS_1251, WINDOWS_1252};
use std::path::Path;

/// The single byte encoding used to interpret text stored in a save.
///
/// Saves never declare which encoding their strings use, so this is either guessed from the file
/// name with [`guess_code_page`], or supplied by the caller.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CodePage {
    /// Windows-1252.
    Latin1,
    /// Windows-1251.
    Cyrillic,
    /// UTF-8, with invalid sequences replaced.
    Utf8,
    /// UTF-8, falling back to windows-1252 when the text is not valid UTF-8.
    #[default]
    Utf8OrLatin1,
}

impl CodePage {
    /// Transcodes `bytes` into UTF-8.
    ///
    /// ```rust
    /// use gamebryo_save::CodePage;
    ///
    /// assert_eq!(CodePage::Cyrillic.decode(b"\xcf\xf0\xe8\xe2\xe5\xf2"), "Привет");
    /// assert_eq!(CodePage::Utf8OrLatin1.decode("Ysgramor".as_bytes()), "Ysgramor");
    /// assert_eq!(CodePage::Utf8OrLatin1.decode(b"Ald\xe9ran"), "Aldéran");
    /// ```
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Latin1 => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
            Self::Cyrillic => WINDOWS_1251.decode_without_bom_handling(bytes).0.into_owned(),
            Self::Utf8 => bytes.to_str_lossy().into_owned(),
            Self::Utf8OrLatin1 => match bytes.to_str() {
                Ok(s) => s.to_owned(),
                Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
            },
        }
    }
}

#[must_use]
fn renders_the_same(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | '.' | ' ')
}

#[must_use]
fn is_cyrillic(c: char) -> bool {
    ('\u{400}'..='\u{52F}').contains(&c)
}

/// Guesses the encoding of a save's text from the name of the file it was saved under.
///
/// The game names saves after the character and their location, so a name which is mostly
/// cyrillic implies a cyrillic install. Digits, dashes, dots, and spaces are ignored since they
/// look the same in every code page.
///
/// ```rust
/// use gamebryo_save::{guess_code_page, CodePage};
/// use std::path::Path;
///
/// let path = Path::new("Saves/Save 4 - Довакин  Вайтран  01.12.05.ess");
/// assert_eq!(guess_code_page(path), CodePage::Cyrillic);
/// let path = Path::new("Saves/Save 4 - Dovahkiin  Whiterun  01.12.05.ess");
/// assert_eq!(guess_code_page(path), CodePage::Utf8OrLatin1);
/// ```
#[must_use]
pub fn guess_code_page(path: &Path) -> CodePage {
    let Some(stem) = path.file_stem() else {
        return CodePage::default();
    };

    let (total, cyrillic) = stem
        .to_string_lossy()
        .chars()
        .filter(|&c| !renders_the_same(c))
        .fold((0usize, 0usize), |(total, cyrillic), c| {
            (total + 1, cyrillic + usize::from(is_cyrillic(c)))
        });

    if cyrillic * 2 > total {
        CodePage::Cyrillic
    } else {
        CodePage::Utf8OrLatin1
    }
}
