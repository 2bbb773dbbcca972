//! Synthesized saves for the test suites.

use crate::FileFormat;
use encoding_rs::WINDOWS_1251;
use flate2::{write::ZlibEncoder, Compression};
use lzzzz::lz4_hc;
use std::io::Write as _;

pub(crate) const SCREENSHOT_WIDTH: u32 = 3;
pub(crate) const SCREENSHOT_HEIGHT: u32 = 2;

/// 2009-07-25T23:00:00Z
const FILETIME: u64 = 128_930_364_000_000_000;
const EPOCH: u32 = 1_248_562_800;

/// Lays out fields the way the games do, optionally following every fixed field with a `'|'`.
#[derive(Default)]
pub(crate) struct Writer {
    bytes: Vec<u8>,
    field_markers: bool,
}

impl Writer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field_markers() -> Self {
        Self {
            bytes: Vec::new(),
            field_markers: true,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    fn fixed(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        if self.field_markers {
            self.bytes.push(b'|');
        }
        self
    }

    #[must_use]
    pub fn u8(self, value: u8) -> Self {
        self.fixed(&[value])
    }

    #[must_use]
    pub fn u16(self, value: u16) -> Self {
        self.fixed(&value.to_le_bytes())
    }

    #[must_use]
    pub fn u32(self, value: u32) -> Self {
        self.fixed(&value.to_le_bytes())
    }

    #[must_use]
    pub fn u64(self, value: u64) -> Self {
        self.fixed(&value.to_le_bytes())
    }

    #[must_use]
    pub fn i32(self, value: i32) -> Self {
        self.fixed(&value.to_le_bytes())
    }

    #[must_use]
    pub fn f32(self, value: f32) -> Self {
        self.fixed(&value.to_le_bytes())
    }

    /// A string with a two byte length prefix.
    #[must_use]
    pub fn wbytes(self, bytes: &[u8]) -> Self {
        let len = u16::try_from(bytes.len()).expect("string is too long for a wstring");
        let mut this = self.u16(len);
        if !bytes.is_empty() {
            this = this.raw(bytes);
            if this.field_markers {
                this.bytes.push(b'|');
            }
        }
        this
    }

    #[must_use]
    pub fn wstring(self, s: &str) -> Self {
        self.wbytes(s.as_bytes())
    }

    /// A string with a one byte length prefix, which counts the null terminator.
    #[must_use]
    pub fn bzstring(self, s: &str) -> Self {
        let len = u8::try_from(s.len() + 1).expect("string is too long for a bzstring");
        self.u8(len).raw(s.as_bytes()).raw(&[0])
    }

    /// A string with a one byte length prefix, and no terminator.
    #[must_use]
    pub fn bstring(self, s: &str) -> Self {
        let len = u8::try_from(s.len()).expect("string is too long for a bstring");
        self.u8(len).raw(s.as_bytes())
    }

    #[must_use]
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    fn system_time(self, fields: [u16; 8]) -> Self {
        fields.into_iter().fold(self, |this, x| this.raw(&x.to_le_bytes()))
    }

    fn pixels(self, alpha: bool) -> Self {
        let bpp = if alpha { 4 } else { 3 };
        let len = (SCREENSHOT_WIDTH * SCREENSHOT_HEIGHT * bpp) as usize;
        #[allow(clippy::cast_possible_truncation)]
        let pixels: Vec<u8> = (0..len).map(|x| (x * 7) as u8).collect();
        self.raw(&pixels)
    }
}

pub(crate) fn zlib(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut e = ZlibEncoder::new(Vec::new(), Compression::default());
    e.write_all(bytes)?;
    Ok(e.finish()?)
}

pub(crate) fn lz4(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut compressed = Vec::new();
    lz4_hc::compress_to_vec(bytes, &mut compressed, lz4_hc::CLEVEL_MAX)?;
    Ok(compressed)
}

/// A well formed save, along with everything a reader is expected to pull out of it.
pub(crate) struct Fixture {
    pub format: FileFormat,
    pub bytes: Vec<u8>,
    /// Everything a quick read needs, i.e. the offset at which the screenshot begins.
    pub quick_len: usize,
    pub character_name: String,
    pub character_level: u16,
    pub location: String,
    pub play_time: String,
    pub save_number: u32,
    pub creation_time: u32,
    pub plugins: Vec<String>,
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|&x| x.to_owned()).collect()
}

pub(crate) fn tes4() -> anyhow::Result<Fixture> {
    let plugins = strings(&["Oblivion.esm", "Knights.esp", "DLCShiveringIsles.esp"]);
    let head = Writer::new()
        .raw(FileFormat::TES4.magic())
        .u8(0)
        .u8(125)
        .system_time([2006, 3, 1, 20, 12, 0, 0, 0])
        .u32(0x7D)
        .u32(0x1C9)
        .u32(17)
        .bzstring("Prisoner")
        .u16(12)
        .bzstring("Imperial City Prison")
        .f32(3.75)
        .u32(0x0012_3456)
        .system_time([2009, 7, 6, 25, 23, 0, 0, 500]);
    let quick_len = head.len();

    let mut tail = head
        .u32(SCREENSHOT_WIDTH * SCREENSHOT_HEIGHT * 3 + 8)
        .u32(SCREENSHOT_WIDTH)
        .u32(SCREENSHOT_HEIGHT)
        .pixels(false)
        .u8(u8::try_from(plugins.len())?);
    for plugin in &plugins {
        tail = tail.bstring(plugin);
    }

    Ok(Fixture {
        format: FileFormat::TES4,
        bytes: tail.finish(),
        quick_len,
        character_name: "Prisoner".into(),
        character_level: 12,
        location: "Imperial City Prison".into(),
        play_time: "3 days, 18 hours".into(),
        save_number: 17,
        creation_time: EPOCH,
        plugins,
    })
}

fn tes5_head(version: u32, name: &[u8], location: &[u8]) -> Writer {
    Writer::new()
        .raw(FileFormat::TES5.magic())
        .u32(0x1F4)
        .u32(version)
        .u32(12)
        .wbytes(name)
        .u32(81)
        .wbytes(location)
        .wstring("012.04.33")
        .wstring("NordRace")
        .u16(0)
        .f32(120.5)
        .f32(4000.0)
        .u64(FILETIME)
}

fn tes5_fixture(bytes: Vec<u8>, quick_len: usize, plugins: Vec<String>) -> Fixture {
    Fixture {
        format: FileFormat::TES5,
        bytes,
        quick_len,
        character_name: "Dovahkiin".into(),
        character_level: 81,
        location: "Whiterun".into(),
        play_time: "012.04.33".into(),
        save_number: 12,
        creation_time: EPOCH,
        plugins,
    }
}

fn plugin_list(mut writer: Writer, plugins: &[String]) -> anyhow::Result<Writer> {
    writer = writer.u8(u8::try_from(plugins.len())?);
    for plugin in plugins {
        writer = writer.wstring(plugin);
    }
    Ok(writer)
}

fn light_plugin_list(mut writer: Writer, plugins: &[String]) -> anyhow::Result<Writer> {
    writer = writer.u16(u16::try_from(plugins.len())?);
    for plugin in plugins {
        writer = writer.wstring(plugin);
    }
    Ok(writer)
}

/// Skyrim, before the special edition.
pub(crate) fn tes5() -> anyhow::Result<Fixture> {
    let plugins = strings(&["Skyrim.esm", "Update.esm", "Dawnguard.esm"]);
    let head = tes5_head(9, b"Dovahkiin", b"Whiterun");
    let quick_len = head.len();

    let tail = head
        .u32(SCREENSHOT_WIDTH)
        .u32(SCREENSHOT_HEIGHT)
        .pixels(false)
        .u8(74)
        .u32(0x40);
    let tail = plugin_list(tail, &plugins)?;
    Ok(tes5_fixture(tail.finish(), quick_len, plugins))
}

/// Skyrim: Special Edition, with its remainder compressed using the given compression code.
///
/// Unknown codes leave the remainder uncompressed.
pub(crate) fn tes5_se(compression: u16) -> anyhow::Result<Fixture> {
    let full = strings(&["Skyrim.esm", "Update.esm", "Dawnguard.esm"]);
    let light = strings(&["ccBGSSSE001-Fish.esl", "ccQDRSSE001-SurvivalMode.esl"]);

    let body = plugin_list(Writer::new().u8(0x4E).u32(0x80), &full)?;
    let body = light_plugin_list(body, &light)?.finish();
    let compressed = match compression {
        1 => zlib(&body)?,
        2 => lz4(&body)?,
        _ => body.clone(),
    };

    let head = tes5_head(12, b"Dovahkiin", b"Whiterun");
    let quick_len = head.len();
    let tail = head
        .u32(SCREENSHOT_WIDTH)
        .u32(SCREENSHOT_HEIGHT)
        .u16(compression)
        .pixels(true)
        .u32(u32::try_from(body.len())?)
        .u32(u32::try_from(compressed.len())?)
        .raw(&compressed);

    let plugins = full.into_iter().chain(light).collect();
    Ok(tes5_fixture(tail.finish(), quick_len, plugins))
}

/// A russian Skyrim save, whose text is encoded using windows-1251.
pub(crate) fn tes5_cyrillic() -> anyhow::Result<Fixture> {
    let (name, _, unmappable) = WINDOWS_1251.encode("Довакин");
    anyhow::ensure!(!unmappable);
    let (location, _, unmappable) = WINDOWS_1251.encode("Вайтран");
    anyhow::ensure!(!unmappable);

    let head = tes5_head(9, &name, &location);
    let quick_len = head.len();
    let mut fixture = tes5_fixture(head.finish(), quick_len, Vec::new());
    fixture.character_name = "Довакин".into();
    fixture.location = "Вайтран".into();
    Ok(fixture)
}

fn fo3_fixture(new_vegas: bool) -> anyhow::Result<Fixture> {
    let plugins = if new_vegas {
        strings(&["FalloutNV.esm", "DeadMoney.esm", "HonestHearts.esm"])
    } else {
        strings(&["Fallout3.esm", "Anchorage.esm", "ThePitt.esm"])
    };
    let (name, location, play_time) = if new_vegas {
        ("Courier", "Goodsprings", "000.03.12")
    } else {
        ("Lone Wanderer", "Megaton", "000.01.47")
    };

    let mut head = Writer::new()
        .raw(FileFormat::FO3.magic())
        .u32(0x4A6)
        .u32(0x30)
        .u8(b'|');
    if new_vegas {
        head = head.raw(b"\x03\x00ENG|");
    }

    // from here on, every field carries a marker
    let head = Writer::with_field_markers()
        .raw(&head.finish())
        .u32(SCREENSHOT_WIDTH)
        .u32(SCREENSHOT_HEIGHT)
        .u32(7)
        .wstring(name)
        .wstring("")
        .i32(23)
        .wstring(location)
        .wstring(play_time);
    let quick_len = head.len();

    let tail = head.pixels(false).raw(&[0x15, 0x5A, 0x00, 0x00, 0x00]);
    let tail = plugin_list(tail, &plugins)?;

    Ok(Fixture {
        format: FileFormat::FO3,
        bytes: tail.finish(),
        quick_len,
        character_name: name.into(),
        character_level: 23,
        location: location.into(),
        play_time: play_time.into(),
        save_number: 7,
        creation_time: 0,
        plugins,
    })
}

pub(crate) fn fo3() -> anyhow::Result<Fixture> {
    fo3_fixture(false)
}

pub(crate) fn fnv() -> anyhow::Result<Fixture> {
    fo3_fixture(true)
}

pub(crate) fn fo4() -> anyhow::Result<Fixture> {
    let full = strings(&["Fallout4.esm", "DLCRobot.esm", "DLCworkshop01.esm"]);
    let light = strings(&["ccBGSFO4001-PipBoy(Black).esl"]);

    let head = Writer::new()
        .raw(FileFormat::FO4.magic())
        .u32(0x1C3)
        .u32(11)
        .u32(42)
        .wstring("Nate")
        .u32(50)
        .wstring("Sanctuary Hills")
        .wstring("002.13.07")
        .wstring("HumanRace")
        .u16(0)
        .f32(15.0)
        .f32(850.0)
        .u64(FILETIME);
    let quick_len = head.len();

    let tail = head
        .u32(SCREENSHOT_WIDTH)
        .u32(SCREENSHOT_HEIGHT)
        .pixels(true)
        .u8(0x44)
        .wstring("1.10.163.0")
        .u32(0x1A0);
    let tail = plugin_list(tail, &full)?;
    let tail = light_plugin_list(tail, &light)?;

    Ok(Fixture {
        format: FileFormat::FO4,
        bytes: tail.finish(),
        quick_len,
        character_name: "Nate".into(),
        character_level: 50,
        location: "Sanctuary Hills".into(),
        play_time: "002.13.07".into(),
        save_number: 42,
        creation_time: EPOCH,
        plugins: full.into_iter().chain(light).collect(),
    })
}

/// One fixture for every supported flavor of save.
pub(crate) fn all() -> anyhow::Result<Vec<Fixture>> {
    Ok(vec![
        tes4()?,
        tes5()?,
        tes5_se(1)?,
        tes5_se(2)?,
        fo3()?,
        fnv()?,
        fo4()?,
    ])
}
