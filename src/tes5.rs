//! TES V: Skyrim
//!
//! *"Hey, you. You're finally awake. You were trying to cross the border, right?"*
//!
//! Skyrim and Skyrim: Special Edition share the same magic, and are told apart by the header
//! version. The special edition stores its screenshot with an alpha channel, and compresses
//! everything after the screenshot.

use crate::{reader::FieldReader, windows_ticks_to_epoch, Dimensions, Result, SaveGame};

/// The first header version written by the special edition.
const SPECIAL_EDITION: u32 = 0x0C;

/// The first form version to store light plugins.
const LIGHT_PLUGINS: u8 = 0x4E;

pub(crate) fn read(reader: &mut FieldReader, save: &mut SaveGame) -> Result<()> {
    reader.skip::<u32>(1)?; // header size
    let version: u32 = reader.read()?;
    save.save_number = reader.read()?;
    save.character_name = reader.read_string()?;

    #[allow(clippy::cast_possible_truncation)]
    let level = reader.read::<u32>()? as u16;
    save.character_level = level;

    save.location = reader.read_string()?;
    save.play_time = reader.read_string()?;
    reader.read_string()?; // race
    reader.skip::<u16>(1)?; // gender
    reader.skip::<f32>(2)?; // experience gathered, experience required

    #[allow(clippy::cast_possible_wrap)]
    let filetime = reader.read::<u64>()? as i64;
    save.creation_time = windows_ticks_to_epoch(filetime);

    if save.quick_read {
        return Ok(());
    }

    if version < SPECIAL_EDITION {
        let screenshot = reader.read_image(None, false)?;
        save.set_screenshot(screenshot);
    } else {
        let dimensions = Dimensions {
            width: reader.read()?,
            height: reader.read()?,
        };
        let compression: u16 = reader.read()?;
        let screenshot = reader.read_image(Some(dimensions), true)?;
        save.set_screenshot(screenshot);

        let decompressed_len: u32 = reader.read()?;
        let compressed_len: u32 = reader.read()?;
        reader.set_compression(compression, compressed_len, decompressed_len)?;
    }

    let form_version: u8 = reader.read()?;
    reader.skip::<u32>(1)?; // plugin info size
    reader.read_plugins(false, &mut save.plugins)?;
    if form_version >= LIGHT_PLUGINS {
        reader.read_light_plugins(&mut save.plugins)?;
    }

    Ok(())
}
