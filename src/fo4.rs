//! Fallout 4
//!
//! *"Another settlement needs your help. Here, I'll mark it on your map."*
//!
//! Structurally a descendant of the Skyrim header. The screenshot always carries an alpha
//! channel, and nothing is compressed ahead of the load order.

use crate::{reader::FieldReader, windows_ticks_to_epoch, Result, SaveGame};

/// The first form version to store light plugins.
const LIGHT_PLUGINS: u8 = 0x44;

pub(crate) fn read(reader: &mut FieldReader, save: &mut SaveGame) -> Result<()> {
    reader.skip::<u32>(2)?; // header size, header version
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

    let screenshot = reader.read_image(None, true)?;
    save.set_screenshot(screenshot);

    let form_version: u8 = reader.read()?;
    reader.read_string()?; // game version
    reader.skip::<u32>(1)?; // plugin info size
    reader.read_plugins(false, &mut save.plugins)?;
    if form_version >= LIGHT_PLUGINS {
        reader.read_light_plugins(&mut save.plugins)?;
    }

    Ok(())
}
