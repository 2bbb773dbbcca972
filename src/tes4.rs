//! TES IV: Oblivion
//!
//! *"Stop right there, criminal scum! You violated the law. Pay the court a fine or serve your sentence."*
//!
//! The oldest of the formats, and the only one to use null terminated strings. Oblivion writes
//! its headers straight out of memory, so timestamps are stored as a `SYSTEMTIME` rather than a
//! `FILETIME`, and the play time is stored as a fractional count of in-game days.

use crate::{reader::FieldReader, time::SystemTime, Result, SaveGame};

#[must_use]
fn format_play_time(game_days: f32) -> String {
    let days = game_days.trunc();
    let hours = (game_days - days) * 24.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (days, hours) = (days as u32, hours as u32);
    format!("{days} days, {hours} hours")
}

pub(crate) fn read(reader: &mut FieldReader, save: &mut SaveGame) -> Result<()> {
    reader.set_bz_strings(true);
    reader.set_field_markers(false);

    reader.skip::<u8>(2)?; // major version, minor version
    reader.skip::<SystemTime>(1)?; // when the exe was last modified
    reader.skip::<u32>(2)?; // header version, header size

    save.save_number = reader.read()?;
    save.character_name = reader.read_string()?;
    save.character_level = reader.read()?;
    save.location = reader.read_string()?;

    let game_days: f32 = reader.read()?;
    save.play_time = format_play_time(game_days);
    reader.skip::<u32>(1)?; // game ticks

    let saved_at: SystemTime = reader.read()?;
    save.creation_time = saved_at.to_epoch();

    if save.quick_read {
        return Ok(());
    }

    reader.skip::<u32>(1)?; // screenshot size
    let screenshot = reader.read_image(None, false)?;
    save.set_screenshot(screenshot);
    reader.read_plugins(true, &mut save.plugins)?;

    Ok(())
}
