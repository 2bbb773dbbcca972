//! Fallout 3
//!
//! *"War. War never changes."*
//!
//! Fallout 3 and Fallout: New Vegas both write `FO3SAVEGAME`, and share a header version. New
//! Vegas inserts an extra field ahead of the screenshot dimensions, which is detected by scanning
//! for the first field separator. The rest of the header follows every fixed size field, and every
//! non-empty string, with a `'|'`.

use crate::{reader::FieldReader, Dimensions, Result, SaveGame};

/// The scan length when the extra field is absent: a `u32` and its separator.
const FALLOUT_3_SCAN_LEN: usize = 5;

/// Skips New Vegas's extra field, if there is one.
///
/// The extra field has no marker of its own, so a scan which hits a separator after exactly
/// [`FALLOUT_3_SCAN_LEN`] bytes is assumed to have walked over the screenshot width instead.
fn skip_new_vegas_field(reader: &mut FieldReader) -> Result<()> {
    let start = reader.stream_position();
    let mut scanned = 0usize;
    loop {
        let byte: u8 = reader.read()?;
        scanned += 1;
        if byte == b'|' {
            break;
        }
    }

    let new_vegas = scanned != FALLOUT_3_SCAN_LEN;
    tracing::debug!(start, scanned, new_vegas, "scanned for the new vegas field");
    if !new_vegas {
        reader.seek_absolute(start)?;
    }
    Ok(())
}

pub(crate) fn read(reader: &mut FieldReader, save: &mut SaveGame) -> Result<()> {
    reader.set_bz_strings(false);
    reader.set_field_markers(false);

    reader.skip::<u32>(2)?; // header size, file version
    reader.skip::<u8>(1)?; // delimiter
    skip_new_vegas_field(reader)?;

    reader.set_field_markers(true);

    let dimensions = Dimensions {
        width: reader.read()?,
        height: reader.read()?,
    };
    save.save_number = reader.read()?;
    save.character_name = reader.read_string()?;
    reader.read_string()?; // unknown

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let level = reader.read::<i32>()? as u16;
    save.character_level = level;

    save.location = reader.read_string()?;
    save.play_time = reader.read_string()?;

    if save.quick_read {
        return Ok(());
    }

    let screenshot = reader.read_image(Some(dimensions), false)?;
    save.set_screenshot(screenshot);
    reader.skip::<u8>(5)?; // unknown, plugin data size
    reader.read_plugins(false, &mut save.plugins)?;

    Ok(())
}
