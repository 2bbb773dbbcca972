use crate::reader::Fixed;
use chrono::NaiveDate;

/// A windows tick is 100ns.
const WINDOWS_TICK: i64 = 10_000_000;

/// The windows epoch is 1601-01-01T00:00:00Z, which is this many seconds before the unix epoch.
const SEC_TO_UNIX_EPOCH: i64 = 11_644_473_600;

/// Converts a `FILETIME`, as stored by Skyrim and Fallout 4, into seconds since the unix epoch.
///
/// The result is truncated to 32 bits.
///
/// ```rust
/// use gamebryo_save::windows_ticks_to_epoch;
///
/// assert_eq!(windows_ticks_to_epoch(116_444_736_000_000_000), 0);
/// assert_eq!(windows_ticks_to_epoch(128_930_364_000_000_000), 1_248_562_800);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn windows_ticks_to_epoch(windows_ticks: i64) -> u32 {
    (windows_ticks / WINDOWS_TICK - SEC_TO_UNIX_EPOCH) as u32
}

/// The windows `SYSTEMTIME` structure, which Oblivion stores verbatim.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct SystemTime {
    pub year: u16,
    pub month: u16,
    pub day_of_week: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub milliseconds: u16,
}

impl SystemTime {
    /// Seconds since the unix epoch, or 0 if the structure does not describe a representable date.
    #[must_use]
    pub fn to_epoch(self) -> u32 {
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())
            .and_then(|date| {
                date.and_hms_opt(self.hour.into(), self.minute.into(), self.second.into())
            })
            .and_then(|datetime| u32::try_from(datetime.and_utc().timestamp()).ok())
            .unwrap_or(0)
    }
}

impl Fixed for SystemTime {
    const SIZE: usize = 16;

    fn from_le_bytes(bytes: &[u8]) -> Self {
        let field = |i: usize| u16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
        Self {
            year: field(0),
            month: field(1),
            day_of_week: field(2),
            day: field(3),
            hour: field(4),
            minute: field(5),
            second: field(6),
            milliseconds: field(7),
        }
    }
}
