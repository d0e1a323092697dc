//! Capture time normalization
//!
//! Photos.sqlite stores capture dates as floating point seconds since the Core Data
//! reference date (2001-01-01T00:00:00Z). Some rows only carry the EXIF timestamp
//! string (`YYYY:MM:DD HH:MM:SS`) in the additional attributes table.
//!
//! The native value is a UTC instant; it is rendered in the asset's own timezone
//! when one is known so that it lines up with the EXIF wall-clock string. Without a
//! timezone it is rendered in UTC and exported with a trailing `Z`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::Serialize;

/// Unix timestamp of 2001-01-01T00:00:00Z
pub const NATIVE_EPOCH_UNIX_OFFSET: i64 = 978_307_200;

/// EXIF-style timestamp layout used by the textual fallback
pub const TEXTUAL_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// ISO-8601 layout used when exporting capture times
const EXPORT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Which field a capture time was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    /// Core Data seconds column on the asset table
    Native,
    /// EXIF timestamp string on the attributes table
    Textual,
}

/// A normalized capture time (wall-clock time at the asset's location when known)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    pub local: NaiveDateTime,
    pub source: TimestampSource,
    /// `local` is UTC because no timezone was known for the asset
    pub utc: bool,
}

impl CaptureTime {
    /// Render as ISO-8601 (`2022-03-21T11:19:30.781480`), sub-seconds only when present.
    /// UTC renderings end in `Z`.
    pub fn to_iso_string(&self) -> String {
        let text = self.local.format(EXPORT_FORMAT).to_string();
        if self.utc {
            text + "Z"
        } else {
            text
        }
    }
}

/// Convert Core Data seconds to a UTC instant, keeping microsecond precision.
///
/// Returns `None` for non-finite or out-of-range input.
pub fn from_native_epoch(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }

    let whole = seconds.floor();
    let mut micros = ((seconds - whole) * 1_000_000.0).round() as i64;
    let mut whole = whole as i64;
    if micros >= 1_000_000 {
        whole = whole.checked_add(1)?;
        micros -= 1_000_000;
    }

    let unix = whole.checked_add(NATIVE_EPOCH_UNIX_OFFSET)?;
    DateTime::from_timestamp(unix, (micros * 1_000) as u32)
}

/// Inverse of [`from_native_epoch`]
pub fn to_native_epoch(instant: DateTime<Utc>) -> f64 {
    let secs = instant.timestamp() - NATIVE_EPOCH_UNIX_OFFSET;
    secs as f64 + f64::from(instant.timestamp_subsec_micros()) / 1_000_000.0
}

/// Strictly parse an EXIF-style `YYYY:MM:DD HH:MM:SS` string
pub fn parse_textual(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text.trim(), TEXTUAL_FORMAT)
}

/// Parse a Photos timezone name such as `GMT+0900`, `GMT-05:30` or `GMT`.
///
/// Region names (`Asia/Tokyo`) are not resolved and yield `None`.
pub fn offset_from_timezone_name(name: &str) -> Option<FixedOffset> {
    let name = name.trim();
    let rest = name
        .strip_prefix("GMT")
        .or_else(|| name.strip_prefix("UTC"))?;

    if rest.is_empty() {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match rest.as_bytes()[0] {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };

    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Offset from a seconds-east-of-UTC column value
pub fn offset_from_seconds(seconds: i64) -> Option<FixedOffset> {
    FixedOffset::east_opt(i32::try_from(seconds).ok()?)
}

/// Pick and normalize the capture time of one record.
///
/// The native field wins whenever it is present; the textual field is consulted only
/// when the native one is NULL. `Err` carries an anomaly description for a field that
/// was present but unusable; the record simply has no capture time then.
pub fn resolve_capture_time(
    native: Option<f64>,
    textual: Option<&str>,
    offset: Option<FixedOffset>,
) -> Result<Option<CaptureTime>, String> {
    if let Some(seconds) = native {
        let instant = from_native_epoch(seconds)
            .ok_or_else(|| format!("native timestamp {} out of range", seconds))?;
        let local = match offset {
            Some(offset) => instant.with_timezone(&offset).naive_local(),
            None => instant.naive_utc(),
        };
        return Ok(Some(CaptureTime {
            local,
            source: TimestampSource::Native,
            utc: offset.is_none(),
        }));
    }

    match textual {
        Some(text) if !text.trim().is_empty() => parse_textual(text)
            .map(|local| {
                Some(CaptureTime {
                    local,
                    source: TimestampSource::Textual,
                    utc: false,
                })
            })
            .map_err(|e| format!("malformed timestamp '{}': {}", text, e)),
        _ => Ok(None),
    }
}
