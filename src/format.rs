//! Formatting helpers for file sizes and timestamps.

use chrono::NaiveDateTime;

/// Wire and display pattern for record timestamps, e.g. `2024/03/01 18:22:05`.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Format a byte count as a human-readable size.
///
/// The value is divided by 1024 until it drops below 1024, then printed with
/// the matching unit (B, KB, MB, GB, everything beyond capped at TB). The
/// fraction is truncated, not rounded: two digits below 10, one digit below
/// 100, none at or above 100. Values that reduce to exactly 0 or 1 print
/// without a fraction.
pub fn format_file_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut level = 0;
    while value >= 1024.0 {
        value /= 1024.0;
        level += 1;
    }

    let unit = match level {
        0 => "B",
        1 => "KB",
        2 => "MB",
        3 => "GB",
        _ => "TB",
    };

    let whole = value as u64;
    let fraction = value - whole as f64;

    if value == 0.0 || value == 1.0 || value >= 100.0 {
        format!("{} {}", whole, unit)
    } else if value < 10.0 {
        format!("{}.{:02} {}", whole, (fraction * 100.0) as u64, unit)
    } else {
        format!("{}.{} {}", whole, (fraction * 10.0) as u64, unit)
    }
}

/// Render a timestamp in the catalog's wire format.
pub fn format_timestamp(when: NaiveDateTime) -> String {
    when.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in the catalog's wire format.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
}
