//! General utility module housing size formatting functions.
use crate::types::{UtilError, UtilResult};

/// Binary unit labels, in ascending order of magnitude.
const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Rendering mode for byte counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeFormat {
    /// Four significant digits with 1024-based units.
    Human,
    /// Whole number of blocks of the given size.
    Blocks(u64),
}

impl SizeFormat {
    /// Parses a block size argument.
    ///
    /// Accepts `auto` for human readable output, or a positive integer
    /// with an optional binary `K`, `M` or `G` suffix.
    pub fn parse(value: &str) -> UtilResult<SizeFormat> {
        let value = value.trim();

        if value.eq_ignore_ascii_case("auto") {
            return Ok(SizeFormat::Human);
        }

        let (digits, scale) = match value.chars().last().map(|c| c.to_ascii_uppercase()) {
            Some('K') => (&value[..value.len() - 1], 1 << 10),
            Some('M') => (&value[..value.len() - 1], 1 << 20),
            Some('G') => (&value[..value.len() - 1], 1 << 30),
            _ => (value, 1),
        };

        let invalid = || UtilError::config(format!("invalid block size: {}", value));
        let blocks = digits.parse::<u64>().map_err(|_| invalid())?;

        match blocks.checked_mul(scale) {
            Some(size) if size > 0 => Ok(SizeFormat::Blocks(size)),
            _ => Err(invalid()),
        }
    }

    /// Renders a byte count using this format.
    pub fn format(&self, bytes: u64) -> String {
        match *self {
            SizeFormat::Human => format_size(bytes),
            SizeFormat::Blocks(size) => format!("{} blocks", round_blocks(bytes, size)),
        }
    }
}

/// Converts a byte count to a four significant digit `String`.
///
/// Values below 1024 are printed as a plain byte count; anything else is
/// scaled into the largest binary unit leaving a value of at least one.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} {}", bytes, UNITS[0]);
    }

    let mut unit = 0;
    let mut scaled = bytes as f64;

    while scaled >= 1024.0 && unit < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }

    format!("{} {}", four_significant(scaled), UNITS[unit])
}

/// Formats a value (>= 1) with four significant digits.
fn four_significant(value: f64) -> String {
    // thresholds account for rounding up into the next digit
    let decimals = if value < 9.9995 {
        3
    } else if value < 99.995 {
        2
    } else if value < 999.95 {
        1
    } else {
        0
    };
    format!("{:.*}", decimals, value)
}

/// Divides bytes into blocks, rounding to nearest with ties to even.
fn round_blocks(bytes: u64, size: u64) -> u64 {
    let whole = bytes / size;
    let rem = bytes % size;

    // compare the remainder against half a block without overflow
    let half = size - rem;
    if rem > half || (rem == half && whole % 2 == 1) {
        whole + 1
    } else {
        whole
    }
}
