//! Parsing of human-readable quantities used on the command line.
//!
//! Memory sizes use binary multiples (`kB` = 1024 bytes) the way simulator memory
//! parameters traditionally do; frequencies use metric multiples.

use crate::common::error::ConfigError;

/// Simulated ticks per second (one tick is one picosecond).
pub const TICKS_PER_SECOND: u64 = 1_000_000_000_000;

const SIZE_UNITS: &[(&str, u64)] = &[
    ("TiB", 1 << 40),
    ("GiB", 1 << 30),
    ("MiB", 1 << 20),
    ("KiB", 1 << 10),
    ("TB", 1 << 40),
    ("GB", 1 << 30),
    ("MB", 1 << 20),
    ("kB", 1 << 10),
    ("KB", 1 << 10),
    ("B", 1),
];

const FREQ_UNITS: &[(&str, f64)] = &[
    ("GHz", 1e9),
    ("MHz", 1e6),
    ("kHz", 1e3),
    ("Hz", 1.0),
];

/// Splits `text` into a numeric prefix and the first matching unit suffix.
fn split_unit<'a, T: Copy>(text: &'a str, units: &[(&str, T)]) -> Option<(&'a str, Option<T>)> {
    let text = text.trim();
    for (suffix, scale) in units {
        if let Some(number) = text.strip_suffix(suffix) {
            return Some((number.trim(), Some(*scale)));
        }
    }
    if text.is_empty() {
        None
    } else {
        Some((text, None))
    }
}

/// Parses a memory size such as `"2GB"`, `"512MiB"` or `"4096"` into bytes.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSize`] for unknown units, fractional byte counts,
/// zero or overflowing sizes.
pub fn parse_size(text: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidSize(text.to_string());
    let (number, scale) = split_unit(text, SIZE_UNITS).ok_or_else(invalid)?;
    let scale = scale.unwrap_or(1);

    let bytes = if let Ok(whole) = number.parse::<u64>() {
        whole.checked_mul(scale).ok_or_else(invalid)?
    } else {
        let value: f64 = number.parse().map_err(|_| invalid())?;
        let bytes = value * scale as f64;
        if !bytes.is_finite() || bytes.fract() != 0.0 || bytes >= u64::MAX as f64 {
            return Err(invalid());
        }
        bytes as u64
    };

    if bytes == 0 {
        return Err(invalid());
    }
    Ok(bytes)
}

/// Parses a clock frequency such as `"4GHz"` or `"800MHz"` into hertz.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidFrequency`] for missing units, non-positive values
/// or frequencies too high to express a whole-tick period.
pub fn parse_frequency(text: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidFrequency(text.to_string());
    let (number, scale) = split_unit(text, FREQ_UNITS).ok_or_else(invalid)?;
    let scale = scale.ok_or_else(invalid)?;
    let value: f64 = number.parse().map_err(|_| invalid())?;
    let hz = value * scale;
    if !hz.is_finite() || hz < 1.0 || hz > TICKS_PER_SECOND as f64 {
        return Err(invalid());
    }
    Ok(hz.round() as u64)
}

/// Parses a supply voltage such as `"1.0V"` or `"900mV"` into volts.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidVoltage`] for missing units or non-positive values.
pub fn parse_voltage(text: &str) -> Result<f64, ConfigError> {
    let invalid = || ConfigError::InvalidVoltage(text.to_string());
    let trimmed = text.trim();
    let (number, scale) = if let Some(n) = trimmed.strip_suffix("mV") {
        (n, 1e-3)
    } else if let Some(n) = trimmed.strip_suffix('V') {
        (n, 1.0)
    } else {
        return Err(invalid());
    };
    let volts = number.trim().parse::<f64>().map_err(|_| invalid())? * scale;
    if !volts.is_finite() || volts <= 0.0 {
        return Err(invalid());
    }
    Ok(volts)
}

/// Converts a frequency in hertz to a clock period in ticks, rounding to nearest.
pub fn period_ticks(hz: u64) -> u64 {
    (TICKS_PER_SECOND + hz / 2) / hz
}
