//! Duration text
//!
//! Durations travel as strings such as `"30s"`, `"1m30s"` or `"1.5h"`. The
//! formatted form always re-parses to the same duration.

use crate::error::ConversionError;
use std::fmt::Write;
use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

/// Largest duration accepted from text, in nanoseconds
const MAX_NANOS: u128 = i64::MAX as u128;

/// Fraction digits beyond this are ignored
const MAX_FRACTION_DIGITS: u32 = 18;

/// Render a duration as `"1h2m3.5s"`, or with a sub-second unit below one second.
/// Durations above `i64::MAX` nanoseconds render but do not parse back; use
/// [`to_text`] where the text must be readable again.
pub fn format(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", decimal(nanos, NANOS_PER_MICRO));
    }
    if nanos < NANOS_PER_SECOND {
        return format!("{}ms", decimal(nanos, NANOS_PER_MILLI));
    }

    let hours = nanos / NANOS_PER_HOUR;
    let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MINUTE;
    let seconds = nanos % NANOS_PER_MINUTE;

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{}h", hours);
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{}m", minutes);
    }
    let _ = write!(out, "{}s", decimal(seconds, NANOS_PER_SECOND));
    out
}

/// Render a duration, refusing ones [`parse`] would reject
pub fn to_text(duration: Duration) -> Result<String, ConversionError> {
    let text = format(duration);
    if duration.as_nanos() > MAX_NANOS {
        return Err(ConversionError::InvalidDuration {
            input: text,
            reason: "duration out of range".to_string(),
        });
    }
    Ok(text)
}

fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{:0width$}", fraction, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Parse a sequence of decimal numbers with unit suffixes
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `"0"`
/// is accepted; negative durations are not.
pub fn parse(input: &str) -> Result<Duration, ConversionError> {
    let invalid = |reason: &str| ConversionError::InvalidDuration {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut rest = input;
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else if rest.starts_with('-') {
        return Err(invalid("negative durations are not supported"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (whole, after_whole) = leading_digits(rest);
        let (fraction, after_fraction) = match after_whole.strip_prefix('.') {
            Some(after_dot) => leading_digits(after_dot),
            None => ("", after_whole),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_len = after_fraction
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_fraction.len());
        let (unit, remainder) = after_fraction.split_at(unit_len);
        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SECOND,
            "m" => NANOS_PER_MINUTE,
            "h" => NANOS_PER_HOUR,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid(&format!("unknown unit {:?}", unit))),
        };

        let whole_value = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|_| invalid("number out of range"))?
        };
        let component = whole_value
            .checked_mul(scale)
            .and_then(|nanos| nanos.checked_add(fraction_nanos(fraction, scale)))
            .ok_or_else(|| invalid("duration out of range"))?;
        total = total
            .checked_add(component)
            .filter(|total| *total <= MAX_NANOS)
            .ok_or_else(|| invalid("duration out of range"))?;

        rest = remainder;
    }

    Ok(Duration::from_nanos(total as u64))
}

fn leading_digits(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text.split_at(end)
}

fn fraction_nanos(digits: &str, scale: u128) -> u128 {
    let mut value: u128 = 0;
    let mut places: u32 = 0;
    for digit in digits.bytes().take(MAX_FRACTION_DIGITS as usize) {
        value = value * 10 + u128::from(digit - b'0');
        places += 1;
    }
    value * scale / 10u128.pow(places)
}
