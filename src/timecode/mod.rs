//! Conversion between textual timestamps and seconds.
//!
//! Accepted inputs are `SS[.mmm]`, `MM:SS[.mmm]` and `HH:MM:SS[.mmm]`.
//! Formatting always works on whole milliseconds so that parsing a
//! formatted value gives back the same number within 1ms.

use crate::TranscriptError;

/// Delimiter between whole seconds and milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FractionSeparator {
    /// `00:00:01.500`, the WebVTT convention
    #[default]
    Dot,
    /// `00:00:01,500`, the SRT convention
    Comma,
}

impl FractionSeparator {
    pub fn as_char(&self) -> char {
        match self {
            FractionSeparator::Dot => '.',
            FractionSeparator::Comma => ',',
        }
    }
}

/// Largest value whose millisecond count fits in a `u64`
const MAX_SECONDS: f64 = (u64::MAX / 1000) as f64;

/// Parse a timestamp into seconds
pub fn parse_timestamp(text: &str) -> Result<f64, TranscriptError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(invalid("time string cannot be empty", text));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err(invalid("too many colons", text));
    }

    let (whole_parts, seconds_part) = parts.split_at(parts.len() - 1);

    let mut total = 0.0;
    for part in whole_parts {
        if !is_digits(part) {
            return Err(invalid("component is not numeric", text));
        }
        let value: u64 = part
            .parse()
            .map_err(|_| invalid("component is not numeric", text))?;
        total = total * 60.0 + value as f64;
    }

    let seconds_text = seconds_part[0];
    let well_formed = match seconds_text.split_once('.') {
        Some((whole, fraction)) => is_digits(whole) && is_digits(fraction),
        None => is_digits(seconds_text),
    };
    if !well_formed {
        return Err(invalid("seconds are not numeric", text));
    }
    let seconds: f64 = seconds_text
        .parse()
        .map_err(|_| invalid("seconds are not numeric", text))?;

    Ok(total * 60.0 + seconds)
}

/// Format seconds as a timestamp.
///
/// Hours are emitted whenever the value reaches one hour, regardless of
/// `include_hours`.
pub fn format_timestamp(
    seconds: f64,
    include_hours: bool,
    separator: FractionSeparator,
) -> Result<String, TranscriptError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TranscriptError::InvalidTimeFormat(format!(
            "seconds must be non-negative, got {}",
            seconds
        )));
    }
    if seconds > MAX_SECONDS {
        return Err(TranscriptError::InvalidTimeFormat(format!(
            "seconds out of range, got {}",
            seconds
        )));
    }

    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    let sep = separator.as_char();

    if include_hours || hours > 0 {
        Ok(format!(
            "{:02}:{:02}:{:02}{}{:03}",
            hours, minutes, secs, sep, millis
        ))
    } else {
        Ok(format!("{:02}:{:02}{}{:03}", minutes, secs, sep, millis))
    }
}

/// Round a time value to millisecond precision
pub fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

fn is_digits(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

fn invalid(reason: &str, text: &str) -> TranscriptError {
    TranscriptError::InvalidTimeFormat(format!("{}: {:?}", reason, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_parse_all_forms() {
        assert!(close(parse_timestamp("01:23:45.678").unwrap(), 5025.678));
        assert!(close(parse_timestamp("23:45.678").unwrap(), 1425.678));
        assert!(close(parse_timestamp("45.678").unwrap(), 45.678));
        assert!(close(parse_timestamp("7").unwrap(), 7.0));
        assert!(close(parse_timestamp(" 0:00:01.5 ").unwrap(), 1.5));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_timestamp(""),
            Err(TranscriptError::InvalidTimeFormat(_))
        ));
        assert!(parse_timestamp("   ").is_err());
        assert!(parse_timestamp("1:2:3:4").is_err());
        assert!(parse_timestamp("aa:10.000").is_err());
        assert!(parse_timestamp("00:bb").is_err());
        assert!(parse_timestamp("00:00:inf").is_err());
        assert!(parse_timestamp("00:00:-1").is_err());
    }

    #[test]
    fn test_parse_rejects_signs_and_exponents() {
        assert!(parse_timestamp("+5").is_err());
        assert!(parse_timestamp("1e3").is_err());
        assert!(parse_timestamp("00:+1:05").is_err());
        assert!(parse_timestamp("1.").is_err());
        assert!(parse_timestamp(".5").is_err());
        assert!(parse_timestamp("1.2.3").is_err());
        assert!(parse_timestamp("00: 01").is_err());
    }

    #[test]
    fn test_format_with_and_without_hours() {
        assert_eq!(
            format_timestamp(5025.678, true, FractionSeparator::Dot).unwrap(),
            "01:23:45.678"
        );
        assert_eq!(
            format_timestamp(1425.678, false, FractionSeparator::Dot).unwrap(),
            "23:45.678"
        );
        assert_eq!(
            format_timestamp(1.5, true, FractionSeparator::Comma).unwrap(),
            "00:00:01,500"
        );
    }

    #[test]
    fn test_hours_override_flag() {
        assert_eq!(
            format_timestamp(3600.0, false, FractionSeparator::Dot).unwrap(),
            "01:00:00.000"
        );
    }

    #[test]
    fn test_format_carries_rounding_into_next_unit() {
        assert_eq!(
            format_timestamp(59.9996, false, FractionSeparator::Dot).unwrap(),
            "01:00.000"
        );
    }

    #[test]
    fn test_format_rejects_negative() {
        assert!(matches!(
            format_timestamp(-0.5, true, FractionSeparator::Dot),
            Err(TranscriptError::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn test_format_rejects_out_of_range() {
        assert!(matches!(
            format_timestamp(1e300, true, FractionSeparator::Dot),
            Err(TranscriptError::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn test_round_millis() {
        assert_eq!(round_millis(1.23456), 1.235);
        assert_eq!(round_millis(0.0), 0.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trip_within_a_millisecond(ms in 0u64..360_000_000, hours in any::<bool>(), comma in any::<bool>()) {
                let seconds = ms as f64 / 1000.0;
                let separator = if comma { FractionSeparator::Comma } else { FractionSeparator::Dot };
                let text = format_timestamp(seconds, hours, separator).unwrap();
                let parsed = parse_timestamp(&text.replace(',', ".")).unwrap();
                prop_assert!((parsed - seconds).abs() < 0.001);
            }

            #[test]
            fn reparse_is_stable(h in 0u64..100, m in 0u64..60, s in 0u64..60, frac in 0u64..1000) {
                let input = format!("{:02}:{:02}:{:02}.{:03}", h, m, s, frac);
                let first = parse_timestamp(&input).unwrap();
                let text = format_timestamp(first, true, FractionSeparator::Dot).unwrap();
                let second = parse_timestamp(&text).unwrap();
                prop_assert!((first - second).abs() < 0.001);
            }
        }
    }
}
