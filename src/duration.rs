//! Free-form duration parsing and the formatters used by the screens.
//!
//! Accepted input, tried in order:
//!
//! | Form            | Example          | Minutes |
//! |-----------------|------------------|---------|
//! | bare integer    | `90`             | 90      |
//! | `H:MM`/`HH:MM`  | `1:20`, `00:45`  | 80, 45  |
//! | unit string     | `1h30m`, `2h`    | 90, 120 |
//!
//! Unit strings accept `h`, `m` and `s` components with optional decimal
//! fractions; the total is floored to whole minutes.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("duration must be positive")]
    NonPositive,

    #[error("invalid duration format: {0}")]
    InvalidFormat(String),
}

/// Parse a duration into whole minutes.
pub fn parse_minutes(input: &str) -> Result<u32, DurationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DurationError::Empty);
    }

    if let Ok(value) = input.parse::<i64>() {
        if value <= 0 {
            return Err(DurationError::NonPositive);
        }
        return u32::try_from(value).map_err(|_| DurationError::InvalidFormat(input.to_string()));
    }

    if let Some(total) = parse_clock(input) {
        if total == 0 {
            return Err(DurationError::NonPositive);
        }
        return Ok(total);
    }

    if !input.contains(['h', 'm', 's']) {
        return Err(DurationError::InvalidFormat(input.to_string()));
    }

    let seconds =
        parse_units(input).ok_or_else(|| DurationError::InvalidFormat(input.to_string()))?;
    let minutes = (seconds / 60.0).floor();
    if minutes < 1.0 {
        return Err(DurationError::NonPositive);
    }
    if minutes > f64::from(u32::MAX) {
        return Err(DurationError::InvalidFormat(input.to_string()));
    }
    Ok(minutes as u32)
}

/// `H:MM` / `HH:MM` with one or two hour digits and exactly two minute digits.
fn parse_clock(input: &str) -> Option<u32> {
    let (hours, mins) = input.split_once(':')?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !(1..=2).contains(&hours.len()) || mins.len() != 2 {
        return None;
    }
    if !all_digits(hours) || !all_digits(mins) {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let mins: u32 = mins.parse().ok()?;
    Some(hours * 60 + mins)
}

/// Sum of `<number><unit>` components in seconds. A leading sign applies to
/// the whole string; returns `None` on any malformed component.
fn parse_units(input: &str) -> Option<f64> {
    let (sign, mut rest) = match input.as_bytes().first()? {
        b'-' => (-1.0, &input[1..]),
        b'+' => (1.0, &input[1..]),
        _ => (1.0, input),
    };
    if rest.is_empty() {
        return None;
    }

    let mut total = 0.0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_len];
        if number.is_empty() || number == "." {
            return None;
        }
        let value: f64 = number.parse().ok()?;
        rest = &rest[number_len..];

        let unit = rest.chars().next()?;
        let scale = match unit {
            'h' => 3600.0,
            'm' => 60.0,
            's' => 1.0,
            _ => return None,
        };
        rest = &rest[unit.len_utf8()..];
        total += value * scale;
    }

    Some(sign * total)
}

/// Format minutes compactly: `45m`, `2h`, `1h30m`.
pub fn format_minutes(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h{rest}m")
    }
}

/// Format a remaining-time countdown as `HH:MM:SS`, clamped at zero.
pub fn format_countdown(seconds: i64) -> String {
    let total = seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
