//! iCalendar DURATION values.
//!
//! Two shapes are accepted, tried in this order:
//!
//! - week form: `P<n>W`
//! - full form: `P[<n>Y][<n>D][T[<n>H][<n>M][<n>S]]`
//!
//! either one optionally preceded by `+` or `-`. Month components are
//! recognised only so they can be rejected with
//! [`IcalTimeError::UnsupportedComponent`] instead of a format error.
//!
//! Aggregation is calendar-agnostic: a year is 365 days, a week 7 days and a
//! day 24 hours. The parsed value is a single [`TimeDelta`]; no component
//! survives on its own.

use chrono::TimeDelta;

use crate::error::{IcalTimeError, Result};

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;
const SECS_PER_WEEK: i64 = 7 * SECS_PER_DAY;
const SECS_PER_YEAR: i64 = 365 * SECS_PER_DAY;

/// Designators allowed before `T`, in order.
const DATE_DESIGNATORS: [char; 2] = ['Y', 'D'];
/// Designators allowed after `T`, in order.
const TIME_DESIGNATORS: [char; 3] = ['H', 'M', 'S'];
/// A month before `T`, rejected wherever it sits.
const MONTH_DESIGNATOR: char = 'M';

/// Components of a full-form duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationParts {
    pub years: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

/// Which grammar a duration matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationShape {
    Weeks(u64),
    Full(DurationParts),
}

/// A parsed duration before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationLiteral {
    pub negative: bool,
    pub shape: DurationShape,
}

impl DurationLiteral {
    /// Parse `text` into its structured form.
    ///
    /// # Errors
    ///
    /// - [`IcalTimeError::UnsupportedComponent`] if a month component is present
    /// - [`IcalTimeError::InvalidFormat`] if neither shape matches
    /// - [`IcalTimeError::OutOfRange`] if a number does not fit
    pub fn parse(text: &str) -> Result<Self> {
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'+') => (false, &text[1..]),
            Some(b'-') => (true, &text[1..]),
            _ => (false, text),
        };

        let body = unsigned.strip_prefix('P').ok_or_else(|| {
            IcalTimeError::InvalidFormat(format!("duration must start with 'P': '{text}'"))
        })?;

        let shape = match parse_week_form(body, text)? {
            Some(weeks) => DurationShape::Weeks(weeks),
            None => DurationShape::Full(parse_full_form(body, text)?),
        };

        Ok(Self { negative, shape })
    }

    /// Sum the components into one signed delta.
    ///
    /// # Errors
    ///
    /// Returns [`IcalTimeError::OutOfRange`] if the total does not fit in a
    /// [`TimeDelta`].
    pub fn to_delta(&self) -> Result<TimeDelta> {
        let total = match self.shape {
            DurationShape::Weeks(weeks) => scale(weeks, SECS_PER_WEEK),
            DurationShape::Full(parts) => [
                scale(parts.years, SECS_PER_YEAR),
                scale(parts.days, SECS_PER_DAY),
                scale(parts.hours, SECS_PER_HOUR),
                scale(parts.minutes, SECS_PER_MINUTE),
                scale(parts.seconds, 1),
            ]
            .into_iter()
            .try_fold(0i64, |acc, secs| acc.checked_add(secs?)),
        };

        let delta = total
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| IcalTimeError::OutOfRange(format!("duration too large: {self:?}")))?;

        Ok(if self.negative { -delta } else { delta })
    }
}

/// Parse an iCalendar duration into a single elapsed time.
///
/// # Examples
///
/// ```
/// use ical_time::parse_duration;
///
/// let week = parse_duration("P1W").unwrap();
/// assert_eq!(week.num_hours(), 7 * 24);
///
/// assert!(parse_duration("P1M").is_err());
/// ```
///
/// # Errors
///
/// See [`DurationLiteral::parse`] and [`DurationLiteral::to_delta`].
pub fn parse_duration(text: &str) -> Result<TimeDelta> {
    DurationLiteral::parse(text)?.to_delta()
}

/// Render a delta as a canonical iCalendar duration.
///
/// Whole weeks use the week form, everything else the day/time form.
/// Sub-second precision is dropped; zero renders as `PT0S`.
pub fn format_duration(delta: TimeDelta) -> String {
    let total = delta.num_seconds().unsigned_abs();
    if total == 0 {
        return "PT0S".to_string();
    }

    let mut out = String::new();
    if delta < TimeDelta::zero() {
        out.push('-');
    }
    out.push('P');

    let week = SECS_PER_WEEK.unsigned_abs();
    if total % week == 0 {
        out.push_str(&format!("{}W", total / week));
        return out;
    }

    let day = SECS_PER_DAY.unsigned_abs();
    let days = total / day;
    let rem = total % day;
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if rem > 0 {
        out.push('T');
        let (hours, minutes, seconds) = (rem / 3600, rem % 3600 / 60, rem % 60);
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}

fn scale(count: u64, unit: i64) -> Option<i64> {
    i64::try_from(count).ok()?.checked_mul(unit)
}

/// `Some(weeks)` if `body` is `<digits>W`, `None` if it is some other shape.
fn parse_week_form(body: &str, text: &str) -> Result<Option<u64>> {
    let Some(digits) = body.strip_suffix('W') else {
        return Ok(None);
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    parse_count(digits, text).map(Some)
}

fn parse_full_form(body: &str, text: &str) -> Result<DurationParts> {
    let (date_section, time_section) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut parts = DurationParts::default();

    let date_components =
        scan_components(date_section, &DATE_DESIGNATORS, Some(MONTH_DESIGNATOR), text)?;
    for (designator, value) in date_components {
        match designator {
            'Y' => parts.years = value,
            _ => parts.days = value,
        }
    }

    if let Some(section) = time_section {
        if section.is_empty() {
            return Err(IcalTimeError::InvalidFormat(format!(
                "'T' must be followed by a time component: '{text}'"
            )));
        }
        for (designator, value) in scan_components(section, &TIME_DESIGNATORS, None, text)? {
            match designator {
                'H' => parts.hours = value,
                'M' => parts.minutes = value,
                _ => parts.seconds = value,
            }
        }
    }

    Ok(parts)
}

/// Split a section into `(designator, count)` pairs, enforcing that each
/// designator appears at most once and in the order of `designators`.
///
/// `unsupported` is reported as [`IcalTimeError::UnsupportedComponent`]
/// wherever it appears, before ordering is checked.
fn scan_components(
    section: &str,
    designators: &[char],
    unsupported: Option<char>,
    text: &str,
) -> Result<Vec<(char, u64)>> {
    let mut components = Vec::new();
    let mut next_slot = 0;
    let mut digits_start = 0;

    for (idx, ch) in section.char_indices() {
        if ch.is_ascii_digit() {
            continue;
        }

        let digits = &section[digits_start..idx];
        if digits.is_empty() {
            return Err(IcalTimeError::InvalidFormat(format!(
                "expected number before '{ch}' in '{text}'"
            )));
        }

        if unsupported == Some(ch) {
            return Err(IcalTimeError::UnsupportedComponent(format!(
                "months are not allowed in durations: '{text}'"
            )));
        }

        let slot = designators[next_slot..]
            .iter()
            .position(|d| *d == ch)
            .map(|pos| pos + next_slot)
            .ok_or_else(|| {
                IcalTimeError::InvalidFormat(format!("unexpected '{ch}' in '{text}'"))
            })?;

        components.push((ch, parse_count(digits, text)?));
        next_slot = slot + 1;
        digits_start = idx + ch.len_utf8();
    }

    if digits_start != section.len() {
        return Err(IcalTimeError::InvalidFormat(format!(
            "number without designator at end of '{text}'"
        )));
    }

    Ok(components)
}

fn parse_count(digits: &str, text: &str) -> Result<u64> {
    digits
        .parse()
        .map_err(|_| IcalTimeError::OutOfRange(format!("number too large in '{text}'")))
}
