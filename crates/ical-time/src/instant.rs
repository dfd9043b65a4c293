//! iCalendar DATE and DATE-TIME values.
//!
//! [`InstantParser::parse`] turns a [`Literal`] (raw value plus its
//! parameters) into a [`ParsedInstant`]. The value is read as a DATE when
//! the `VALUE=DATE` parameter is present or when it is exactly eight
//! characters long; otherwise it must be a `YYYYMMDDTHHMMSS[Z]` DATE-TIME.
//!
//! # DATE boundaries
//!
//! A DATE has no time of day, so the [`Role`] of the value and the caller's
//! all-day flag pick one, always in UTC:
//!
//! | role    | all-day | instant                                   |
//! |---------|---------|-------------------------------------------|
//! | `Start` | any     | `00:00:00.000` on the date                |
//! | `End`   | `false` | `00:00:00.000` on the date, minus 1 ms    |
//! | `End`   | `true`  | `23:59:59.999` on the date                |
//!
//! # DATE-TIME zones
//!
//! A trailing `Z` means UTC. Otherwise a non-empty `TZID` parameter is
//! resolved through the parser's [`TimezoneResolver`]; an unresolvable
//! `TZID` falls back to UTC rather than failing the parse. With neither,
//! the value is floating and is read in the host's local zone (or the
//! configured replacement, see [`InstantParser::with_floating_zone`]).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{
    DateTime, Datelike, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeDelta, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{IcalTimeError, Result};
use crate::timezone::TimezoneResolver;

const DATE_LEN: usize = 8;
const DATE_TIME_LEN: usize = 15;

/// A raw property value and its parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    pub params: Vec<(String, String)>,
}

impl Literal {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// First value of parameter `name`, compared ASCII case-insensitively.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Whether a value opens or closes a range. Only matters for DATE values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Start,
    End,
}

/// The zone a [`ParsedInstant`] was read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Utc,
    /// The host process's local zone.
    Local,
    Named(Tz),
}

impl Zone {
    pub fn name(&self) -> &'static str {
        match self {
            Zone::Utc => "UTC",
            Zone::Local => "Local",
            Zone::Named(tz) => tz.name(),
        }
    }
}

impl From<Tz> for Zone {
    fn from(tz: Tz) -> Self {
        if tz == Tz::UTC {
            Zone::Utc
        } else {
            Zone::Named(tz)
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An absolute instant together with the zone it was read in.
///
/// Field accessors answer in that zone. Equality, ordering and hashing only
/// look at the absolute instant: the same moment read in two zones compares
/// equal.
#[derive(Debug, Clone, Copy)]
pub struct ParsedInstant {
    utc: DateTime<Utc>,
    zone: Zone,
}

impl ParsedInstant {
    pub fn new(utc: DateTime<Utc>, zone: Zone) -> Self {
        Self { utc, zone }
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        self.utc
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// The instant with the offset its zone had at that moment.
    pub fn fixed_offset(&self) -> DateTime<FixedOffset> {
        match self.zone {
            Zone::Utc => self.utc.fixed_offset(),
            Zone::Local => self.utc.with_timezone(&chrono::Local).fixed_offset(),
            Zone::Named(tz) => self.utc.with_timezone(&tz).fixed_offset(),
        }
    }

    /// Wall-clock reading in the instant's zone.
    pub fn naive_local(&self) -> NaiveDateTime {
        self.fixed_offset().naive_local()
    }

    pub fn year(&self) -> i32 {
        self.naive_local().year()
    }

    pub fn month(&self) -> u32 {
        self.naive_local().month()
    }

    pub fn day(&self) -> u32 {
        self.naive_local().day()
    }

    pub fn hour(&self) -> u32 {
        self.naive_local().hour()
    }

    pub fn minute(&self) -> u32 {
        self.naive_local().minute()
    }

    pub fn second(&self) -> u32 {
        self.naive_local().second()
    }

    pub fn millisecond(&self) -> u32 {
        self.naive_local().nanosecond() / 1_000_000
    }

    /// RFC 3339 rendering with the zone's offset.
    pub fn to_rfc3339(&self) -> String {
        self.fixed_offset().to_rfc3339()
    }
}

impl PartialEq for ParsedInstant {
    fn eq(&self, other: &Self) -> bool {
        self.utc == other.utc
    }
}

impl Eq for ParsedInstant {}

impl PartialOrd for ParsedInstant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParsedInstant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.utc.cmp(&other.utc)
    }
}

impl Hash for ParsedInstant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.utc.hash(state);
    }
}

impl Serialize for ParsedInstant {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ParsedInstant", 3)?;
        state.serialize_field("utc", &self.utc.to_rfc3339())?;
        state.serialize_field("local", &self.to_rfc3339())?;
        state.serialize_field("zone", self.zone.name())?;
        state.end()
    }
}

/// Parses DATE and DATE-TIME literals.
#[derive(Debug, Clone, Default)]
pub struct InstantParser {
    resolver: TimezoneResolver,
    floating_zone: Option<Tz>,
}

impl InstantParser {
    /// A parser with no timezone mapping that reads floating values in the
    /// host's local zone.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: TimezoneResolver) -> Self {
        Self {
            resolver,
            floating_zone: None,
        }
    }

    /// Read floating DATE-TIME values in `tz` instead of the host's local zone.
    pub fn with_floating_zone(mut self, tz: Tz) -> Self {
        self.floating_zone = Some(tz);
        self
    }

    pub fn resolver(&self) -> &TimezoneResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut TimezoneResolver {
        &mut self.resolver
    }

    /// Parse `literal` into an instant.
    ///
    /// `role` and `all_day` only affect DATE values.
    ///
    /// # Errors
    ///
    /// - [`IcalTimeError::InvalidFormat`] if the value is neither
    ///   `YYYYMMDD` (for a DATE) nor `YYYYMMDDTHHMMSS[Z]`
    /// - [`IcalTimeError::OutOfRange`] if the digits name an impossible
    ///   date or time, e.g. `20150932`
    ///
    /// An unknown `TZID` is not an error; the value is read in UTC.
    ///
    /// # Examples
    ///
    /// ```
    /// use ical_time::{InstantParser, Literal, Role, Zone};
    ///
    /// let parser = InstantParser::new();
    /// let end = parser
    ///     .parse(&Literal::new("20150911").with_param("VALUE", "DATE"), Role::End, true)
    ///     .unwrap();
    /// assert_eq!(end.zone(), Zone::Utc);
    /// assert_eq!((end.day(), end.hour(), end.millisecond()), (11, 23, 999));
    /// ```
    pub fn parse(&self, literal: &Literal, role: Role, all_day: bool) -> Result<ParsedInstant> {
        let text = literal.value.as_str();
        let is_date = literal
            .param("VALUE")
            .is_some_and(|value| value.eq_ignore_ascii_case("DATE"));

        if is_date || text.len() == DATE_LEN {
            tracing::trace!(value = text, ?role, all_day, "parsing DATE value");
            let date = parse_date(text)?;
            return Ok(ParsedInstant::new(date_boundary(date, role, all_day), Zone::Utc));
        }

        let (body, zone) = if let Some(body) = text.strip_suffix('Z') {
            (body, Zone::Utc)
        } else if let Some(tzid) = literal.param("TZID").filter(|tzid| !tzid.is_empty()) {
            (text, self.zone_for_tzid(tzid))
        } else {
            (text, self.floating_zone.map_or(Zone::Local, Zone::from))
        };
        tracing::trace!(value = text, %zone, "parsing DATE-TIME value");

        let naive = parse_date_time(body, text)?;
        let utc = match zone {
            Zone::Utc => naive.and_utc(),
            Zone::Local => wall_clock_to_utc(&chrono::Local, naive),
            Zone::Named(tz) => wall_clock_to_utc(&tz, naive),
        };
        Ok(ParsedInstant::new(utc, zone))
    }

    fn zone_for_tzid(&self, tzid: &str) -> Zone {
        match self.resolver.resolve(tzid) {
            Ok(tz) => Zone::from(tz),
            Err(err) => {
                tracing::warn!(tzid, error = %err, "unresolvable TZID, reading value as UTC");
                Zone::Utc
            }
        }
    }
}

/// Parse `literal` with a default [`InstantParser`].
///
/// # Errors
///
/// See [`InstantParser::parse`].
pub fn parse_instant(literal: &Literal, role: Role, all_day: bool) -> Result<ParsedInstant> {
    InstantParser::new().parse(literal, role, all_day)
}

fn date_boundary(date: NaiveDate, role: Role, all_day: bool) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN).and_utc();
    match (role, all_day) {
        (Role::Start, _) => midnight,
        (Role::End, false) => midnight - TimeDelta::milliseconds(1),
        (Role::End, true) => midnight + TimeDelta::days(1) - TimeDelta::milliseconds(1),
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    if text.len() != DATE_LEN || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IcalTimeError::InvalidFormat(format!(
            "expected DATE as YYYYMMDD: '{text}'"
        )));
    }
    let (year, month, day) = (number(&text[0..4]), number(&text[4..6]), number(&text[6..8]));
    NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| IcalTimeError::OutOfRange(format!("no such date: '{text}'")))
}

/// Parse `body` as `YYYYMMDDTHHMMSS`. `text` is the full literal, for errors.
fn parse_date_time(body: &str, text: &str) -> Result<NaiveDateTime> {
    let bytes = body.as_bytes();
    let well_formed = bytes.len() == DATE_TIME_LEN
        && bytes[DATE_LEN] == b'T'
        && bytes
            .iter()
            .enumerate()
            .all(|(idx, b)| idx == DATE_LEN || b.is_ascii_digit());
    if !well_formed {
        return Err(IcalTimeError::InvalidFormat(format!(
            "expected DATE-TIME as YYYYMMDDTHHMMSS[Z]: '{text}'"
        )));
    }

    let date = parse_date(&body[..DATE_LEN])
        .map_err(|_| IcalTimeError::OutOfRange(format!("no such date: '{text}'")))?;
    let (hour, minute, second) = (number(&body[9..11]), number(&body[11..13]), number(&body[13..15]));
    let time = NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| IcalTimeError::OutOfRange(format!("no such time: '{text}'")))?;

    Ok(date.and_time(time))
}

/// Value of a run of ASCII digits already checked by the caller.
fn number(digits: &str) -> u32 {
    digits
        .bytes()
        .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}

/// Map a wall-clock reading in `tz` to UTC.
///
/// An ambiguous reading (clocks going back) takes the earlier instant. A
/// reading inside a gap (clocks going forward) uses the offset in force
/// before the transition, which lands it past the gap.
fn wall_clock_to_utc<T: TimeZone>(tz: &T, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let before = naive - TimeDelta::days(1);
            let offset = tz
                .offset_from_local_datetime(&before)
                .earliest()
                .map_or(0, |offset| offset.fix().local_minus_utc());
            (naive - TimeDelta::seconds(i64::from(offset))).and_utc()
        }
    }
}
