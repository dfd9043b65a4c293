//! # ical-time
//!
//! Parsing of iCalendar (RFC 5545) date, date-time and duration literals.
//!
//! Callers hand over the raw text of a field together with its parameters
//! (`VALUE`, `TZID`) and get back concrete instants and elapsed times. The
//! surrounding document grammar, recurrence rules and the timezone database
//! itself live elsewhere.
//!
//! ## Modules
//!
//! - [`instant`] — DATE / DATE-TIME → zoned instant, with all-day boundary normalization
//! - [`duration`] — DURATION → single signed elapsed time
//! - [`timezone`] — TZID → IANA zone, with an optional caller-supplied mapping
//! - [`config`] — Serializable parser configuration
//! - [`error`] — Error types
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (TZID fallbacks at `warn`, resolver
//! retries at `debug`, branch selection at `trace`) and never installs a
//! subscriber.

pub mod config;
pub mod duration;
pub mod error;
pub mod instant;
pub mod timezone;

pub use config::ParserConfig;
pub use duration::{
    format_duration, parse_duration, DurationLiteral, DurationParts, DurationShape,
};
pub use error::{IcalTimeError, Result};
pub use instant::{parse_instant, InstantParser, Literal, ParsedInstant, Role, Zone};
pub use timezone::{load_timezone, normalize_tzid, AliasTable, TimezoneMapping, TimezoneResolver};
