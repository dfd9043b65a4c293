//! Parser configuration.
//!
//! ```
//! use ical_time::{Literal, ParserConfig, Role, Zone};
//!
//! let config = ParserConfig::from_json_str(
//!     r#"{
//!         "timezone_aliases": { "Romance Standard Time": "Europe/Paris" },
//!         "local_timezone": "America/New_York"
//!     }"#,
//! )
//! .unwrap();
//! let parser = config.build().unwrap();
//!
//! let literal = Literal::new("20150910T135212").with_param("TZID", "Romance Standard Time");
//! let ti = parser.parse(&literal, Role::Start, false).unwrap();
//! assert_eq!(ti.zone().name(), "Europe/Paris");
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{IcalTimeError, Result};
use crate::instant::InstantParser;
use crate::timezone::{load_timezone, AliasTable, TimezoneResolver};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Extra `TZID` spellings and the IANA zone each one means. Consulted
    /// before the IANA lookup.
    pub timezone_aliases: BTreeMap<String, String>,

    /// Zone for floating DATE-TIME values. `None` uses the host's local zone.
    pub local_timezone: Option<String>,
}

impl ParserConfig {
    /// # Errors
    ///
    /// Returns [`IcalTimeError::InvalidConfig`] if `json` is not a valid
    /// configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| IcalTimeError::InvalidConfig(e.to_string()))
    }

    /// Build a parser from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IcalTimeError::InvalidConfig`] if an alias target or the
    /// local timezone is not a known zone.
    pub fn build(&self) -> Result<InstantParser> {
        let resolver = if self.timezone_aliases.is_empty() {
            TimezoneResolver::new()
        } else {
            TimezoneResolver::with_mapping(AliasTable::from_names(&self.timezone_aliases)?)
        };

        let parser = InstantParser::with_resolver(resolver);
        match &self.local_timezone {
            None => Ok(parser),
            Some(name) => {
                let tz = load_timezone(name).map_err(|_| {
                    IcalTimeError::InvalidConfig(format!("unknown local_timezone '{name}'"))
                })?;
                Ok(parser.with_floating_zone(tz))
            }
        }
    }
}
