//! TZID resolution.
//!
//! A [`TimezoneResolver`] turns the value of a `TZID` parameter into a
//! [`chrono_tz::Tz`]. Resolution is attempted in order:
//!
//! 1. the resolver's [`TimezoneMapping`], if one is installed. A mapping
//!    error is swallowed and resolution continues;
//! 2. a direct lookup in the IANA database bundled with `chrono-tz`;
//! 3. one retry after [`normalize_tzid`] repairs the casing.
//!
//! If every step fails the caller gets [`IcalTimeError::UnknownTimezone`]
//! carrying the identifier as it was given.
//!
//! # Concurrency
//!
//! Resolution takes `&self` and is safe to run from many threads at once.
//! Installing or clearing the mapping takes `&mut self`, so it cannot race
//! with in-flight lookups on the same resolver. Clones share the mapping
//! that was installed when they were made.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono_tz::Tz;

use crate::error::{IcalTimeError, Result};

/// Tokens kept lowercase by [`normalize_tzid`] (`Isle_of_Man`, `Dar_es_Salaam`).
const LOWERCASE_TOKENS: [&str; 2] = ["of", "es"];

/// A caller-supplied translation from non-IANA zone identifiers to zones.
///
/// Calendar producers emit identifiers such as `W. Europe Standard Time` or
/// vendor-prefixed ids. A mapping lets the host translate those before the
/// IANA lookup runs. Returning an error means "not mine": the resolver falls
/// through to its default strategy.
pub trait TimezoneMapping: Send + Sync {
    fn map_tzid(&self, tzid: &str) -> Result<Tz>;
}

impl<F> TimezoneMapping for F
where
    F: Fn(&str) -> Result<Tz> + Send + Sync,
{
    fn map_tzid(&self, tzid: &str) -> Result<Tz> {
        self(tzid)
    }
}

/// A static alias table: identifier → IANA zone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: BTreeMap<String, Tz>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alias. Later inserts for the same identifier replace earlier ones.
    pub fn insert(&mut self, alias: impl Into<String>, tz: Tz) -> Option<Tz> {
        self.aliases.insert(alias.into(), tz)
    }

    /// Build a table from `alias → zone name` pairs, resolving every target
    /// with [`load_timezone`].
    ///
    /// # Errors
    ///
    /// Returns [`IcalTimeError::InvalidConfig`] naming the first alias whose
    /// target is not a known zone.
    pub fn from_names<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut table = Self::new();
        for (alias, target) in pairs {
            let alias = alias.into();
            let tz = load_timezone(target.as_ref()).map_err(|_| {
                IcalTimeError::InvalidConfig(format!(
                    "alias '{alias}' points to unknown timezone '{}'",
                    target.as_ref()
                ))
            })?;
            table.insert(alias, tz);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl TimezoneMapping for AliasTable {
    fn map_tzid(&self, tzid: &str) -> Result<Tz> {
        self.aliases
            .get(tzid)
            .copied()
            .ok_or_else(|| IcalTimeError::UnknownTimezone(tzid.to_string()))
    }
}

/// Resolves `TZID` values, optionally consulting a [`TimezoneMapping`] first.
#[derive(Clone, Default)]
pub struct TimezoneResolver {
    mapping: Option<Arc<dyn TimezoneMapping>>,
}

impl fmt::Debug for TimezoneResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimezoneResolver")
            .field("has_mapping", &self.has_mapping())
            .finish()
    }
}

impl TimezoneResolver {
    /// A resolver with no mapping: equivalent to [`load_timezone`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mapping: impl TimezoneMapping + 'static) -> Self {
        Self {
            mapping: Some(Arc::new(mapping)),
        }
    }

    /// Install `mapping`, replacing any previous one.
    pub fn set_mapping(&mut self, mapping: impl TimezoneMapping + 'static) {
        self.mapping = Some(Arc::new(mapping));
    }

    pub fn clear_mapping(&mut self) {
        self.mapping = None;
    }

    pub fn has_mapping(&self) -> bool {
        self.mapping.is_some()
    }

    /// Resolve `tzid` to a zone.
    ///
    /// # Errors
    ///
    /// Returns [`IcalTimeError::UnknownTimezone`] with the original `tzid`
    /// when neither the mapping nor the default lookup recognises it.
    pub fn resolve(&self, tzid: &str) -> Result<Tz> {
        if let Some(mapping) = &self.mapping {
            match mapping.map_tzid(tzid) {
                Ok(tz) => return Ok(tz),
                Err(err) => {
                    tracing::debug!(tzid, error = %err, "timezone mapping declined, using default lookup");
                }
            }
        }
        load_timezone(tzid)
    }
}

/// Resolve `tzid` against the IANA database, retrying once with
/// [`normalize_tzid`] when the direct lookup fails.
///
/// # Errors
///
/// Returns [`IcalTimeError::UnknownTimezone`] carrying the original `tzid`.
///
/// # Examples
///
/// ```
/// use ical_time::load_timezone;
///
/// let tz = load_timezone("AfricA/Dar_Es_salaam").unwrap();
/// assert_eq!(tz.name(), "Africa/Dar_es_Salaam");
/// ```
pub fn load_timezone(tzid: &str) -> Result<Tz> {
    if let Ok(tz) = tzid.parse::<Tz>() {
        return Ok(tz);
    }

    let normalized = normalize_tzid(tzid);
    tracing::debug!(tzid, %normalized, "direct timezone lookup failed, retrying normalized");
    normalized
        .parse::<Tz>()
        .map_err(|_| IcalTimeError::UnknownTimezone(tzid.to_string()))
}

/// Repair the casing of a zone identifier.
///
/// The identifier is split on `_`. Each token is lowercased; `of` and `es`
/// stay that way, every other token is title-cased (a letter is capitalised
/// when it starts the token or follows a non-alphanumeric character such as
/// `/`). The tokens are rejoined with `_`. Only ASCII letters change case,
/// which keeps the result stable: normalizing it again returns the same
/// string.
///
/// ```
/// use ical_time::normalize_tzid;
///
/// assert_eq!(normalize_tzid("america/lOs_anGeles"), "America/Los_Angeles");
/// assert_eq!(normalize_tzid("europe/isle_OF_man"), "Europe/Isle_of_Man");
/// ```
pub fn normalize_tzid(tzid: &str) -> String {
    tzid.split('_')
        .map(|token| {
            let lower = token.to_ascii_lowercase();
            if LOWERCASE_TOKENS.contains(&lower.as_str()) {
                lower
            } else {
                title_case(&lower)
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        out.push(if at_word_start { ch.to_ascii_uppercase() } else { ch });
        at_word_start = !ch.is_alphanumeric();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── load_timezone tests ─────────────────────────────────────────────

    #[test]
    fn test_load_canonical_id() {
        let tz = load_timezone("Europe/Paris").unwrap();
        assert_eq!(tz, Tz::Europe__Paris);
    }

    #[test]
    fn test_load_repairs_casing() {
        let cases = [
            ("europe/paris", "Europe/Paris"),
            ("america/lOs_anGeles", "America/Los_Angeles"),
            ("europe/isle_OF_man", "Europe/Isle_of_Man"),
            ("AfricA/Dar_Es_salaam", "Africa/Dar_es_Salaam"),
        ];
        for (input, expected) in cases {
            let tz = load_timezone(input).unwrap();
            assert_eq!(tz.name(), expected, "input: {input}");
        }
    }

    #[test]
    fn test_load_unknown_keeps_original_id() {
        let err = load_timezone("mars/olympus_MONS").unwrap_err();
        assert_eq!(
            err,
            IcalTimeError::UnknownTimezone("mars/olympus_MONS".to_string())
        );
        assert!(err.to_string().contains("Unknown timezone"), "got: {err}");
    }

    #[test]
    fn test_load_empty_id_fails() {
        assert!(load_timezone("").is_err());
    }

    // ── normalize_tzid tests ────────────────────────────────────────────

    #[test]
    fn test_normalize_title_cases_after_slash() {
        assert_eq!(normalize_tzid("asia/tokyo"), "Asia/Tokyo");
        assert_eq!(normalize_tzid("AMERICA/NEW_YORK"), "America/New_York");
    }

    #[test]
    fn test_normalize_keeps_exception_tokens_lowercase() {
        assert_eq!(normalize_tzid("OF"), "of");
        assert_eq!(normalize_tzid("Es"), "es");
        // Only whole tokens are exceptions.
        assert_eq!(normalize_tzid("ofx_esy"), "Ofx_Esy");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["AfricA/Dar_Es_salaam", "europe/isle_OF_man", "etc/gmt+5", "x"] {
            let once = normalize_tzid(input);
            assert_eq!(normalize_tzid(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_normalize_treats_non_ascii_letters_as_word_characters() {
        assert_eq!(normalize_tzid("américa/sé_x"), "América/Sé_X");
        assert_eq!(normalize_tzid("éa/b"), "éa/B");
        // Only ASCII letters change case.
        assert_eq!(normalize_tzid("ÉA"), "Éa");
    }

    #[test]
    fn test_normalize_preserves_empty_tokens() {
        assert_eq!(normalize_tzid("a__b"), "A__B");
        assert_eq!(normalize_tzid(""), "");
    }

    // ── TimezoneResolver tests ──────────────────────────────────────────

    fn test_mapping(tzid: &str) -> Result<Tz> {
        match tzid {
            "test1" => Ok(Tz::Europe__Paris),
            "test2" => Ok(Tz::America__Los_Angeles),
            _ => Err(IcalTimeError::UnknownTimezone(tzid.to_string())),
        }
    }

    #[test]
    fn test_resolver_without_mapping_uses_default_lookup() {
        let resolver = TimezoneResolver::new();
        assert!(!resolver.has_mapping());
        assert_eq!(resolver.resolve("europe/paris").unwrap(), Tz::Europe__Paris);
        assert!(resolver.resolve("test1").is_err());
    }

    #[test]
    fn test_resolver_mapping_hit() {
        let resolver = TimezoneResolver::with_mapping(test_mapping);
        assert_eq!(resolver.resolve("test1").unwrap(), Tz::Europe__Paris);
        assert_eq!(resolver.resolve("test2").unwrap(), Tz::America__Los_Angeles);
    }

    #[test]
    fn test_resolver_mapping_miss_falls_through() {
        let resolver = TimezoneResolver::with_mapping(test_mapping);
        assert_eq!(resolver.resolve("Asia/Tokyo").unwrap(), Tz::Asia__Tokyo);
        assert_eq!(
            resolver.resolve("test3").unwrap_err(),
            IcalTimeError::UnknownTimezone("test3".to_string())
        );
    }

    #[test]
    fn test_resolver_mapping_wins_over_iana_name() {
        let resolver = TimezoneResolver::with_mapping(|_: &str| -> Result<Tz> { Ok(Tz::UTC) });
        assert_eq!(resolver.resolve("Europe/Paris").unwrap(), Tz::UTC);
    }

    #[test]
    fn test_resolvers_are_isolated() {
        let mapped = TimezoneResolver::with_mapping(test_mapping);
        let plain = TimezoneResolver::new();
        assert!(mapped.resolve("test1").is_ok());
        assert!(plain.resolve("test1").is_err());
    }

    #[test]
    fn test_resolver_set_and_clear_mapping() {
        let mut resolver = TimezoneResolver::new();
        resolver.set_mapping(test_mapping);
        assert!(resolver.has_mapping());
        assert!(resolver.resolve("test2").is_ok());

        let snapshot = resolver.clone();
        resolver.clear_mapping();
        assert!(!resolver.has_mapping());
        assert!(resolver.resolve("test2").is_err());
        // A clone keeps the mapping it was made with.
        assert!(snapshot.resolve("test2").is_ok());
    }

    // ── AliasTable tests ────────────────────────────────────────────────

    #[test]
    fn test_alias_table_from_names() {
        let table = AliasTable::from_names([
            ("W. Europe Standard Time", "Europe/Berlin"),
            ("Pacific Standard Time", "america/los_angeles"),
        ])
        .unwrap();
        assert_eq!(table.len(), 2);

        let resolver = TimezoneResolver::with_mapping(table);
        assert_eq!(
            resolver.resolve("W. Europe Standard Time").unwrap(),
            Tz::Europe__Berlin
        );
        assert_eq!(
            resolver.resolve("Pacific Standard Time").unwrap(),
            Tz::America__Los_Angeles
        );
    }

    #[test]
    fn test_alias_table_rejects_unknown_target() {
        let err = AliasTable::from_names([("Nowhere", "Atlantis/Capital")]).unwrap_err();
        assert!(matches!(err, IcalTimeError::InvalidConfig(_)));
        assert!(err.to_string().contains("Nowhere"), "got: {err}");
    }

    #[test]
    fn test_alias_table_miss_is_an_error() {
        let table = AliasTable::new();
        assert!(table.is_empty());
        assert!(table.map_tzid("Europe/Paris").is_err());
    }
}
