//! Version timestamp codec
//!
//! File versions are UTC timestamps encoded as fixed-width strings
//! (`2023-01-01T000000.000000Z`). The encoding sorts byte-lexicographically
//! in chronological order, so "latest version" is a plain string max over a
//! key listing. Sub-second precision is fixed at six digits; timestamps are
//! truncated to microseconds at construction so encode/parse round-trips
//! exactly.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Canonical output format. The fractional field is always six digits.
const ENCODE_FORMAT: &str = "%Y-%m-%dT%H%M%S%.6fZ";

/// Accepted input grammar. `%.f` takes an optional dot plus 1-9 digits, so
/// shorter or longer fractions parse here and are caught by the
/// normalization check.
const PARSE_FORMAT: &str = "%Y-%m-%dT%H%M%S%.fZ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("Invalid version format: {0:?}")]
    InvalidFormat(String),

    #[error("Version {given:?} is not in canonical form (expected {canonical:?})")]
    NotNormalized { given: String, canonical: String },
}

/// A registered file version: a microsecond-precision UTC instant.
///
/// Ordering on `Version` values matches lexicographic ordering on their
/// encoded strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(DateTime<Utc>);

impl Version {
    /// Current time, truncated to codec precision.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Build a version from an arbitrary instant, truncating to microseconds.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let nanos = at.nanosecond();
        Version(at.with_nanosecond(nanos - nanos % 1_000).unwrap_or(at))
    }

    /// The instant this version encodes.
    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Canonical encoded form.
    pub fn encode(&self) -> String {
        self.0.format(ENCODE_FORMAT).to_string()
    }
}

impl FromStr for Version {
    type Err = VersionError;

    /// Parse a candidate version string, rejecting non-canonical spellings.
    ///
    /// A candidate that parses as a timestamp but does not re-encode to
    /// exactly itself (missing or short fractional field, overlong
    /// fraction, unpadded year) is `NotNormalized`; anything unparseable is
    /// `InvalidFormat`.
    fn from_str(candidate: &str) -> Result<Self, Self::Err> {
        let parsed = NaiveDateTime::parse_from_str(candidate, PARSE_FORMAT)
            .map_err(|_| VersionError::InvalidFormat(candidate.to_string()))?;
        let version = Version::from_datetime(parsed.and_utc());
        let canonical = version.encode();
        if canonical != candidate {
            return Err(VersionError::NotNormalized {
                given: candidate.to_string(),
                canonical,
            });
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> String {
        version.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn version(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_encode_canonical_form() {
        let at = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Version::from_datetime(at).encode(),
            "2023-01-01T000000.000000Z"
        );
    }

    #[test]
    fn test_roundtrip_exact() {
        let at = Utc
            .with_ymd_and_hms(2021, 6, 30, 23, 59, 59)
            .unwrap()
            .with_nanosecond(123_456_000)
            .unwrap();
        let encoded = Version::from_datetime(at).encode();
        assert_eq!(encoded, "2021-06-30T235959.123456Z");
        assert_eq!(version(&encoded).datetime(), at);
    }

    #[test]
    fn test_from_datetime_truncates_to_micros() {
        let at = Utc
            .with_ymd_and_hms(2021, 6, 30, 23, 59, 59)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        let v = Version::from_datetime(at);
        assert_eq!(v.encode(), "2021-06-30T235959.123456Z");
        assert_eq!(v.datetime().nanosecond(), 123_456_000);
    }

    #[test]
    fn test_now_roundtrips() {
        let now = Version::now();
        assert_eq!(version(&now.encode()), now);
    }

    #[test]
    fn test_ordering_matches_lexicographic() {
        let earlier = [
            "2022-12-31T235959.999999Z",
            "2023-01-01T000000.000000Z",
            "2023-01-01T000000.000001Z",
            "2023-01-01T000100.000000Z",
            "2023-01-02T000000.000000Z",
        ];
        for pair in earlier.windows(2) {
            assert!(version(pair[0]) < version(pair[1]));
            assert!(pair[0] < pair[1], "strings must sort the same way");
        }
    }

    #[test]
    fn test_rejects_unparseable() {
        for bad in ["", "ABCD", "2023-01-01", "2023-01-01 000000.000000Z", "2023-02-30T000000.000000Z"] {
            assert!(
                matches!(bad.parse::<Version>(), Err(VersionError::InvalidFormat(_))),
                "expected InvalidFormat for {bad:?}"
            );
        }
    }

    #[test]
    fn test_rejects_non_canonical() {
        for bad in [
            "2023-01-01T000000Z",
            "2023-01-01T000000.0Z",
            "2023-01-01T000000.123Z",
            "2023-01-01T000000.123456789Z",
        ] {
            assert!(
                matches!(bad.parse::<Version>(), Err(VersionError::NotNormalized { .. })),
                "expected NotNormalized for {bad:?}"
            );
        }
    }

    #[test]
    fn test_serde_via_string() {
        let v = version("2023-01-01T000000.000000Z");
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"2023-01-01T000000.000000Z\"");
        assert_eq!(serde_json::from_str::<Version>(&json).unwrap(), v);
        assert!(serde_json::from_str::<Version>("\"2023-01-01T000000Z\"").is_err());
    }
}
