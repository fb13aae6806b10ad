//! API microversions
//!
//! The share service negotiates a `major.minor` microversion per session.
//! Operations whose request shape changed over time are registered against
//! inclusive [`VersionWindow`]s of these versions.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Oldest microversion any built-in operation is registered for
pub const MIN_VERSION: ApiVersion = ApiVersion::new(1, 0);

/// Newest microversion the built-in managers know about
pub const MAX_VERSION: ApiVersion = ApiVersion::new(2, 56);

/// A `major.minor` API version
///
/// Ordering is lexicographic on (major, minor), so `2.10 > 2.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::invalid_input(format!(
                "'{}' is not a valid API version, expected 'X.Y' with integer parts",
                s
            ))
        };

        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        if major.is_empty()
            || minor.is_empty()
            || !major.bytes().all(|b| b.is_ascii_digit())
            || !minor.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Anything that can report the API version negotiated for its calls
pub trait ApiVersioned {
    fn api_version(&self) -> ApiVersion;
}

impl ApiVersioned for ApiVersion {
    fn api_version(&self) -> ApiVersion {
        *self
    }
}

/// Inclusive range of API versions; a missing bound is unbounded on that side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionWindow {
    pub start: Option<ApiVersion>,
    pub end: Option<ApiVersion>,
}

impl VersionWindow {
    /// Window with no bounds at all
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Window valid from `start` onward
    pub const fn starting_at(start: ApiVersion) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Window valid from `start` through `end`, both inclusive
    pub fn between(start: ApiVersion, end: ApiVersion) -> Result<Self> {
        if start > end {
            return Err(Error::invalid_input(format!(
                "version window start {} is after its end {}",
                start, end
            )));
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    /// Parse a window from version strings, the way operations are declared
    pub fn parse(start: &str, end: Option<&str>) -> Result<Self> {
        let start: ApiVersion = start.parse()?;
        match end {
            Some(end) => Self::between(start, end.parse()?),
            None => Ok(Self::starting_at(start)),
        }
    }

    pub fn contains(&self, version: ApiVersion) -> bool {
        self.start.map_or(true, |start| start <= version)
            && self.end.map_or(true, |end| version <= end)
    }

    pub fn overlaps(&self, other: &VersionWindow) -> bool {
        // Two intervals intersect when each starts no later than the other ends
        let starts_before_other_ends = match (self.start, other.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        };
        let other_starts_before_self_ends = match (other.start, self.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

impl fmt::Display for VersionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) => write!(f, "[{}, {}]", start, end),
            (Some(start), None) => write!(f, "[{}, ..)", start),
            (None, Some(end)) => write!(f, "(.., {}]", end),
            (None, None) => write!(f, "(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ApiVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_two_component_versions() {
        assert_eq!(v("2.7"), ApiVersion::new(2, 7));
        assert_eq!(v("1.0"), MIN_VERSION);
        assert_eq!(v("2.56").to_string(), "2.56");
    }

    #[test]
    fn test_parse_rejects_malformed_versions() {
        for bad in ["", "2", "2.", ".7", "2.7.1", "a.b", "2.x", "-1.0", " 2.7", "2.+7"] {
            let err = bad.parse::<ApiVersion>().unwrap_err();
            assert!(
                matches!(err, Error::InvalidInput(_)),
                "expected InvalidInput for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_minor_versions_compare_numerically() {
        assert!(v("2.10") > v("2.9"));
        assert!(v("2.7") > v("2.6"));
        assert!(v("3.0") > v("2.99"));
        assert_eq!(v("2.07"), v("2.7"));
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let window = VersionWindow::parse("2.5", Some("2.6")).unwrap();
        assert!(!window.contains(v("2.4")));
        assert!(window.contains(v("2.5")));
        assert!(window.contains(v("2.6")));
        assert!(!window.contains(v("2.7")));
    }

    #[test]
    fn test_unbounded_sides_always_satisfied() {
        assert!(VersionWindow::starting_at(v("2.7")).contains(v("99.0")));
        assert!(VersionWindow::unbounded().contains(v("0.0")));
        let upper_only = VersionWindow {
            start: None,
            end: Some(v("2.6")),
        };
        assert!(upper_only.contains(v("0.1")));
        assert!(!upper_only.contains(v("2.7")));
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        assert!(matches!(
            VersionWindow::parse("2.7", Some("2.6")),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_overlap_detection() {
        let legacy = VersionWindow::parse("1.0", Some("2.6")).unwrap();
        let current = VersionWindow::parse("2.7", None).unwrap();
        let straddling = VersionWindow::parse("2.6", Some("2.8")).unwrap();

        assert!(!legacy.overlaps(&current));
        assert!(!current.overlaps(&legacy));
        assert!(legacy.overlaps(&straddling));
        assert!(current.overlaps(&straddling));
        assert!(VersionWindow::unbounded().overlaps(&legacy));
    }

    #[test]
    fn test_version_serializes_as_string() {
        let json = serde_json::to_string(&v("2.56")).unwrap();
        assert_eq!(json, "\"2.56\"");
        let back: ApiVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("2.56"));
    }
}
