//! Version and lineage value types.
//!
//! Versions are always parsed into their numeric components before they are
//! compared, so `1.10.0` sorts after `1.9.0` regardless of how the migration
//! files happen to be named.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MigrationError;

/// A three-part `major.minor.patch` migration version.
///
/// Ordering is component-wise numeric, which the derived `Ord` gives us from
/// the field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl Version {
    /// Creates a version from its components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a version string, reporting a [`MigrationError::Format`] on failure.
    ///
    /// Exactly three groups of ASCII digits separated by dots are accepted.
    pub fn parse(input: &str) -> Result<Self, MigrationError> {
        let format_error = |reason: &str| MigrationError::Format {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() != 3 {
            return Err(format_error("expected three components like 1.4.0"));
        }

        let mut components = [0u32; 3];
        for (slot, part) in components.iter_mut().zip(parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format_error("components must be non-negative integers"));
            }
            *slot = part
                .parse()
                .map_err(|_| format_error("component does not fit in 32 bits"))?;
        }

        Ok(Self::new(components[0], components[1], components[2]))
    }

    /// File-name friendly form, e.g. `v1_4_0`.
    pub fn file_stem(&self) -> String {
        format!("v{}_{}_{}", self.major, self.minor, self.patch)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{}.{}.{}", self.major, self.minor, self.patch))
    }
}

impl FromStr for Version {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A migration lineage: an independent version sequence sharing the database
/// with other lineages.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lineage(Cow<'static, str>);

impl Lineage {
    /// The lineage of the admin subsystem (1.x.x versions).
    pub const ADMIN: Lineage = Lineage(Cow::Borrowed("admin"));

    /// The lineage of the sample subsystem (2.x.x versions).
    pub const SAMPLE: Lineage = Lineage(Cow::Borrowed("sample"));

    /// Validates and wraps a lineage tag.
    ///
    /// Tags are non-empty and made of lowercase ASCII letters, digits, `_` or `-`,
    /// since they end up in directory names and ledger rows.
    pub fn new(tag: impl Into<String>) -> Result<Self, MigrationError> {
        let tag = tag.into();
        let valid = !tag.is_empty()
            && tag
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
        if !valid {
            return Err(MigrationError::Usage(format!(
                "invalid lineage '{tag}': use lowercase letters, digits, '_' or '-'"
            )));
        }
        Ok(Self(Cow::Owned(tag)))
    }

    /// The raw tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for Lineage {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Lineage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Lineage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Lineage::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_numeric_components() {
        let v = Version::parse("1.4.0").unwrap();
        assert_eq!(v, Version::new(1, 4, 0));
        assert_eq!(v.to_string(), "1.4.0");
    }

    #[test]
    fn rejects_missing_patch_component() {
        let err = Version::parse("1.5").unwrap_err();
        assert!(matches!(err, MigrationError::Format { ref input, .. } if input == "1.5"));
    }

    #[test]
    fn rejects_non_numeric_and_signed_components() {
        for input in ["1.a.0", "-1.0.0", "1.0.0-beta", " 1.0.0", "1..0", "", "1.0.0.0", "+1.0.0"] {
            assert!(
                matches!(Version::parse(input), Err(MigrationError::Format { .. })),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn orders_numerically_not_lexically() {
        let mut versions: Vec<Version> = ["1.10.0", "1.9.0", "1.2.10", "1.2.9", "0.99.99"]
            .iter()
            .map(|v| v.parse().unwrap())
            .collect();
        versions.sort();
        let rendered: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(rendered, vec!["0.99.99", "1.2.9", "1.2.10", "1.9.0", "1.10.0"]);
    }

    #[test]
    fn display_honours_padding() {
        assert_eq!(format!("{:<7}|", Version::new(1, 0, 0)), "1.0.0  |");
    }

    #[test]
    fn file_stem_is_identifier_safe() {
        assert_eq!(Version::new(1, 10, 3).file_stem(), "v1_10_3");
    }

    #[test]
    fn version_serializes_as_string() {
        let json = serde_json::to_string(&Version::new(2, 1, 0)).unwrap();
        assert_eq!(json, "\"2.1.0\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Version::new(2, 1, 0));
    }

    #[test]
    fn lineage_validation() {
        assert_eq!(Lineage::new("admin").unwrap(), Lineage::ADMIN);
        assert_eq!(Lineage::new("sample").unwrap(), Lineage::SAMPLE);
        assert!(Lineage::new("billing-v2").is_ok());
        assert!(matches!(Lineage::new(""), Err(MigrationError::Usage(_))));
        assert!(matches!(Lineage::new("Admin"), Err(MigrationError::Usage(_))));
        assert!(matches!(Lineage::new("../etc"), Err(MigrationError::Usage(_))));
    }
}
