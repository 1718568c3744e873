use crate::error::{DslError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Declared version of the target search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u16,
    minor: u16,
}

/// Lowest supported version, inclusive.
pub const MIN_SUPPORTED: Version = Version::new(5, 0);
/// First unsupported version.
pub const MAX_UNSUPPORTED: Version = Version::new(8, 0);

impl Version {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub fn major(&self) -> u16 {
        self.major
    }

    pub fn minor(&self) -> u16 {
        self.minor
    }

    pub fn is_supported(&self) -> bool {
        *self >= MIN_SUPPORTED && *self < MAX_UNSUPPORTED
    }

    pub fn ensure_supported(self) -> Result<Self> {
        if self.is_supported() {
            Ok(self)
        } else {
            Err(DslError::InvalidVersion(self))
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::new(5, 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = DslError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let malformed = || DslError::MalformedClauseSpec(format!("invalid version '{text}'"));
        let (major, minor) = text.split_once('.').unwrap_or((text, "0"));
        // Patch levels such as `6.8.23` are accepted and ignored.
        let minor = minor.split('.').next().unwrap_or("0");
        Ok(Version::new(
            major.parse().map_err(|_| malformed())?,
            minor.parse().map_err(|_| malformed())?,
        ))
    }
}

impl TryFrom<f64> for Version {
    type Error = DslError;

    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(DslError::MalformedClauseSpec(format!("invalid version {value}")));
        }
        value.to_string().parse()
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.parse(),
            Raw::Number(number) => Version::try_from(number),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

/// A clause field that only exists from a given major version on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldGate {
    pub field: &'static str,
    pub since_major: u16,
}

impl FieldGate {
    pub const fn new(field: &'static str, since_major: u16) -> Self {
        Self { field, since_major }
    }

    pub fn admits(&self, version: Version) -> bool {
        version.major() >= self.since_major
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_range() {
        assert!(Version::new(5, 0).is_supported());
        assert!(Version::new(7, 17).is_supported());
        assert_eq!(
            Version::new(4, 9).ensure_supported(),
            Err(DslError::InvalidVersion(Version::new(4, 9)))
        );
        assert!(Version::new(8, 0).ensure_supported().is_err());
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!("6.2".parse::<Version>().unwrap(), Version::new(6, 2));
        assert_eq!("7".parse::<Version>().unwrap(), Version::new(7, 0));
        assert_eq!("6.8.23".parse::<Version>().unwrap(), Version::new(6, 8));
        assert_eq!(Version::try_from(4.9).unwrap(), Version::new(4, 9));
        assert!("seven".parse::<Version>().is_err());
    }

    #[test]
    fn test_serde_accepts_text_and_numbers() {
        let v: Version = serde_json::from_str("\"6.5\"").unwrap();
        assert_eq!(v, Version::new(6, 5));
        let v: Version = serde_json::from_str("7.1").unwrap();
        assert_eq!(v, Version::new(7, 1));
        assert_eq!(serde_json::to_string(&Version::default()).unwrap(), "\"5.1\"");
    }

    #[test]
    fn test_gate() {
        let gate = FieldGate::new("track_total_hits", 7);
        assert!(!gate.admits(Version::new(6, 8)));
        assert!(gate.admits(Version::new(7, 0)));
    }
}
