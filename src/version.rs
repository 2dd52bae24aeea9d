//! MDF format revision (`"4.10"` ↔ 410).
//!
//! # Beispiel
//!
//! ```
//! use mdf4_fixtures::version::FormatVersion;
//!
//! let v: FormatVersion = "4.10".parse().unwrap();
//! assert_eq!(v.as_int(), 410);
//! assert_eq!(v.to_string(), "4.10");
//! assert!("3.30".parse::<FormatVersion>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A supported MDF 4.x revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
    major: u8,
    minor: u8,
}

impl FormatVersion {
    /// 4.00, the first MDF4 revision.
    pub const V4_00: Self = Self { major: 4, minor: 0 };
    /// 4.10, the revision fixtures are written in by default.
    pub const V4_10: Self = Self { major: 4, minor: 10 };
    /// 4.11
    pub const V4_11: Self = Self { major: 4, minor: 11 };

    /// Lowest revision that knows `##DZ` blocks.
    pub const MIN_COMPRESSION: Self = Self::V4_10;

    pub fn new(major: u8, minor: u8) -> Result<Self> {
        let v = Self { major, minor };
        if major == 4 && matches!(minor, 0 | 10 | 11) {
            Ok(v)
        } else {
            Err(Error::UnsupportedVersion(v.to_string()))
        }
    }

    pub fn major(&self) -> u8 {
        self.major
    }

    pub fn minor(&self) -> u8 {
        self.minor
    }

    /// Numeric form stored in the ID block (`id_ver`).
    pub fn as_int(&self) -> u16 {
        u16::from(self.major) * 100 + u16::from(self.minor)
    }

    /// Inverse of [`as_int`](Self::as_int).
    pub fn from_int(value: u16) -> Result<Self> {
        let major = u8::try_from(value / 100)
            .map_err(|_| Error::UnsupportedVersion(value.to_string()))?;
        Self::new(major, (value % 100) as u8)
    }

    /// The 8-byte, space-padded `id_vers` field, e.g. `b"4.10    "`.
    pub fn id_bytes(&self) -> [u8; 8] {
        let mut out = [b' '; 8];
        let text = self.to_string();
        out[..text.len()].copy_from_slice(text.as_bytes());
        out
    }

    /// Parst das `id_vers` Feld (trailing Spaces/NULs werden ignoriert).
    pub fn parse_id_bytes(raw: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(raw);
        text.trim_end_matches([' ', '\0']).parse()
    }

    pub fn supports_compression(&self) -> bool {
        *self >= Self::MIN_COMPRESSION
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::V4_10
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

impl FromStr for FormatVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let unsupported = || Error::UnsupportedVersion(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(unsupported)?;
        if minor.len() != 2 || !minor.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unsupported());
        }
        let major = major.parse().map_err(|_| unsupported())?;
        let minor = minor.parse().map_err(|_| unsupported())?;
        Self::new(major, minor).map_err(|_| unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_supported() {
        assert_eq!("4.00".parse::<FormatVersion>().unwrap(), FormatVersion::V4_00);
        assert_eq!("4.10".parse::<FormatVersion>().unwrap(), FormatVersion::V4_10);
        assert_eq!(" 4.11 ".parse::<FormatVersion>().unwrap(), FormatVersion::V4_11);
    }

    #[test]
    fn parse_rejects() {
        for bad in ["4.1", "3.30", "4.20", "4", "", "a.bc", "4.1x", "4.+0", "4.-1"] {
            assert!(
                matches!(bad.parse::<FormatVersion>(), Err(Error::UnsupportedVersion(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn int_round_trip() {
        assert_eq!(FormatVersion::V4_10.as_int(), 410);
        assert_eq!(FormatVersion::from_int(411).unwrap(), FormatVersion::V4_11);
        assert_eq!(FormatVersion::from_int(400).unwrap().to_string(), "4.00");
        assert!(FormatVersion::from_int(330).is_err());
    }

    #[test]
    fn id_bytes_are_space_padded() {
        assert_eq!(&FormatVersion::V4_10.id_bytes(), b"4.10    ");
        assert_eq!(
            FormatVersion::parse_id_bytes(b"4.10    ").unwrap(),
            FormatVersion::V4_10
        );
        assert_eq!(
            FormatVersion::parse_id_bytes(b"4.11\0\0\0\0").unwrap(),
            FormatVersion::V4_11
        );
    }

    #[test]
    fn compression_needs_4_10() {
        assert!(!FormatVersion::V4_00.supports_compression());
        assert!(FormatVersion::V4_10.supports_compression());
        assert!(FormatVersion::V4_11.supports_compression());
    }
}
