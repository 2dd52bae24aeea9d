//! Central error types for the MDF4 fixture generator.
//!
//! Block-level variants name the MDF4 block they were raised for, so a
//! failed round trip points at the offending structure.

use core::fmt;
use std::borrow::Cow;

/// All errors raised while building, writing, reading or exporting fixtures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The requested format revision is not a supported MDF 4.x version.
    UnsupportedVersion(String),
    /// The file declares a different revision than the caller expected.
    VersionMismatch {
        /// Revision the caller asked for, e.g. `4.10`.
        expected: String,
        /// Revision found in the identification block.
        found: String,
    },
    /// The file does not start with `MDF     ` or `UnFinMF `.
    InvalidMagic,
    /// A link resolved to a block of a different type.
    UnexpectedBlock {
        /// Block id that was expected, e.g. `##CN`.
        expected: &'static str,
        /// Block id found at the link target.
        found: String,
    },
    /// A block header announces fewer links or data bytes than required.
    BlockTooShort {
        block: &'static str,
        required: u64,
        found: u64,
    },
    /// The input ended in the middle of a block or record.
    PrematureEndOfData { offset: u64 },
    /// A link points outside the file.
    InvalidLink(u64),
    /// A channel data type / bit count pair this codec cannot represent.
    UnsupportedDataType { data_type: u8, bit_count: u32 },
    /// A valid MDF4 construct outside the subset this codec handles.
    UnsupportedFeature(Cow<'static, str>),
    /// Two channels in one fixture share a name.
    DuplicateChannel(String),
    /// A channel has a different sample count than the time axis.
    LengthMismatch {
        channel: String,
        expected: usize,
        found: usize,
    },
    /// The time axis is not strictly increasing.
    NonMonotonicTimeAxis { index: usize },
    /// A fixture without channels cannot be written.
    EmptyFixture,
    /// The output path exists and overwrite was not requested.
    OutputExists(String),
    /// Deflate compression of a data block failed.
    CompressionError(String),
    /// Inflating a `##DZ` block failed or produced the wrong length.
    DecompressionError(String),
    /// A `##MD` block does not hold well-formed XML.
    InvalidMetadata(String),
    /// The export format name is not known.
    UnknownExportFormat(String),
    /// An IO error while reading or writing a file.
    IoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion(v) => write!(f, "unsupported MDF format version '{v}'"),
            Self::VersionMismatch { expected, found } => {
                write!(f, "MDF version mismatch: expected {expected}, file declares {found}")
            }
            Self::InvalidMagic => write!(f, "not an MDF file: missing 'MDF     ' identification"),
            Self::UnexpectedBlock { expected, found } => {
                write!(f, "expected block {expected}, found '{found}'")
            }
            Self::BlockTooShort { block, required, found } => {
                write!(f, "{block} block too short: requires {required}, found {found}")
            }
            Self::PrematureEndOfData { offset } => {
                write!(f, "premature end of data at offset {offset:#x}")
            }
            Self::InvalidLink(link) => write!(f, "link {link:#x} points outside the file"),
            Self::UnsupportedDataType { data_type, bit_count } => {
                write!(f, "unsupported channel data type {data_type} with {bit_count} bits")
            }
            Self::UnsupportedFeature(what) => write!(f, "unsupported MDF feature: {what}"),
            Self::DuplicateChannel(name) => write!(f, "duplicate channel name '{name}'"),
            Self::LengthMismatch { channel, expected, found } => write!(
                f,
                "channel '{channel}' has {found} samples, time axis has {expected}"
            ),
            Self::NonMonotonicTimeAxis { index } => {
                write!(f, "time axis not strictly increasing at index {index}")
            }
            Self::EmptyFixture => write!(f, "fixture set contains no channels"),
            Self::OutputExists(path) => {
                write!(f, "output '{path}' exists and overwrite is disabled")
            }
            Self::CompressionError(msg) => write!(f, "deflate compression failed: {msg}"),
            Self::DecompressionError(msg) => write!(f, "##DZ decompression failed: {msg}"),
            Self::InvalidMetadata(msg) => write!(f, "invalid ##MD metadata: {msg}"),
            Self::UnknownExportFormat(name) => write!(f, "unknown export format '{name}'"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

impl Error {
    /// Erstellt einen `UnexpectedBlock` Fehler aus den rohen Id-Bytes.
    pub fn unexpected_block(expected: &'static str, found: [u8; 4]) -> Self {
        Self::UnexpectedBlock {
            expected,
            found: String::from_utf8_lossy(&found).into_owned(),
        }
    }

    /// Erstellt einen `UnsupportedFeature` Fehler mit Beschreibung.
    pub fn unsupported(what: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFeature(what.into())
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_mismatch_display() {
        let e = Error::VersionMismatch {
            expected: "4.10".into(),
            found: "4.00".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("4.10"), "{msg}");
        assert!(msg.contains("4.00"), "{msg}");
    }

    #[test]
    fn unexpected_block_lossy_id() {
        let e = Error::unexpected_block("##CN", *b"##CG");
        assert_eq!(
            e,
            Error::UnexpectedBlock {
                expected: "##CN",
                found: "##CG".into()
            }
        );
        assert!(e.to_string().contains("##CG"));
    }

    #[test]
    fn length_mismatch_display_names_channel() {
        let e = Error::LengthMismatch {
            channel: "u16".into(),
            expected: 3,
            found: 2,
        };
        let msg = e.to_string();
        assert!(msg.contains("'u16'"), "{msg}");
        assert!(msg.contains("2 samples"), "{msg}");
    }

    #[test]
    fn io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: Error = io.into();
        assert!(matches!(e, Error::IoError(ref m) if m.contains("gone")));
    }

    #[test]
    fn unsupported_feature_display() {
        let e = Error::unsupported("VLSD channels");
        assert_eq!(e.to_string(), "unsupported MDF feature: VLSD channels");
    }
}
