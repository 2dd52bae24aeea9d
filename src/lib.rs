//! mdf4-fixtures – Grenzwert-Fixtures fuer ASAM MDF 4.x
//!
//! Erzeugt fuer zehn primitive Kanaltypen (i8..i64, u8..u64, f32, f64)
//! je drei Grenzwerte, schreibt sie als MDF4-Datei und exportiert die
//! gelesene Datei als CSV-Orakel.
//!
//! # Beispiel
//!
//! ```
//! use mdf4_fixtures::{fixture, MdfFile, MdfWriter, FormatVersion};
//!
//! // Build + Write
//! let set = fixture::primitives().unwrap();
//! let mut writer = MdfWriter::new(FormatVersion::V4_10);
//! writer.append(&set).unwrap();
//! let bytes = writer.to_bytes().unwrap();
//!
//! // Read
//! let file = MdfFile::from_bytes(&bytes, Some(FormatVersion::V4_10)).unwrap();
//! assert_eq!(file.channels().len(), 10);
//! assert_eq!(file.channel("i8").unwrap().samples(), set.channel("i8").unwrap().samples());
//! ```

pub mod blocks;
pub mod bytestream;
pub mod compression;
pub mod data_type;
pub mod error;
pub mod export;
pub mod fixture;
pub mod header;
pub mod kind;
pub mod metadata;
mod output;
pub mod pipeline;
pub mod reader;
pub mod sample;
pub mod version;
pub mod writer;

pub use error::{Error, Result};

/// HashSet mit ahash (schneller, nicht DoS-resistent; für interne Datenstrukturen).
pub(crate) type FastHashSet<K> = hashbrown::HashSet<K, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Fixtures
pub use fixture::{FixtureSet, NamedChannel, TimeAxis};
pub use kind::PrimitiveKind;
pub use sample::{Samples, Value};

// Public API: Codec
pub use compression::Compression;
pub use data_type::{ChannelDataType, Encoding};
pub use reader::{DecodedChannel, MdfFile};
pub use version::FormatVersion;
pub use writer::MdfWriter;

// Public API: Export / Pipeline
pub use export::{export_file, write_csv, ExportFormat};
pub use pipeline::{FixtureConfig, Outputs, PipelineError, Stage};
