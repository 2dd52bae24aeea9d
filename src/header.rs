//! MDF4 identification block (`IDBLOCK`, the first 64 bytes of every file).
//!
//! Der ID-Block hat folgende Struktur:
//! - `id_file` (8 Bytes): `MDF     ` oder `UnFinMF ` bei unfertigen Dateien
//! - `id_vers` (8 Bytes): Version als Text, z.B. `4.10    `
//! - `id_prog` (8 Bytes): Programm-Kennung des Schreibers
//! - 4 × u16: Byte-Order, Float-Format (nur 3.x), `id_ver` numerisch, Code-Page
//! - 28 Fill-Bytes
//! - 2 × u16: Standard- und Custom-Unfinalized-Flags
//!
//! # Beispiel
//!
//! ```
//! use mdf4_fixtures::bytestream::{ByteReader, ByteWriter};
//! use mdf4_fixtures::header::{self, IdBlock};
//! use mdf4_fixtures::version::FormatVersion;
//!
//! let id = IdBlock::new(FormatVersion::V4_10);
//! let mut w = ByteWriter::new();
//! header::encode(&mut w, &id);
//! assert_eq!(w.position(), 64);
//!
//! let bytes = w.into_vec();
//! let decoded = header::decode(&mut ByteReader::new(&bytes)).unwrap();
//! assert_eq!(decoded, id);
//! ```

use crate::bytestream::{ByteReader, ByteWriter};
use crate::version::FormatVersion;
use crate::{Error, Result};

/// `id_file` of a finalized file.
pub const FILE_MAGIC: &[u8; 8] = b"MDF     ";

/// `id_file` of a file whose writer did not finalize it.
pub const UNFINISHED_FILE_MAGIC: &[u8; 8] = b"UnFinMF ";

/// Program identifier this crate writes into `id_prog`.
pub const PROGRAM_ID: &str = "mdf4fix";

/// Size of the identification block; the `##HD` block follows at this offset.
pub const ID_BLOCK_SIZE: u64 = 64;

/// Decoded identification block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdBlock {
    version: FormatVersion,
    program: String,
    unfinalized: Option<(u16, u16)>,
}

impl IdBlock {
    /// Finalized identification block for `version` written by this crate.
    pub fn new(version: FormatVersion) -> Self {
        Self {
            version,
            program: PROGRAM_ID.to_string(),
            unfinalized: None,
        }
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// `id_prog` without trailing NULs and spaces.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// True when the file starts with `UnFinMF `.
    pub fn is_unfinalized(&self) -> bool {
        self.unfinalized.is_some()
    }

    /// Standard and custom unfinalized flags, if unfinalized.
    pub fn unfinalized_flags(&self) -> Option<(u16, u16)> {
        self.unfinalized
    }
}

/// Encodiert den ID-Block (immer finalisiert, Default-Byte-Order).
pub fn encode(writer: &mut ByteWriter, id: &IdBlock) {
    match id.unfinalized {
        Some(_) => writer.write_bytes(UNFINISHED_FILE_MAGIC),
        None => writer.write_bytes(FILE_MAGIC),
    }
    writer.write_bytes(&id.version.id_bytes());

    let mut program = [0u8; 8];
    let len = id.program.len().min(8);
    program[..len].copy_from_slice(&id.program.as_bytes()[..len]);
    writer.write_bytes(&program);

    writer.write_u16(0); // default byte order (3.x only)
    writer.write_u16(0); // default floating point format (3.x only)
    writer.write_u16(id.version.as_int());
    writer.write_u16(0); // code page (3.x only)
    writer.write_zeros(28);
    let (flags, custom) = id.unfinalized.unwrap_or((0, 0));
    writer.write_u16(flags);
    writer.write_u16(custom);
}

/// Decodiert den ID-Block ab der aktuellen Position.
///
/// Rejects foreign magic, a numeric version that disagrees with the text
/// version, and non-default byte order or float format.
pub fn decode(reader: &mut ByteReader) -> Result<IdBlock> {
    let magic = reader.read_bytes(8)?;
    let finalized = if magic == FILE_MAGIC {
        true
    } else if magic == UNFINISHED_FILE_MAGIC {
        false
    } else {
        return Err(Error::InvalidMagic);
    };

    let version = FormatVersion::parse_id_bytes(reader.read_bytes(8)?)?;
    let raw_program = reader.read_bytes(8)?;
    let end = memchr::memchr(0, raw_program).unwrap_or(raw_program.len());
    let program = String::from_utf8_lossy(&raw_program[..end]).trim_end().to_string();

    let byte_order = reader.read_u16()?;
    let float_format = reader.read_u16()?;
    let version_number = reader.read_u16()?;
    let _code_page = reader.read_u16()?;
    reader.skip(28)?;
    let flags = reader.read_u16()?;
    let custom = reader.read_u16()?;

    if version_number != version.as_int() {
        return Err(Error::VersionMismatch {
            expected: version.to_string(),
            found: version_number.to_string(),
        });
    }
    if byte_order != 0 || float_format != 0 {
        return Err(Error::unsupported("non-default byte order or float format"));
    }

    Ok(IdBlock {
        version,
        program,
        unfinalized: if finalized { None } else { Some((flags, custom)) },
    })
}
