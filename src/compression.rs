//! `##DZ` Kompression (MDF 4.10+).
//!
//! Ein DZ-Block ersetzt einen DT-Block und enthaelt dessen Daten
//! zlib-komprimiert (RFC 1950, flate2 crate). Bei `zip_type = 1` werden
//! die Records vor der Kompression transponiert: aus `n` Records zu je
//! `m` Bytes wird eine Spalten-Matrix, sodass gleiche Bytepositionen
//! benachbart liegen. Ein Rest, der keine volle Zeile ergibt, bleibt
//! untransponiert am Ende.
//!
//! ```text
//! records:    a0 a1 a2 | b0 b1 b2          (m = 3)
//! transposed: a0 b0 | a1 b1 | a2 b2
//! ```

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::{Error, Result};

/// `dz_zip_type` of a `##DZ` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Plain `##DT` block, no compression.
    #[default]
    None,
    /// `##DZ` with `zip_type = 0`.
    Deflate,
    /// `##DZ` with `zip_type = 1`, transposed by record size.
    TransposedDeflate,
}

impl Compression {
    /// Raw `dz_zip_type`, `None` for uncompressed storage.
    pub fn zip_type(self) -> Option<u8> {
        match self {
            Self::None => None,
            Self::Deflate => Some(0),
            Self::TransposedDeflate => Some(1),
        }
    }

    pub fn from_zip_type(zip_type: u8) -> Result<Self> {
        match zip_type {
            0 => Ok(Self::Deflate),
            1 => Ok(Self::TransposedDeflate),
            other => Err(Error::DecompressionError(format!("unknown zip type {other}"))),
        }
    }

    /// Name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Deflate => "deflate",
            Self::TransposedDeflate => "transposed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "deflate" => Some(Self::Deflate),
            "transposed" => Some(Self::TransposedDeflate),
            _ => None,
        }
    }
}

/// Komprimiert Daten im zlib-Format.
pub fn zlib_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 64), flate2::Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::CompressionError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| Error::CompressionError(e.to_string()))
}

/// Dekomprimiert zlib-Daten und prueft die erwartete Laenge.
pub fn zlib_decompress(data: &[u8], expected_len: u64) -> Result<Vec<u8>> {
    let capacity = usize::try_from(expected_len)
        .map_err(|_| Error::DecompressionError(format!("length {expected_len} too large")))?;
    // Reservierung nach Eingabegroesse, nicht nach deklarierter Laenge
    let mut result = Vec::with_capacity(capacity.min(data.len().saturating_mul(8)));
    // Hoechstens `expected_len + 1` Bytes inflaten.
    ZlibDecoder::new(data)
        .take(expected_len.saturating_add(1))
        .read_to_end(&mut result)
        .map_err(|e| Error::DecompressionError(e.to_string()))?;
    if result.len() as u64 != expected_len {
        return Err(Error::DecompressionError(format!(
            "inflated {} bytes, block declares {expected_len}",
            result.len()
        )));
    }
    Ok(result)
}

/// Transponiert volle Zeilen zu je `columns` Bytes; der Rest bleibt am Ende.
pub fn transpose(data: &[u8], columns: usize) -> Vec<u8> {
    if columns <= 1 || data.len() < columns {
        return data.to_vec();
    }
    let rows = data.len() / columns;
    let body = rows * columns;
    let mut out = Vec::with_capacity(data.len());
    for col in 0..columns {
        out.extend((0..rows).map(|row| data[row * columns + col]));
    }
    out.extend_from_slice(&data[body..]);
    out
}

/// Inverse of [`transpose`] for the same `columns`.
pub fn untranspose(data: &[u8], columns: usize) -> Vec<u8> {
    if columns <= 1 || data.len() < columns {
        return data.to_vec();
    }
    let rows = data.len() / columns;
    let body = rows * columns;
    let mut out = vec![0u8; data.len()];
    for col in 0..columns {
        for row in 0..rows {
            out[row * columns + col] = data[col * rows + row];
        }
    }
    out[body..].copy_from_slice(&data[body..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_declared_length_rejected() {
        let packed = zlib_compress(b"abc").unwrap();
        assert!(matches!(
            zlib_decompress(&packed, u64::from(u32::MAX)),
            Err(Error::DecompressionError(_))
        ));
    }

    #[test]
    fn zlib_round_trip() {
        let data: Vec<u8> = (0..1000u32).flat_map(|i| i.to_le_bytes()).collect();
        let packed = zlib_compress(&data).unwrap();
        assert!(packed.len() < data.len());
        // zlib header: CMF 0x78
        assert_eq!(packed[0], 0x78);
        assert_eq!(zlib_decompress(&packed, data.len() as u64).unwrap(), data);
    }

    #[test]
    fn zlib_length_mismatch_is_error() {
        let packed = zlib_compress(b"abcdef").unwrap();
        assert!(matches!(
            zlib_decompress(&packed, 5),
            Err(Error::DecompressionError(_))
        ));
        assert!(matches!(
            zlib_decompress(&packed, 7),
            Err(Error::DecompressionError(_))
        ));
    }

    #[test]
    fn zlib_garbage_is_error() {
        assert!(zlib_decompress(&[0xde, 0xad, 0xbe, 0xef], 4).is_err());
    }

    #[test]
    fn transpose_matrix_with_remainder() {
        let data = [1, 2, 3, 4, 5, 6, 7];
        let t = transpose(&data, 3);
        assert_eq!(t, vec![1, 4, 2, 5, 3, 6, 7]);
        assert_eq!(untranspose(&t, 3), data);
    }

    #[test]
    fn transpose_degenerate_is_identity() {
        assert_eq!(transpose(&[1, 2], 3), vec![1, 2]);
        assert_eq!(transpose(&[1, 2, 3], 1), vec![1, 2, 3]);
        assert_eq!(untranspose(&[9], 0), vec![9]);
    }

    #[test]
    fn names_and_zip_types() {
        for c in [Compression::None, Compression::Deflate, Compression::TransposedDeflate] {
            assert_eq!(Compression::from_name(c.name()), Some(c));
        }
        assert_eq!(Compression::from_zip_type(1).unwrap(), Compression::TransposedDeflate);
        assert!(Compression::from_zip_type(2).is_err());
        assert_eq!(Compression::None.zip_type(), None);
    }
}
