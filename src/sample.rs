//! Typed sample buffers.
//!
//! A [`Samples`] buffer keeps every value in its native Rust type so no
//! boundary value passes through a wider or lossy intermediate on its way
//! to or from the record bytes.

use std::fmt;

use crate::kind::PrimitiveKind;
use crate::{Error, Result};

/// One channel's samples in the channel's native type.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// A single sample, tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Samples {
    /// Empty buffer for `kind` with room for `capacity` samples.
    pub fn with_capacity(kind: PrimitiveKind, capacity: usize) -> Self {
        match kind {
            PrimitiveKind::I8 => Self::I8(Vec::with_capacity(capacity)),
            PrimitiveKind::I16 => Self::I16(Vec::with_capacity(capacity)),
            PrimitiveKind::I32 => Self::I32(Vec::with_capacity(capacity)),
            PrimitiveKind::I64 => Self::I64(Vec::with_capacity(capacity)),
            PrimitiveKind::U8 => Self::U8(Vec::with_capacity(capacity)),
            PrimitiveKind::U16 => Self::U16(Vec::with_capacity(capacity)),
            PrimitiveKind::U32 => Self::U32(Vec::with_capacity(capacity)),
            PrimitiveKind::U64 => Self::U64(Vec::with_capacity(capacity)),
            PrimitiveKind::F32 => Self::F32(Vec::with_capacity(capacity)),
            PrimitiveKind::F64 => Self::F64(Vec::with_capacity(capacity)),
        }
    }

    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::I8(_) => PrimitiveKind::I8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::U8(_) => PrimitiveKind::U8,
            Self::U16(_) => PrimitiveKind::U16,
            Self::U32(_) => PrimitiveKind::U32,
            Self::U64(_) => PrimitiveKind::U64,
            Self::F32(_) => PrimitiveKind::F32,
            Self::F64(_) => PrimitiveKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::I8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        Some(match self {
            Self::I8(v) => Value::I8(*v.get(index)?),
            Self::I16(v) => Value::I16(*v.get(index)?),
            Self::I32(v) => Value::I32(*v.get(index)?),
            Self::I64(v) => Value::I64(*v.get(index)?),
            Self::U8(v) => Value::U8(*v.get(index)?),
            Self::U16(v) => Value::U16(*v.get(index)?),
            Self::U32(v) => Value::U32(*v.get(index)?),
            Self::U64(v) => Value::U64(*v.get(index)?),
            Self::F32(v) => Value::F32(*v.get(index)?),
            Self::F64(v) => Value::F64(*v.get(index)?),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Copies sample `index` little-endian into `dst`.
    ///
    /// `dst` must be exactly as long as the kind's byte size.
    pub fn encode_into(&self, index: usize, dst: &mut [u8]) -> Result<()> {
        let value = self.get(index).ok_or(Error::LengthMismatch {
            channel: self.kind().code().to_string(),
            expected: index + 1,
            found: self.len(),
        })?;
        value.encode_into(dst);
        Ok(())
    }

    /// Appends one sample decoded from little-endian `src`.
    pub fn push_le(&mut self, src: &[u8]) -> Result<()> {
        let short = || Error::PrematureEndOfData { offset: src.len() as u64 };
        match self {
            Self::I8(v) => v.push(i8::from_le_bytes(src.try_into().map_err(|_| short())?)),
            Self::I16(v) => v.push(i16::from_le_bytes(src.try_into().map_err(|_| short())?)),
            Self::I32(v) => v.push(i32::from_le_bytes(src.try_into().map_err(|_| short())?)),
            Self::I64(v) => v.push(i64::from_le_bytes(src.try_into().map_err(|_| short())?)),
            Self::U8(v) => v.push(u8::from_le_bytes(src.try_into().map_err(|_| short())?)),
            Self::U16(v) => v.push(u16::from_le_bytes(src.try_into().map_err(|_| short())?)),
            Self::U32(v) => v.push(u32::from_le_bytes(src.try_into().map_err(|_| short())?)),
            Self::U64(v) => v.push(u64::from_le_bytes(src.try_into().map_err(|_| short())?)),
            Self::F32(v) => v.push(f32::from_le_bytes(src.try_into().map_err(|_| short())?)),
            Self::F64(v) => v.push(f64::from_le_bytes(src.try_into().map_err(|_| short())?)),
        }
        Ok(())
    }
}

impl Value {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::I8(_) => PrimitiveKind::I8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::U8(_) => PrimitiveKind::U8,
            Self::U16(_) => PrimitiveKind::U16,
            Self::U32(_) => PrimitiveKind::U32,
            Self::U64(_) => PrimitiveKind::U64,
            Self::F32(_) => PrimitiveKind::F32,
            Self::F64(_) => PrimitiveKind::F64,
        }
    }

    /// Schreibt den Wert little-endian nach `dst` (Laenge = Byte-Breite der Kind).
    ///
    /// # Panics
    ///
    /// Panics if `dst` has the wrong length.
    pub fn encode_into(&self, dst: &mut [u8]) {
        match self {
            Self::I8(x) => dst.copy_from_slice(&x.to_le_bytes()),
            Self::I16(x) => dst.copy_from_slice(&x.to_le_bytes()),
            Self::I32(x) => dst.copy_from_slice(&x.to_le_bytes()),
            Self::I64(x) => dst.copy_from_slice(&x.to_le_bytes()),
            Self::U8(x) => dst.copy_from_slice(&x.to_le_bytes()),
            Self::U16(x) => dst.copy_from_slice(&x.to_le_bytes()),
            Self::U32(x) => dst.copy_from_slice(&x.to_le_bytes()),
            Self::U64(x) => dst.copy_from_slice(&x.to_le_bytes()),
            Self::F32(x) => dst.copy_from_slice(&x.to_le_bytes()),
            Self::F64(x) => dst.copy_from_slice(&x.to_le_bytes()),
        }
    }

    pub fn is_infinite(&self) -> bool {
        match self {
            Self::F32(x) => x.is_infinite(),
            Self::F64(x) => x.is_infinite(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(x) => write!(f, "{x}"),
            Self::I16(x) => write!(f, "{x}"),
            Self::I32(x) => write!(f, "{x}"),
            Self::I64(x) => write!(f, "{x}"),
            Self::U8(x) => write!(f, "{x}"),
            Self::U16(x) => write!(f, "{x}"),
            Self::U32(x) => write!(f, "{x}"),
            Self::U64(x) => write!(f, "{x}"),
            Self::F32(x) => write!(f, "{x}"),
            Self::F64(x) => write!(f, "{x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_capacity_has_kind_and_is_empty() {
        for kind in PrimitiveKind::ALL {
            let s = Samples::with_capacity(kind, 3);
            assert_eq!(s.kind(), kind);
            assert!(s.is_empty());
        }
    }

    #[test]
    fn encode_then_push_keeps_extremes() {
        let src = Samples::I64(vec![0, i64::MAX, i64::MIN]);
        let mut dst = Samples::with_capacity(PrimitiveKind::I64, 3);
        let mut buf = [0u8; 8];
        for i in 0..src.len() {
            src.encode_into(i, &mut buf).unwrap();
            dst.push_le(&buf).unwrap();
        }
        assert_eq!(src, dst);
    }

    #[test]
    fn encode_into_out_of_range_is_error() {
        let s = Samples::U8(vec![1]);
        let mut buf = [0u8; 1];
        assert!(matches!(
            s.encode_into(1, &mut buf),
            Err(Error::LengthMismatch { found: 1, .. })
        ));
    }

    #[test]
    fn push_le_rejects_wrong_width() {
        let mut s = Samples::with_capacity(PrimitiveKind::U32, 1);
        assert!(s.push_le(&[1, 2]).is_err());
        assert!(s.is_empty());
    }

    #[test]
    fn value_kind_and_infinity() {
        let s = Samples::F32(vec![0.0, f32::MAX, f32::INFINITY]);
        let values: Vec<_> = s.iter().collect();
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|v| v.kind() == PrimitiveKind::F32));
        assert!(!values[1].is_infinite());
        assert!(values[2].is_infinite());
    }

    #[test]
    fn u64_max_little_endian() {
        let mut buf = [0u8; 8];
        Value::U64(u64::MAX).encode_into(&mut buf);
        assert_eq!(buf, [0xFF; 8]);
        Value::I64(i64::MIN).encode_into(&mut buf);
        assert_eq!(buf, [0, 0, 0, 0, 0, 0, 0, 0x80]);
    }
}
