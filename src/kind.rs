//! The closed set of primitive numeric kinds a fixture covers.
//!
//! # Beispiel
//!
//! ```
//! use mdf4_fixtures::kind::PrimitiveKind;
//! use mdf4_fixtures::data_type::ChannelDataType;
//!
//! let enc = PrimitiveKind::U16.encoding();
//! assert_eq!(enc.data_type, ChannelDataType::UnsignedLe);
//! assert_eq!(enc.bit_count, 16);
//! assert_eq!(PrimitiveKind::ALL.len(), 10);
//! ```

use crate::data_type::{ChannelDataType, Encoding};
use crate::{Error, Result};

/// Signed, unsigned and floating point kinds in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimitiveKind {
    /// All kinds in the order channels are written and exported.
    pub const ALL: [PrimitiveKind; 10] = [
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
    ];

    /// Short code used as channel name (`i8`, `u64`, `f32`, ...).
    pub fn code(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// Native width taken from the type itself, never from a literal.
    pub fn bit_count(self) -> u32 {
        match self {
            Self::I8 => i8::BITS,
            Self::I16 => i16::BITS,
            Self::I32 => i32::BITS,
            Self::I64 => i64::BITS,
            Self::U8 => u8::BITS,
            Self::U16 => u16::BITS,
            Self::U32 => u32::BITS,
            Self::U64 => u64::BITS,
            Self::F32 => 8 * std::mem::size_of::<f32>() as u32,
            Self::F64 => 8 * std::mem::size_of::<f64>() as u32,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Explicit on-disk encoding for this kind.
    pub fn encoding(self) -> Encoding {
        let data_type = if self.is_float() {
            ChannelDataType::FloatLe
        } else if self.is_signed() {
            ChannelDataType::SignedLe
        } else {
            ChannelDataType::UnsignedLe
        };
        Encoding::new(data_type, self.bit_count())
    }

    /// Maps a decoded encoding back to its kind.
    pub fn from_encoding(encoding: Encoding) -> Result<Self> {
        let kind = match (encoding.data_type, encoding.bit_count) {
            (ChannelDataType::SignedLe, 8) => Self::I8,
            (ChannelDataType::SignedLe, 16) => Self::I16,
            (ChannelDataType::SignedLe, 32) => Self::I32,
            (ChannelDataType::SignedLe, 64) => Self::I64,
            (ChannelDataType::UnsignedLe, 8) => Self::U8,
            (ChannelDataType::UnsignedLe, 16) => Self::U16,
            (ChannelDataType::UnsignedLe, 32) => Self::U32,
            (ChannelDataType::UnsignedLe, 64) => Self::U64,
            (ChannelDataType::FloatLe, 32) => Self::F32,
            (ChannelDataType::FloatLe, 64) => Self::F64,
            (data_type, bit_count) => {
                return Err(Error::UnsupportedDataType {
                    data_type: data_type.as_u8(),
                    bit_count,
                })
            }
        };
        Ok(kind)
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
