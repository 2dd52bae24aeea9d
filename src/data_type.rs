//! Channel data types (`cn_data_type`) and the explicit wire encoding of a channel.
//!
//! Every channel carries an [`Encoding`] (data type plus bit count). The
//! writer takes it from [`PrimitiveKind::encoding`](crate::kind::PrimitiveKind::encoding),
//! the reader maps it back to pick the decoder.

use crate::{Error, Result};

/// `cn_data_type` values of an MDF4 `##CN` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelDataType {
    UnsignedLe = 0,
    UnsignedBe = 1,
    SignedLe = 2,
    SignedBe = 3,
    FloatLe = 4,
    FloatBe = 5,
    StringLatin1 = 6,
    StringUtf8 = 7,
    StringUtf16Le = 8,
    StringUtf16Be = 9,
    ByteArray = 10,
    MimeSample = 11,
    MimeStream = 12,
    CanOpenDate = 13,
    CanOpenTime = 14,
    ComplexLe = 15,
    ComplexBe = 16,
}

impl ChannelDataType {
    /// Parst den rohen `cn_data_type` Wert.
    pub fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::UnsignedLe,
            1 => Self::UnsignedBe,
            2 => Self::SignedLe,
            3 => Self::SignedBe,
            4 => Self::FloatLe,
            5 => Self::FloatBe,
            6 => Self::StringLatin1,
            7 => Self::StringUtf8,
            8 => Self::StringUtf16Le,
            9 => Self::StringUtf16Be,
            10 => Self::ByteArray,
            11 => Self::MimeSample,
            12 => Self::MimeStream,
            13 => Self::CanOpenDate,
            14 => Self::CanOpenTime,
            15 => Self::ComplexLe,
            16 => Self::ComplexBe,
            other => {
                return Err(Error::UnsupportedDataType {
                    data_type: other,
                    bit_count: 0,
                })
            }
        })
    }

    /// Raw `cn_data_type` byte.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Short lowercase label used by `inspect`.
    pub fn label(self) -> &'static str {
        match self {
            Self::UnsignedLe => "uint_le",
            Self::UnsignedBe => "uint_be",
            Self::SignedLe => "int_le",
            Self::SignedBe => "int_be",
            Self::FloatLe => "float_le",
            Self::FloatBe => "float_be",
            Self::StringLatin1 => "string_latin1",
            Self::StringUtf8 => "string_utf8",
            Self::StringUtf16Le => "string_utf16le",
            Self::StringUtf16Be => "string_utf16be",
            Self::ByteArray => "byte_array",
            Self::MimeSample => "mime_sample",
            Self::MimeStream => "mime_stream",
            Self::CanOpenDate => "canopen_date",
            Self::CanOpenTime => "canopen_time",
            Self::ComplexLe => "complex_le",
            Self::ComplexBe => "complex_be",
        }
    }
}

/// Width, signedness and float format of one channel on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Encoding {
    pub data_type: ChannelDataType,
    pub bit_count: u32,
}

impl Encoding {
    pub const fn new(data_type: ChannelDataType, bit_count: u32) -> Self {
        Self { data_type, bit_count }
    }

    /// Bytes one sample occupies in a record.
    #[inline]
    pub fn byte_size(self) -> u32 {
        self.bit_count.div_ceil(8)
    }

    /// Only byte-aligned little-endian integers and IEEE floats are in scope.
    pub fn validate(self) -> Result<Self> {
        let ok = match self.data_type {
            ChannelDataType::UnsignedLe | ChannelDataType::SignedLe => {
                matches!(self.bit_count, 8 | 16 | 32 | 64)
            }
            ChannelDataType::FloatLe => matches!(self.bit_count, 32 | 64),
            _ => false,
        };
        if ok {
            Ok(self)
        } else {
            Err(Error::UnsupportedDataType {
                data_type: self.data_type.as_u8(),
                bit_count: self.bit_count,
            })
        }
    }
}
