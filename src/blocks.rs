//! MDF4 block layer: generic block header plus the block types the
//! fixture codec writes and reads (`##HD`, `##FH`, `##DG`, `##CG`, `##CN`,
//! `##TX`, `##MD`, `##DT`, `##DZ`).
//!
//! Every block starts with the same 24-byte header:
//!
//! ```text
//! id[4] | reserved[4] | length u64 | link_count u64 | links[link_count] u64 | data ...
//! ```
//!
//! `length` covers header, links and data but not the alignment padding
//! in front of the next block. A link value of 0 is NIL.

use std::borrow::Cow;

use crate::bytestream::{ByteReader, ByteWriter};
use crate::compression::{self, Compression};
use crate::data_type::{ChannelDataType, Encoding};
use crate::{Error, Result};

pub const HD: &str = "##HD";
pub const FH: &str = "##FH";
pub const DG: &str = "##DG";
pub const CG: &str = "##CG";
pub const CN: &str = "##CN";
pub const TX: &str = "##TX";
pub const MD: &str = "##MD";
pub const DT: &str = "##DT";
pub const DZ: &str = "##DZ";

/// Size of the fixed part of every block header.
pub const HEADER_SIZE: u64 = 24;

/// NIL link.
pub const NIL: u64 = 0;

/// `cn_type` values.
pub mod channel_type {
    pub const FIXED_LENGTH: u8 = 0;
    pub const VLSD: u8 = 1;
    pub const MASTER: u8 = 2;
    pub const VIRTUAL_MASTER: u8 = 3;
}

/// `cn_sync_type` values.
pub mod sync_type {
    pub const NONE: u8 = 0;
    pub const TIME: u8 = 1;
}

/// `cg_flags` bits this codec refuses.
const CG_FLAG_VLSD: u16 = 1 << 0;

/// Parsed generic block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub id: [u8; 4],
    pub length: u64,
    pub links: Vec<u64>,
}

impl BlockHeader {
    /// Bytes following the link section.
    pub fn data_length(&self) -> u64 {
        self.length
            .saturating_sub(HEADER_SIZE + 8 * self.links.len() as u64)
    }

    /// Link `index`, NIL when the block has fewer links.
    pub fn link(&self, index: usize) -> u64 {
        self.links.get(index).copied().unwrap_or(NIL)
    }
}

/// Aligns the writer and emits a block header; returns the block offset.
pub fn write_header(w: &mut ByteWriter, id: &str, links: &[u64], data_length: u64) -> u64 {
    debug_assert_eq!(id.len(), 4, "block id must be 4 bytes: {id}");
    w.align();
    let offset = w.position();
    w.write_bytes(id.as_bytes());
    w.write_zeros(4);
    w.write_u64(HEADER_SIZE + 8 * links.len() as u64 + data_length);
    w.write_u64(links.len() as u64);
    for &link in links {
        w.write_u64(link);
    }
    offset
}

/// File offset of link `index` inside the block starting at `block_offset`.
#[inline]
pub fn link_position(block_offset: u64, index: usize) -> u64 {
    block_offset + HEADER_SIZE + 8 * index as u64
}

/// Seeks to `offset` and parses a header of any of the `expected` ids.
pub fn read_header_any(r: &mut ByteReader, offset: u64, expected: &[&'static str]) -> Result<BlockHeader> {
    if offset == NIL || offset >= r.len() {
        return Err(Error::InvalidLink(offset));
    }
    r.seek(offset)?;
    let id = r.read_id()?;
    if !expected.iter().any(|e| e.as_bytes() == id) {
        return Err(Error::unexpected_block(expected[0], id));
    }
    r.skip(4)?;
    let length = r.read_u64()?;
    let link_count = r.read_u64()?;
    if link_count > (r.len() / 8) || length < HEADER_SIZE + 8 * link_count {
        return Err(Error::BlockTooShort {
            block: expected[0],
            required: HEADER_SIZE + 8 * link_count.min(r.len()),
            found: length,
        });
    }
    if offset.saturating_add(length) > r.len() {
        return Err(Error::PrematureEndOfData { offset: r.len() });
    }
    let links = (0..link_count)
        .map(|_| r.read_u64())
        .collect::<Result<Vec<_>>>()?;
    Ok(BlockHeader { id, length, links })
}

/// Like [`read_header_any`] for a single id, with minimum link and data sizes.
pub fn read_header(
    r: &mut ByteReader,
    offset: u64,
    id: &'static str,
    min_links: usize,
    min_data: u64,
) -> Result<BlockHeader> {
    let header = read_header_any(r, offset, &[id])?;
    if header.links.len() < min_links {
        return Err(Error::BlockTooShort {
            block: id,
            required: min_links as u64,
            found: header.links.len() as u64,
        });
    }
    if header.data_length() < min_data {
        return Err(Error::BlockTooShort {
            block: id,
            required: min_data,
            found: header.data_length(),
        });
    }
    Ok(header)
}

// --- ##TX / ##MD ---

/// Writes a `##TX` or `##MD` block with NUL-terminated UTF-8 text.
pub fn write_text(w: &mut ByteWriter, id: &str, text: &str) -> u64 {
    let unpadded = text.len() as u64 + 1;
    let data_length = unpadded.div_ceil(8) * 8;
    let offset = write_header(w, id, &[], data_length);
    w.write_bytes(text.as_bytes());
    w.write_zeros((data_length - text.len() as u64) as usize);
    offset
}

/// Reads a `##TX` or `##MD` block, returning its id and text up to the first NUL.
pub fn read_text(r: &mut ByteReader, offset: u64) -> Result<(&'static str, String)> {
    let header = read_header_any(r, offset, &[TX, MD])?;
    let raw = r.read_bytes(header.data_length() as usize)?;
    let end = memchr::memchr(0, raw).unwrap_or(raw.len());
    let id = if header.id == *b"##TX" { TX } else { MD };
    Ok((id, String::from_utf8_lossy(&raw[..end]).into_owned()))
}

// --- ##HD ---

/// Header block; always located at file offset 64.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderBlock {
    pub first_data_group: u64,
    pub first_file_history: u64,
    pub comment: u64,
    /// Absolute start time in nanoseconds since 1970-01-01 UTC.
    pub start_time_ns: u64,
    pub tz_offset_min: i16,
    pub dst_offset_min: i16,
    pub time_flags: u8,
}

impl HeaderBlock {
    pub const LINKS: usize = 6;
    pub const DATA: u64 = 32;

    pub fn new(start_time_ns: u64) -> Self {
        Self {
            first_data_group: NIL,
            first_file_history: NIL,
            comment: NIL,
            start_time_ns,
            tz_offset_min: 0,
            dst_offset_min: 0,
            time_flags: 0,
        }
    }

    pub fn write(&self, w: &mut ByteWriter) -> u64 {
        let offset = write_header(
            w,
            HD,
            &[self.first_data_group, self.first_file_history, NIL, NIL, NIL, self.comment],
            Self::DATA,
        );
        w.write_u64(self.start_time_ns);
        w.write_i16(self.tz_offset_min);
        w.write_i16(self.dst_offset_min);
        w.write_u8(self.time_flags);
        w.write_u8(0); // time class
        w.write_u8(0); // flags
        w.write_u8(0);
        w.write_f64(0.0); // start angle
        w.write_f64(0.0); // start distance
        offset
    }

    pub fn read(r: &mut ByteReader, offset: u64) -> Result<Self> {
        let h = read_header(r, offset, HD, Self::LINKS, 24)?;
        let start_time_ns = r.read_u64()?;
        let tz_offset_min = r.read_i16()?;
        let dst_offset_min = r.read_i16()?;
        let time_flags = r.read_u8()?;
        Ok(Self {
            first_data_group: h.link(0),
            first_file_history: h.link(1),
            comment: h.link(5),
            start_time_ns,
            tz_offset_min,
            dst_offset_min,
            time_flags,
        })
    }
}

// --- ##FH ---

/// File history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHistoryBlock {
    pub next: u64,
    pub comment: u64,
    pub time_ns: u64,
}

impl FileHistoryBlock {
    pub const LINKS: usize = 2;
    pub const DATA: u64 = 16;

    pub fn write(&self, w: &mut ByteWriter) -> u64 {
        let offset = write_header(w, FH, &[self.next, self.comment], Self::DATA);
        w.write_u64(self.time_ns);
        w.write_i16(0);
        w.write_i16(0);
        w.write_u8(0);
        w.write_zeros(3);
        offset
    }

    pub fn read(r: &mut ByteReader, offset: u64) -> Result<Self> {
        let h = read_header(r, offset, FH, Self::LINKS, 8)?;
        Ok(Self {
            next: h.link(0),
            comment: h.link(1),
            time_ns: r.read_u64()?,
        })
    }
}

// --- ##DG ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataGroupBlock {
    pub next: u64,
    pub first_channel_group: u64,
    pub data: u64,
    pub comment: u64,
    pub record_id_size: u8,
}

impl DataGroupBlock {
    pub const LINKS: usize = 4;
    pub const DATA: u64 = 8;

    pub fn write(&self, w: &mut ByteWriter) -> u64 {
        let offset = write_header(
            w,
            DG,
            &[self.next, self.first_channel_group, self.data, self.comment],
            Self::DATA,
        );
        w.write_u8(self.record_id_size);
        w.write_zeros(7);
        offset
    }

    pub fn read(r: &mut ByteReader, offset: u64) -> Result<Self> {
        let h = read_header(r, offset, DG, Self::LINKS, 1)?;
        Ok(Self {
            next: h.link(0),
            first_channel_group: h.link(1),
            data: h.link(2),
            comment: h.link(3),
            record_id_size: r.read_u8()?,
        })
    }
}

// --- ##CG ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelGroupBlock {
    pub next: u64,
    pub first_channel: u64,
    pub acquisition_name: u64,
    pub comment: u64,
    pub record_id: u64,
    pub cycle_count: u64,
    pub flags: u16,
    pub data_bytes: u32,
    pub invalidation_bytes: u32,
}

impl ChannelGroupBlock {
    pub const LINKS: usize = 6;
    pub const DATA: u64 = 32;

    pub fn write(&self, w: &mut ByteWriter) -> u64 {
        let offset = write_header(
            w,
            CG,
            &[self.next, self.first_channel, self.acquisition_name, NIL, NIL, self.comment],
            Self::DATA,
        );
        w.write_u64(self.record_id);
        w.write_u64(self.cycle_count);
        w.write_u16(self.flags);
        w.write_u16(u16::from(b'.')); // path separator (UTF-16)
        w.write_zeros(4);
        w.write_u32(self.data_bytes);
        w.write_u32(self.invalidation_bytes);
        offset
    }

    pub fn read(r: &mut ByteReader, offset: u64) -> Result<Self> {
        let h = read_header(r, offset, CG, Self::LINKS, Self::DATA)?;
        let record_id = r.read_u64()?;
        let cycle_count = r.read_u64()?;
        let flags = r.read_u16()?;
        r.skip(6)?;
        let data_bytes = r.read_u32()?;
        let invalidation_bytes = r.read_u32()?;
        if flags & CG_FLAG_VLSD != 0 {
            return Err(Error::unsupported("VLSD channel groups"));
        }
        Ok(Self {
            next: h.link(0),
            first_channel: h.link(1),
            acquisition_name: h.link(2),
            comment: h.link(5),
            record_id,
            cycle_count,
            flags,
            data_bytes,
            invalidation_bytes,
        })
    }
}

// --- ##CN ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBlock {
    pub next: u64,
    pub name: u64,
    pub unit: u64,
    pub comment: u64,
    pub channel_type: u8,
    pub sync_type: u8,
    pub encoding: Encoding,
    pub bit_offset: u8,
    pub byte_offset: u32,
    pub flags: u32,
}

impl ChannelBlock {
    pub const LINKS: usize = 8;
    pub const DATA: u64 = 72;

    /// Fixed-length value channel at `byte_offset`.
    pub fn value(encoding: Encoding, byte_offset: u32) -> Self {
        Self {
            next: NIL,
            name: NIL,
            unit: NIL,
            comment: NIL,
            channel_type: channel_type::FIXED_LENGTH,
            sync_type: sync_type::NONE,
            encoding,
            bit_offset: 0,
            byte_offset,
            flags: 0,
        }
    }

    /// Master time channel (`f64` seconds) at `byte_offset`.
    pub fn master_time(byte_offset: u32) -> Self {
        Self {
            channel_type: channel_type::MASTER,
            sync_type: sync_type::TIME,
            ..Self::value(Encoding::new(ChannelDataType::FloatLe, 64), byte_offset)
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(
            self.channel_type,
            channel_type::MASTER | channel_type::VIRTUAL_MASTER
        )
    }

    pub fn write(&self, w: &mut ByteWriter) -> u64 {
        let offset = write_header(
            w,
            CN,
            &[self.next, NIL, self.name, NIL, NIL, NIL, self.unit, self.comment],
            Self::DATA,
        );
        w.write_u8(self.channel_type);
        w.write_u8(self.sync_type);
        w.write_u8(self.encoding.data_type.as_u8());
        w.write_u8(self.bit_offset);
        w.write_u32(self.byte_offset);
        w.write_u32(self.encoding.bit_count);
        w.write_u32(self.flags);
        w.write_u32(0); // invalidation bit position
        w.write_u8(0); // precision
        w.write_u8(0);
        w.write_u16(0); // attachment count
        w.write_zeros(6 * 8); // value range, limit, extended limit
        offset
    }

    pub fn read(r: &mut ByteReader, offset: u64) -> Result<Self> {
        let h = read_header(r, offset, CN, Self::LINKS, Self::DATA)?;
        let channel_type = r.read_u8()?;
        let sync_type = r.read_u8()?;
        let data_type = ChannelDataType::from_u8(r.read_u8()?)?;
        let bit_offset = r.read_u8()?;
        let byte_offset = r.read_u32()?;
        let bit_count = r.read_u32()?;
        let flags = r.read_u32()?;

        if h.link(1) != NIL {
            return Err(Error::unsupported("channel composition"));
        }
        if h.link(4) != NIL {
            return Err(Error::unsupported("channel conversion rules"));
        }
        if channel_type == channel_type::VLSD || h.link(5) != NIL {
            return Err(Error::unsupported("VLSD / signal data channels"));
        }
        if bit_offset != 0 {
            return Err(Error::unsupported("bit offsets within a byte"));
        }

        Ok(Self {
            next: h.link(0),
            name: h.link(2),
            unit: h.link(6),
            comment: h.link(7),
            channel_type,
            sync_type,
            encoding: Encoding::new(data_type, bit_count),
            bit_offset,
            byte_offset,
            flags,
        })
    }
}

// --- ##DT / ##DZ ---

/// Writes `records` as `##DT`, or as `##DZ` for compressed storage.
/// `record_size` is the transposition width.
pub fn write_data(
    w: &mut ByteWriter,
    records: &[u8],
    compression: Compression,
    record_size: u32,
) -> Result<u64> {
    let Some(zip_type) = compression.zip_type() else {
        let offset = write_header(w, DT, &[], records.len() as u64);
        w.write_bytes(records);
        return Ok(offset);
    };

    let zip_parameter = if compression == Compression::TransposedDeflate {
        record_size
    } else {
        0
    };
    let packed = match compression {
        Compression::TransposedDeflate => {
            compression::zlib_compress(&compression::transpose(records, record_size as usize))?
        }
        _ => compression::zlib_compress(records)?,
    };
    let offset = write_header(w, DZ, &[], 24 + packed.len() as u64);
    w.write_bytes(b"DT");
    w.write_u8(zip_type);
    w.write_u8(0);
    w.write_u32(zip_parameter);
    w.write_u64(records.len() as u64);
    w.write_u64(packed.len() as u64);
    w.write_bytes(&packed);
    Ok(offset)
}

/// Reads the record bytes behind a data link (`##DT` or `##DZ`).
pub fn read_data<'a>(r: &mut ByteReader<'a>, offset: u64) -> Result<Cow<'a, [u8]>> {
    if offset == NIL {
        return Ok(Cow::Borrowed(&[]));
    }
    let header = read_header_any(r, offset, &[DT, DZ, "##DL", "##HL"])?;
    match &header.id {
        b"##DT" => Ok(Cow::Borrowed(r.read_bytes(header.data_length() as usize)?)),
        b"##DZ" => {
            if header.data_length() < 24 {
                return Err(Error::BlockTooShort {
                    block: DZ,
                    required: 24,
                    found: header.data_length(),
                });
            }
            let original_type = r.read_bytes(2)?;
            if original_type != b"DT" {
                return Err(Error::unsupported(format!(
                    "##DZ wrapping ##{}",
                    String::from_utf8_lossy(original_type)
                )));
            }
            let compression = Compression::from_zip_type(r.read_u8()?)?;
            r.skip(1)?;
            let zip_parameter = r.read_u32()?;
            let original_length = r.read_u64()?;
            let packed_length = r.read_u64()?;
            if packed_length > header.data_length() - 24 {
                return Err(Error::PrematureEndOfData { offset: r.len() });
            }
            let packed = r.read_bytes(packed_length as usize)?;
            let inflated = compression::zlib_decompress(packed, original_length)?;
            Ok(Cow::Owned(match compression {
                Compression::TransposedDeflate => {
                    compression::untranspose(&inflated, zip_parameter as usize)
                }
                _ => inflated,
            }))
        }
        _ => Err(Error::unsupported("data lists (##DL / ##HL)")),
    }
}
