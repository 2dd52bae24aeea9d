//! MDF4 write session.
//!
//! Ein [`MdfWriter`] sammelt Kanaele (alle auf einer gemeinsamen Zeitachse)
//! und serialisiert sie in eine Datengruppe mit genau einer Kanalgruppe.
//! Blockreihenfolge in der Datei:
//!
//! ```text
//! ID | HD | MD(HD) | MD(FH) | FH | TX... | CN(time) CN... | CG | DT/DZ | DG
//! ```
//!
//! Der Record beginnt mit dem Master-Kanal `time` (f64), danach folgen die
//! Kanaele in Einfuegereihenfolge ohne Luecken. Die Ausgabe haengt nur von
//! den Eingaben ab; zwei Sessions mit gleichem Inhalt erzeugen identische
//! Bytes.
//!
//! # Beispiel
//!
//! ```
//! use mdf4_fixtures::fixture;
//! use mdf4_fixtures::version::FormatVersion;
//! use mdf4_fixtures::writer::MdfWriter;
//!
//! let set = fixture::primitives().unwrap();
//! let mut writer = MdfWriter::new(FormatVersion::V4_10);
//! writer.append(&set).unwrap();
//! let bytes = writer.to_bytes().unwrap();
//! assert_eq!(&bytes[0..8], b"MDF     ");
//! ```

use std::path::Path;

use crate::blocks::{
    self, ChannelBlock, ChannelGroupBlock, DataGroupBlock, FileHistoryBlock, HeaderBlock, MD, NIL,
    TX,
};
use crate::bytestream::ByteWriter;
use crate::compression::Compression;
use crate::fixture::{FixtureSet, NamedChannel, TimeAxis};
use crate::header::{self, IdBlock, ID_BLOCK_SIZE, PROGRAM_ID};
use crate::metadata;
use crate::output;
use crate::version::FormatVersion;
use crate::{Error, FastHashSet, Result};

/// Name of the master channel.
pub const MASTER_CHANNEL: &str = "time";

/// Unit of the master channel.
pub const MASTER_UNIT: &str = "s";

/// Default `<TX>` of the header comment.
pub const DEFAULT_COMMENT: &str = "Boundary values of all primitive channel types";

const TOOL_VENDOR: &str = "mdf4-fixtures";

/// Scoped write session for one measurement file.
#[derive(Debug, Clone)]
pub struct MdfWriter {
    version: FormatVersion,
    compression: Compression,
    start_time_ns: u64,
    comment: String,
    time: Option<TimeAxis>,
    channels: Vec<NamedChannel>,
    names: FastHashSet<String>,
}

impl MdfWriter {
    pub fn new(version: FormatVersion) -> Self {
        Self {
            version,
            compression: Compression::None,
            start_time_ns: 0,
            comment: DEFAULT_COMMENT.to_string(),
            time: None,
            channels: Vec::new(),
            names: FastHashSet::default(),
        }
    }

    /// Speichert die Records als `##DZ` statt `##DT`.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// `hd_start_time_ns`, also used as file history time stamp.
    pub fn with_start_time(mut self, start_time_ns: u64) -> Self {
        self.start_time_ns = start_time_ns;
        self
    }

    /// `<TX>` of the header comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Appends every channel of `set`.
    pub fn append(&mut self, set: &FixtureSet) -> Result<()> {
        for channel in set.channels() {
            self.append_channel(set.time(), channel)?;
        }
        Ok(())
    }

    /// Appends one channel. The first channel fixes the session's time
    /// axis; later channels must use an identical one.
    pub fn append_channel(&mut self, time: &TimeAxis, channel: &NamedChannel) -> Result<()> {
        match &self.time {
            None => self.time = Some(time.clone()),
            Some(current) if current.len() != time.len() => {
                return Err(Error::LengthMismatch {
                    channel: channel.name().to_string(),
                    expected: current.len(),
                    found: time.len(),
                });
            }
            Some(current) if current != time => {
                return Err(Error::unsupported("channels with differing time axes in one session"));
            }
            Some(_) => {}
        }
        if channel.samples().len() != time.len() {
            return Err(Error::LengthMismatch {
                channel: channel.name().to_string(),
                expected: time.len(),
                found: channel.samples().len(),
            });
        }
        if channel.name() == MASTER_CHANNEL || !self.names.insert(channel.name().to_string()) {
            return Err(Error::DuplicateChannel(channel.name().to_string()));
        }
        log::debug!("append channel '{}' ({})", channel.name(), channel.kind());
        self.channels.push(channel.clone());
        Ok(())
    }

    /// Serialisiert die Session in eine vollstaendige MDF-Datei.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let time = self.time.as_ref().ok_or(Error::EmptyFixture)?;
        if self.compression != Compression::None && !self.version.supports_compression() {
            return Err(Error::unsupported(format!(
                "##DZ blocks need MDF {} or newer, session writes {}",
                FormatVersion::MIN_COMPRESSION,
                self.version
            )));
        }

        // Record-Layout: Master bei Byte 0, Kanaele dicht dahinter.
        let mut master = ChannelBlock::master_time(0);
        let mut record_size = master.encoding.byte_size();
        let mut value_blocks = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let encoding = channel.kind().encoding().validate()?;
            value_blocks.push(ChannelBlock::value(encoding, record_size));
            record_size = record_size
                .checked_add(encoding.byte_size())
                .ok_or_else(|| Error::unsupported("record larger than 4 GiB"))?;
        }

        let mut w = ByteWriter::new();
        header::encode(&mut w, &IdBlock::new(self.version));

        let hd_at = HeaderBlock::new(self.start_time_ns).write(&mut w);
        debug_assert_eq!(hd_at, ID_BLOCK_SIZE);
        let hd_comment = blocks::write_text(&mut w, MD, &metadata::hd_comment(&self.comment));
        w.patch_u64(blocks::link_position(hd_at, 5), hd_comment);

        let fh_comment = blocks::write_text(
            &mut w,
            MD,
            &metadata::fh_comment(
                "created",
                PROGRAM_ID,
                TOOL_VENDOR,
                env!("CARGO_PKG_VERSION"),
            ),
        );
        let fh_at = FileHistoryBlock {
            next: NIL,
            comment: fh_comment,
            time_ns: self.start_time_ns,
        }
        .write(&mut w);
        w.patch_u64(blocks::link_position(hd_at, 1), fh_at);

        master.name = blocks::write_text(&mut w, TX, MASTER_CHANNEL);
        master.unit = blocks::write_text(&mut w, TX, MASTER_UNIT);
        for (cn, channel) in value_blocks.iter_mut().zip(&self.channels) {
            cn.name = blocks::write_text(&mut w, TX, channel.name());
        }

        // CN-Kette vorwaerts schreiben, `cn_cn_next` des Vorgaengers patchen.
        let mut first_channel = NIL;
        let mut previous: Option<u64> = None;
        for cn in std::iter::once(&master).chain(&value_blocks) {
            let at = cn.write(&mut w);
            match previous {
                Some(prev) => w.patch_u64(blocks::link_position(prev, 0), at),
                None => first_channel = at,
            }
            previous = Some(at);
        }

        let records = self.records(time, &master, &value_blocks, record_size)?;
        let cg_at = ChannelGroupBlock {
            next: NIL,
            first_channel,
            acquisition_name: NIL,
            comment: NIL,
            record_id: 0,
            cycle_count: time.len() as u64,
            flags: 0,
            data_bytes: record_size,
            invalidation_bytes: 0,
        }
        .write(&mut w);
        let data_at = blocks::write_data(&mut w, &records, self.compression, record_size)?;
        let dg_at = DataGroupBlock {
            next: NIL,
            first_channel_group: cg_at,
            data: data_at,
            comment: NIL,
            record_id_size: 0,
        }
        .write(&mut w);
        w.patch_u64(blocks::link_position(hd_at, 0), dg_at);

        log::debug!(
            "layout: {} channels, record {} bytes x {}, data block at {data_at:#x}, {} bytes total",
            self.channels.len() + 1,
            record_size,
            time.len(),
            w.position()
        );
        Ok(w.into_vec())
    }

    fn records(
        &self,
        time: &TimeAxis,
        master: &ChannelBlock,
        value_blocks: &[ChannelBlock],
        record_size: u32,
    ) -> Result<Vec<u8>> {
        let record_size = record_size as usize;
        let mut records = vec![0u8; time.len() * record_size];
        for (index, record) in records.chunks_exact_mut(record_size).enumerate() {
            let at = master.byte_offset as usize;
            record[at..at + 8].copy_from_slice(&time.values()[index].to_le_bytes());
            for (cn, channel) in value_blocks.iter().zip(&self.channels) {
                let start = cn.byte_offset as usize;
                let end = start + cn.encoding.byte_size() as usize;
                channel.samples().encode_into(index, &mut record[start..end])?;
            }
        }
        Ok(records)
    }

    /// Schreibt die Datei nach `path`. Ohne `overwrite` schlaegt das
    /// Speichern ueber einer vorhandenen Datei mit [`Error::OutputExists`]
    /// fehl; mit `overwrite` wird sie ersetzt.
    pub fn save(&self, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
        let path = path.as_ref();
        output::check_target(path, overwrite)?;
        let bytes = self.to_bytes()?;
        output::write_atomic(path, overwrite, |w| {
            std::io::Write::write_all(w, &bytes)
                .map_err(|e| Error::IoError(format!("write '{}': {e}", path.display())))
        })?;
        log::info!(
            "wrote MDF {} file '{}' ({} channels, {} bytes)",
            self.version,
            path.display(),
            self.channels.len(),
            bytes.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{channel_type, CN};
    use crate::bytestream::ByteReader;
    use crate::fixture;
    use crate::sample::Samples;

    fn primitives_bytes(version: FormatVersion, compression: Compression) -> Vec<u8> {
        let mut writer = MdfWriter::new(version).with_compression(compression);
        writer.append(&fixture::primitives().unwrap()).unwrap();
        writer.to_bytes().unwrap()
    }

    fn channel_chain(bytes: &[u8]) -> Vec<(String, ChannelBlock)> {
        let mut r = ByteReader::new(bytes);
        let hd = HeaderBlock::read(&mut r, ID_BLOCK_SIZE).unwrap();
        let dg = DataGroupBlock::read(&mut r, hd.first_data_group).unwrap();
        let cg = ChannelGroupBlock::read(&mut r, dg.first_channel_group).unwrap();
        let mut out = Vec::new();
        let mut at = cg.first_channel;
        while at != NIL {
            let cn = ChannelBlock::read(&mut r, at).unwrap();
            let (_, name) = blocks::read_text(&mut r, cn.name).unwrap();
            out.push((name, cn));
            at = cn.next;
        }
        out
    }

    #[test]
    fn record_layout_is_packed() {
        let bytes = primitives_bytes(FormatVersion::V4_10, Compression::None);
        let chain = channel_chain(&bytes);
        let layout: Vec<_> = chain
            .iter()
            .map(|(name, cn)| (name.as_str(), cn.byte_offset))
            .collect();
        assert_eq!(
            layout,
            [
                ("time", 0),
                ("i8", 8),
                ("i16", 9),
                ("i32", 11),
                ("i64", 15),
                ("u8", 23),
                ("u16", 24),
                ("u32", 26),
                ("u64", 30),
                ("f32", 38),
                ("f64", 42),
            ]
        );
        assert_eq!(chain[0].1.channel_type, channel_type::MASTER);
        assert!(chain[1..].iter().all(|(_, cn)| !cn.is_master()));
    }

    #[test]
    fn channel_group_counts_records() {
        let bytes = primitives_bytes(FormatVersion::V4_10, Compression::None);
        let mut r = ByteReader::new(&bytes);
        let hd = HeaderBlock::read(&mut r, ID_BLOCK_SIZE).unwrap();
        let dg = DataGroupBlock::read(&mut r, hd.first_data_group).unwrap();
        assert_eq!(dg.record_id_size, 0);
        let cg = ChannelGroupBlock::read(&mut r, dg.first_channel_group).unwrap();
        assert_eq!(cg.cycle_count, 3);
        assert_eq!(cg.data_bytes, 50);
        let data = blocks::read_data(&mut r, dg.data).unwrap();
        assert_eq!(data.len(), 150);
        // zweiter Record, i8 = i8::MAX
        assert_eq!(data[50 + 8] as i8, i8::MAX);
        assert_eq!(f64::from_le_bytes(data[100..108].try_into().unwrap()), 2.0);
    }

    #[test]
    fn deterministic_output() {
        let a = primitives_bytes(FormatVersion::V4_10, Compression::Deflate);
        let b = primitives_bytes(FormatVersion::V4_10, Compression::Deflate);
        assert_eq!(a, b);
    }

    #[test]
    fn compressed_file_has_dz_block() {
        let bytes = primitives_bytes(FormatVersion::V4_11, Compression::TransposedDeflate);
        assert!(memchr::memmem::find(&bytes, b"##DZ").is_some());
        assert!(memchr::memmem::find(&bytes, b"##DT").is_none());
    }

    #[test]
    fn compression_needs_4_10() {
        let mut writer = MdfWriter::new(FormatVersion::V4_00).with_compression(Compression::Deflate);
        writer.append(&fixture::primitives().unwrap()).unwrap();
        assert!(matches!(writer.to_bytes(), Err(Error::UnsupportedFeature(_))));
    }

    #[test]
    fn empty_session_is_error() {
        assert_eq!(MdfWriter::new(FormatVersion::V4_10).to_bytes(), Err(Error::EmptyFixture));
    }

    #[test]
    fn duplicate_and_reserved_names_rejected() {
        let set = fixture::primitives().unwrap();
        let mut writer = MdfWriter::new(FormatVersion::V4_10);
        writer.append(&set).unwrap();
        assert_eq!(writer.append(&set), Err(Error::DuplicateChannel("i8".into())));

        let mut writer = MdfWriter::new(FormatVersion::V4_10);
        let time = TimeAxis::sequential(1);
        let master = NamedChannel::new(MASTER_CHANNEL, Samples::F64(vec![0.0]));
        assert!(matches!(
            writer.append_channel(&time, &master),
            Err(Error::DuplicateChannel(_))
        ));
    }

    #[test]
    fn differing_time_axis_rejected() {
        let mut writer = MdfWriter::new(FormatVersion::V4_10);
        let a = NamedChannel::new("a", Samples::U8(vec![1, 2]));
        let b = NamedChannel::new("b", Samples::U8(vec![1, 2]));
        writer.append_channel(&TimeAxis::sequential(2), &a).unwrap();
        let shifted = TimeAxis::new(vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            writer.append_channel(&shifted, &b),
            Err(Error::UnsupportedFeature(_))
        ));
        assert!(matches!(
            writer.append_channel(&TimeAxis::sequential(3), &b),
            Err(Error::LengthMismatch { .. })
        ));
        assert_eq!(writer.channel_count(), 1);
    }

    #[test]
    fn header_links_resolve() {
        let bytes = primitives_bytes(FormatVersion::V4_10, Compression::None);
        let mut r = ByteReader::new(&bytes);
        let hd = HeaderBlock::read(&mut r, ID_BLOCK_SIZE).unwrap();
        assert_eq!(hd.start_time_ns, 0);
        let (id, xml) = blocks::read_text(&mut r, hd.comment).unwrap();
        assert_eq!(id, MD);
        assert_eq!(metadata::parse_comment(&xml).unwrap().text(), Some(DEFAULT_COMMENT));
        let fh = FileHistoryBlock::read(&mut r, hd.first_file_history).unwrap();
        let (_, xml) = blocks::read_text(&mut r, fh.comment).unwrap();
        assert_eq!(metadata::parse_comment(&xml).unwrap().field("tool_id"), Some(PROGRAM_ID));
        assert!(memchr::memmem::find(&bytes, CN.as_bytes()).is_some());
    }
}
