//! MDF4 reader for the subset the writer produces.
//!
//! Liest ID-Block, HD mit Kommentar, die FH-Kette und alle DG→CG→CN
//! Ketten. Pro Datengruppe ist genau eine Kanalgruppe erlaubt
//! (`dg_rec_id_size = 0`). Mehrere Datengruppen werden akzeptiert, wenn
//! ihre Zeitachsen identisch sind.
//!
//! Alle Link-Ketten werden gegen Zyklen geprueft; beliebige Eingabebytes
//! liefern einen Fehler, nie eine Endlosschleife.

use std::path::Path;

use crate::blocks::{
    self, ChannelBlock, ChannelGroupBlock, DataGroupBlock, FileHistoryBlock, HeaderBlock, MD, NIL,
};
use crate::bytestream::ByteReader;
use crate::data_type::{ChannelDataType, Encoding};
use crate::header::{self, IdBlock, ID_BLOCK_SIZE};
use crate::kind::PrimitiveKind;
use crate::metadata::{self, Comment};
use crate::sample::Samples;
use crate::version::FormatVersion;
use crate::{Error, FastHashSet, FastIndexMap, Result};

/// One decoded value channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChannel {
    name: String,
    unit: Option<String>,
    encoding: Encoding,
    samples: Samples,
}

impl DecodedChannel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.samples.kind()
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }
}

/// Decoded measurement file.
#[derive(Debug, Clone)]
pub struct MdfFile {
    id: IdBlock,
    start_time_ns: u64,
    comment: Option<Comment>,
    history: Vec<Comment>,
    master_name: String,
    time: Vec<f64>,
    channels: FastIndexMap<String, DecodedChannel>,
}

impl MdfFile {
    /// Reads a file from disk and checks its declared version.
    pub fn open_path(path: impl AsRef<Path>, version: FormatVersion) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::IoError(format!("read '{}': {e}", path.display())))?;
        let file = Self::from_bytes(&bytes, Some(version))?;
        log::debug!(
            "read '{}': MDF {}, {} channels",
            path.display(),
            file.version(),
            file.channels.len()
        );
        Ok(file)
    }

    /// Parst eine komplette Datei aus dem Speicher. Mit `expected` muss die
    /// deklarierte Version uebereinstimmen.
    pub fn from_bytes(bytes: &[u8], expected: Option<FormatVersion>) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let id = header::decode(&mut r)?;
        if let Some(expected) = expected
            && expected != id.version()
        {
            return Err(Error::VersionMismatch {
                expected: expected.to_string(),
                found: id.version().to_string(),
            });
        }
        if id.is_unfinalized() {
            return Err(Error::unsupported("unfinalized files"));
        }

        let hd = HeaderBlock::read(&mut r, ID_BLOCK_SIZE)?;
        let comment = read_comment(&mut r, hd.comment)?;
        let history = read_history(&mut r, hd.first_file_history)?;

        let mut file = Self {
            id,
            start_time_ns: hd.start_time_ns,
            comment,
            history,
            master_name: String::new(),
            time: Vec::new(),
            channels: FastIndexMap::default(),
        };

        let mut visited = FastHashSet::default();
        let mut dg_at = hd.first_data_group;
        let mut first_group = true;
        while dg_at != NIL {
            if !visited.insert(dg_at) {
                return Err(Error::InvalidLink(dg_at));
            }
            let dg = DataGroupBlock::read(&mut r, dg_at)?;
            let group = read_group(&mut r, &dg)?;
            file.merge(group, first_group)?;
            first_group = false;
            dg_at = dg.next;
        }
        Ok(file)
    }

    fn merge(&mut self, group: Group, first: bool) -> Result<()> {
        if first {
            self.master_name = group.master_name;
            self.time = group.time;
        } else if group.time != self.time {
            return Err(Error::unsupported("data groups with differing time axes"));
        }
        for channel in group.channels {
            if self.channels.contains_key(&channel.name) {
                return Err(Error::DuplicateChannel(channel.name));
            }
            self.channels.insert(channel.name.clone(), channel);
        }
        Ok(())
    }

    pub fn id(&self) -> &IdBlock {
        &self.id
    }

    pub fn version(&self) -> FormatVersion {
        self.id.version()
    }

    pub fn start_time_ns(&self) -> u64 {
        self.start_time_ns
    }

    /// Header comment, if the file has one.
    pub fn comment(&self) -> Option<&Comment> {
        self.comment.as_ref()
    }

    /// File history comments in chain order.
    pub fn history(&self) -> &[Comment] {
        &self.history
    }

    /// Name of the master channel (`time` for files from this crate).
    pub fn master_name(&self) -> &str {
        &self.master_name
    }

    /// Master values; `0, 1, ...` when the group has no master channel.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn channel(&self, name: &str) -> Option<&DecodedChannel> {
        self.channels.get(name)
    }

    /// Value channels in file order.
    pub fn channels(&self) -> impl ExactSizeIterator<Item = &DecodedChannel> {
        self.channels.values()
    }

    pub fn record_count(&self) -> usize {
        self.time.len()
    }
}

struct Group {
    master_name: String,
    time: Vec<f64>,
    channels: Vec<DecodedChannel>,
}

fn read_comment(r: &mut ByteReader, link: u64) -> Result<Option<Comment>> {
    if link == NIL {
        return Ok(None);
    }
    let (id, text) = blocks::read_text(r, link)?;
    if id == MD {
        metadata::parse_comment(&text).map(Some)
    } else {
        Ok(Some(Comment::plain(text)))
    }
}

fn read_history(r: &mut ByteReader, first: u64) -> Result<Vec<Comment>> {
    let mut history = Vec::new();
    let mut visited = FastHashSet::default();
    let mut at = first;
    while at != NIL {
        if !visited.insert(at) {
            return Err(Error::InvalidLink(at));
        }
        let fh = FileHistoryBlock::read(r, at)?;
        if let Some(comment) = read_comment(r, fh.comment)? {
            history.push(comment);
        }
        at = fh.next;
    }
    Ok(history)
}

fn read_group(r: &mut ByteReader, dg: &DataGroupBlock) -> Result<Group> {
    if dg.record_id_size != 0 {
        return Err(Error::unsupported("record ids (unsorted data groups)"));
    }
    let cg = ChannelGroupBlock::read(r, dg.first_channel_group)?;
    if cg.next != NIL {
        return Err(Error::unsupported("multiple channel groups per data group"));
    }
    if cg.invalidation_bytes != 0 {
        return Err(Error::unsupported("invalidation bytes"));
    }
    if cg.data_bytes == 0 && cg.cycle_count != 0 {
        return Err(Error::unsupported("zero-length records"));
    }

    let records = blocks::read_data(r, dg.data)?;
    let record_size = cg.data_bytes as usize;
    let expected = cg
        .cycle_count
        .checked_mul(u64::from(cg.data_bytes))
        .ok_or(Error::PrematureEndOfData { offset: r.len() })?;
    if records.len() as u64 != expected {
        return Err(Error::BlockTooShort {
            block: blocks::DT,
            required: expected,
            found: records.len() as u64,
        });
    }
    let count = cg.cycle_count as usize;

    let mut master: Option<(String, ChannelBlock)> = None;
    let mut values: Vec<(String, Option<String>, ChannelBlock)> = Vec::new();
    let mut visited = FastHashSet::default();
    let mut at = cg.first_channel;
    while at != NIL {
        if !visited.insert(at) {
            return Err(Error::InvalidLink(at));
        }
        let cn = ChannelBlock::read(r, at)?;
        let (_, name) = blocks::read_text(r, cn.name)?;
        let end = u64::from(cn.byte_offset) + u64::from(cn.encoding.byte_size());
        if end > u64::from(cg.data_bytes) {
            return Err(Error::BlockTooShort {
                block: blocks::CG,
                required: end,
                found: u64::from(cg.data_bytes),
            });
        }
        if cn.is_master() {
            if master.is_some() {
                return Err(Error::unsupported("more than one master channel"));
            }
            master = Some((name, cn));
        } else {
            let unit = match cn.unit {
                NIL => None,
                link => Some(blocks::read_text(r, link)?.1),
            };
            values.push((name, unit, cn));
        }
        at = cn.next;
    }

    let (master_name, time) = match master {
        Some((name, cn)) => (name, decode_master(&cn, &records, record_size)?),
        None => (String::new(), (0..count).map(|i| i as f64).collect()),
    };

    let mut channels = Vec::with_capacity(values.len());
    for (name, unit, cn) in values {
        let kind = PrimitiveKind::from_encoding(cn.encoding)?;
        let start = cn.byte_offset as usize;
        let width = cn.encoding.byte_size() as usize;
        let mut samples = Samples::with_capacity(kind, count);
        for record in records.chunks_exact(record_size.max(1)).take(count) {
            samples.push_le(&record[start..start + width])?;
        }
        channels.push(DecodedChannel {
            name,
            unit,
            encoding: cn.encoding,
            samples,
        });
    }

    Ok(Group {
        master_name,
        time,
        channels,
    })
}

fn decode_master(cn: &ChannelBlock, records: &[u8], record_size: usize) -> Result<Vec<f64>> {
    let start = cn.byte_offset as usize;
    let read = |record: &[u8]| -> f64 {
        match cn.encoding.bit_count {
            32 => f64::from(f32::from_le_bytes([
                record[start],
                record[start + 1],
                record[start + 2],
                record[start + 3],
            ])),
            _ => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&record[start..start + 8]);
                f64::from_le_bytes(raw)
            }
        }
    };
    match (cn.encoding.data_type, cn.encoding.bit_count) {
        (ChannelDataType::FloatLe, 32 | 64) if record_size > 0 => {
            Ok(records.chunks_exact(record_size).map(read).collect())
        }
        (ChannelDataType::FloatLe, 32 | 64) => Ok(Vec::new()),
        (data_type, bit_count) => Err(Error::UnsupportedDataType {
            data_type: data_type.as_u8(),
            bit_count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytestream::ByteWriter;
    use crate::compression::Compression;
    use crate::fixture;
    use crate::sample::Value;
    use crate::writer::{MdfWriter, DEFAULT_COMMENT};

    fn primitives_file(compression: Compression) -> Vec<u8> {
        let mut writer = MdfWriter::new(FormatVersion::V4_10).with_compression(compression);
        writer.append(&fixture::primitives().unwrap()).unwrap();
        writer.to_bytes().unwrap()
    }

    #[test]
    fn reads_back_primitives() {
        let file = MdfFile::from_bytes(&primitives_file(Compression::None), None).unwrap();
        assert_eq!(file.version(), FormatVersion::V4_10);
        assert_eq!(file.master_name(), "time");
        assert_eq!(file.time(), &[0.0, 1.0, 2.0]);
        let names: Vec<_> = file.channels().map(DecodedChannel::name).collect();
        assert_eq!(names, ["i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32", "f64"]);
        assert_eq!(file.comment().and_then(Comment::text), Some(DEFAULT_COMMENT));
        assert_eq!(file.history().len(), 1);
    }

    #[test]
    fn integers_exact() {
        let set = fixture::primitives().unwrap();
        let file = MdfFile::from_bytes(&primitives_file(Compression::None), None).unwrap();
        for original in set.channels() {
            let decoded = file.channel(original.name()).unwrap();
            assert_eq!(decoded.samples(), original.samples(), "{}", original.name());
            assert_eq!(decoded.encoding(), original.kind().encoding());
        }
    }

    #[test]
    fn floats_keep_infinity() {
        let file = MdfFile::from_bytes(&primitives_file(Compression::Deflate), None).unwrap();
        let f32s = file.channel("f32").unwrap().samples();
        assert_eq!(f32s.get(1), Some(Value::F32(f32::MAX)));
        match f32s.get(2) {
            Some(Value::F32(x)) => assert!(x.is_infinite() && x > 0.0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            file.channel("f64").unwrap().samples(),
            &Samples::F64(vec![0.0, f64::MAX, f64::INFINITY])
        );
    }

    #[test]
    fn version_mismatch() {
        let bytes = primitives_file(Compression::None);
        assert_eq!(
            MdfFile::from_bytes(&bytes, Some(FormatVersion::V4_11)).unwrap_err(),
            Error::VersionMismatch {
                expected: "4.11".into(),
                found: "4.10".into()
            }
        );
    }

    #[test]
    fn unfinalized_rejected() {
        let mut bytes = primitives_file(Compression::None);
        bytes[0..8].copy_from_slice(crate::header::UNFINISHED_FILE_MAGIC);
        assert!(matches!(
            MdfFile::from_bytes(&bytes, None),
            Err(Error::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn truncated_file_is_error() {
        let bytes = primitives_file(Compression::None);
        for cut in [10, 64, 100, bytes.len() / 2, bytes.len() - 1] {
            assert!(MdfFile::from_bytes(&bytes[..cut], None).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn record_id_rejected() {
        let bytes = primitives_file(Compression::None);
        let mut r = ByteReader::new(&bytes);
        let hd = HeaderBlock::read(&mut r, ID_BLOCK_SIZE).unwrap();
        let mut patched = bytes.clone();
        // dg_rec_id_size liegt direkt hinter den 4 Links
        let at = blocks::link_position(hd.first_data_group, DataGroupBlock::LINKS) as usize;
        patched[at] = 1;
        assert!(matches!(
            MdfFile::from_bytes(&patched, None),
            Err(Error::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn cyclic_channel_chain_is_error() {
        let bytes = primitives_file(Compression::None);
        let mut r = ByteReader::new(&bytes);
        let hd = HeaderBlock::read(&mut r, ID_BLOCK_SIZE).unwrap();
        let dg = DataGroupBlock::read(&mut r, hd.first_data_group).unwrap();
        let cg = ChannelGroupBlock::read(&mut r, dg.first_channel_group).unwrap();
        let mut w = ByteWriter::new();
        w.write_bytes(&bytes);
        w.patch_u64(blocks::link_position(cg.first_channel, 0), cg.first_channel);
        assert_eq!(
            MdfFile::from_bytes(&w.into_vec(), None).unwrap_err(),
            Error::InvalidLink(cg.first_channel)
        );
    }

    #[test]
    fn garbage_is_invalid_magic() {
        assert_eq!(MdfFile::from_bytes(&[0x42; 128], None).unwrap_err(), Error::InvalidMagic);
    }

    #[test]
    fn open_missing_path() {
        let path = std::env::temp_dir().join("mdf4fix_reader_does_not_exist.mf4");
        assert!(matches!(
            MdfFile::open_path(&path, FormatVersion::V4_10),
            Err(Error::IoError(_))
        ));
    }
}
