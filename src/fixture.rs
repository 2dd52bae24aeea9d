//! Boundary-value fixture construction.
//!
//! For every [`PrimitiveKind`] the builder emits exactly three samples:
//!
//! | kind     | sample 0 | sample 1   | sample 2      |
//! |----------|----------|------------|---------------|
//! | signed   | `0`      | `T::MAX`   | `T::MIN`      |
//! | unsigned | `0`      | `1`        | `T::MAX`      |
//! | float    | `0.0`    | `T::MAX`   | `T::INFINITY` |
//!
//! All extremes come from the native type's associated constants. The
//! shared time axis is `0, 1, 2` seconds.
//!
//! # Beispiel
//!
//! ```
//! use mdf4_fixtures::fixture::primitives;
//!
//! let set = primitives().unwrap();
//! assert_eq!(set.channels().len(), 10);
//! assert_eq!(set.time().len(), 3);
//! assert_eq!(set.channel("u8").unwrap().samples().get(2).unwrap().to_string(), "255");
//! ```

use std::cmp::Ordering;

use crate::kind::PrimitiveKind;
use crate::sample::Samples;
use crate::{Error, FastHashSet, Result};

/// Samples per channel: identity, positive extreme, negative or overflow extreme.
pub const BOUNDARY_SAMPLES: usize = 3;

/// Strictly increasing master timestamps in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis(Vec<f64>);

impl TimeAxis {
    /// Validiert strikte Monotonie.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        for (index, pair) in values.windows(2).enumerate() {
            // NaN vergleicht nie als `Less`.
            if pair[0].partial_cmp(&pair[1]) != Some(Ordering::Less) {
                return Err(Error::NonMonotonicTimeAxis { index: index + 1 });
            }
        }
        if values.first().is_some_and(|t| t.is_nan()) {
            return Err(Error::NonMonotonicTimeAxis { index: 0 });
        }
        Ok(Self(values))
    }

    /// `0, 1, ..., len-1` seconds.
    pub fn sequential(len: usize) -> Self {
        Self((0..len).map(|i| i as f64).collect())
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One named channel of the fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedChannel {
    name: String,
    samples: Samples,
}

impl NamedChannel {
    pub fn new(name: impl Into<String>, samples: Samples) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.samples.kind()
    }
}

/// All channels of one generation run plus their shared time axis.
///
/// Invariants: at least one channel, unique names, every channel as long
/// as the time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureSet {
    time: TimeAxis,
    channels: Vec<NamedChannel>,
}

impl FixtureSet {
    pub fn new(time: TimeAxis, channels: Vec<NamedChannel>) -> Result<Self> {
        if channels.is_empty() {
            return Err(Error::EmptyFixture);
        }
        {
            let mut seen = FastHashSet::default();
            for channel in &channels {
                if !seen.insert(channel.name()) {
                    return Err(Error::DuplicateChannel(channel.name().to_string()));
                }
                if channel.samples().len() != time.len() {
                    return Err(Error::LengthMismatch {
                        channel: channel.name().to_string(),
                        expected: time.len(),
                        found: channel.samples().len(),
                    });
                }
            }
        }
        Ok(Self { time, channels })
    }

    pub fn time(&self) -> &TimeAxis {
        &self.time
    }

    pub fn channels(&self) -> &[NamedChannel] {
        &self.channels
    }

    pub fn channel(&self, name: &str) -> Option<&NamedChannel> {
        self.channels.iter().find(|c| c.name() == name)
    }

    /// Number of records (rows) the set produces.
    pub fn record_count(&self) -> usize {
        self.time.len()
    }
}

/// Boundary samples of one kind, taken from the type's own limits.
pub fn boundary(kind: PrimitiveKind) -> Samples {
    match kind {
        PrimitiveKind::I8 => Samples::I8(vec![0, i8::MAX, i8::MIN]),
        PrimitiveKind::I16 => Samples::I16(vec![0, i16::MAX, i16::MIN]),
        PrimitiveKind::I32 => Samples::I32(vec![0, i32::MAX, i32::MIN]),
        PrimitiveKind::I64 => Samples::I64(vec![0, i64::MAX, i64::MIN]),
        PrimitiveKind::U8 => Samples::U8(vec![0, 1, u8::MAX]),
        PrimitiveKind::U16 => Samples::U16(vec![0, 1, u16::MAX]),
        PrimitiveKind::U32 => Samples::U32(vec![0, 1, u32::MAX]),
        PrimitiveKind::U64 => Samples::U64(vec![0, 1, u64::MAX]),
        PrimitiveKind::F32 => Samples::F32(vec![0.0, f32::MAX, f32::INFINITY]),
        PrimitiveKind::F64 => Samples::F64(vec![0.0, f64::MAX, f64::INFINITY]),
    }
}

/// Builds the `primitives` fixture: one channel per [`PrimitiveKind::ALL`]
/// entry, named by the kind's short code.
pub fn primitives() -> Result<FixtureSet> {
    let channels = PrimitiveKind::ALL
        .iter()
        .map(|&kind| NamedChannel::new(kind.code(), boundary(kind)))
        .collect();
    let set = FixtureSet::new(TimeAxis::sequential(BOUNDARY_SAMPLES), channels)?;
    log::debug!(
        "built fixture with {} channels x {} samples",
        set.channels().len(),
        set.record_count()
    );
    Ok(set)
}
