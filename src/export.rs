//! Text export of decoded measurement files.
//!
//! CSV-Layout: Kopfzeile `timestamps,<kanal>,...`, danach eine Zeile pro
//! Record. Ganzzahlen werden dezimal geschrieben. Fliesskommazahlen
//! verwenden die kuerzeste rundtripfaehige Darstellung ihrer nativen
//! Breite im `repr`-Stil:
//!
//! ```text
//! 0.0   1.5   1e+16   3.4028235e+38   1e-05   inf   -inf   nan
//! ```
//!
//! # Beispiel
//!
//! ```
//! use mdf4_fixtures::export::{format_f32, format_f64};
//!
//! assert_eq!(format_f32(f32::MAX), "3.4028235e+38");
//! assert_eq!(format_f64(2.0), "2.0");
//! assert_eq!(format_f64(f64::INFINITY), "inf");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::output;
use crate::reader::MdfFile;
use crate::sample::Value;
use crate::version::FormatVersion;
use crate::{Error, Result};

/// Header of the time column.
pub const TIMESTAMP_COLUMN: &str = "timestamps";

/// Supported export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Comma-separated values, one row per record.
    #[default]
    Csv,
}

impl ExportFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Csv => "csv",
        }
    }

    /// Default file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            _ => Err(Error::UnknownExportFormat(name.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Oeffnet `src` (mit Versionspruefung) und exportiert nach `dest`.
pub fn export_file(
    src: impl AsRef<Path>,
    version: FormatVersion,
    format: ExportFormat,
    dest: impl AsRef<Path>,
    overwrite: bool,
) -> Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    output::check_target(dest, overwrite)?;
    let file = MdfFile::open_path(src, version)?;
    match format {
        ExportFormat::Csv => output::write_atomic(dest, overwrite, |w| write_csv(&file, w))?,
    }
    log::info!(
        "exported '{}' as {format} to '{}' ({} rows)",
        src.display(),
        dest.display(),
        file.record_count()
    );
    Ok(())
}

/// Schreibt `file` als CSV nach `out`.
pub fn write_csv(file: &MdfFile, mut out: impl Write) -> Result<()> {
    out.write_all(TIMESTAMP_COLUMN.as_bytes())?;
    for channel in file.channels() {
        write!(out, ",{}", csv_field(channel.name()))?;
    }
    out.write_all(b"\n")?;

    for (index, &t) in file.time().iter().enumerate() {
        out.write_all(format_f64(t).as_bytes())?;
        for channel in file.channels() {
            let value = channel.samples().get(index).ok_or_else(|| Error::LengthMismatch {
                channel: channel.name().to_string(),
                expected: file.record_count(),
                found: channel.samples().len(),
            })?;
            write!(out, ",{}", format_value(value))?;
        }
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Textform eines Samples.
pub fn format_value(value: Value) -> String {
    match value {
        Value::F32(x) => format_f32(x),
        Value::F64(x) => format_f64(x),
        other => other.to_string(),
    }
}

pub fn format_f32(x: f32) -> String {
    if !x.is_finite() {
        return non_finite(x.is_nan(), x.is_sign_negative()).to_string();
    }
    repr(format!("{x}"), &format!("{x:e}"))
}

pub fn format_f64(x: f64) -> String {
    if !x.is_finite() {
        return non_finite(x.is_nan(), x.is_sign_negative()).to_string();
    }
    repr(format!("{x}"), &format!("{x:e}"))
}

fn non_finite(nan: bool, negative: bool) -> &'static str {
    match (nan, negative) {
        (true, _) => "nan",
        (false, true) => "-inf",
        (false, false) => "inf",
    }
}

/// Fixed notation for decimal exponents in `-4..16`, scientific otherwise.
fn repr(fixed: String, scientific: &str) -> String {
    // `{:e}` liefert immer `<mantissa>e<exp>`
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific.to_string();
    };
    if (-4..16).contains(&exponent) {
        if fixed.contains('.') {
            fixed
        } else {
            fixed + ".0"
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

/// Quotes a field containing separators, quotes or line breaks.
fn csv_field(text: &str) -> Cow<'_, str> {
    if text.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", text.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(text)
    }
}
