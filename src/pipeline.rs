//! Build → write → export pipeline for the `primitives` fixture.
//!
//! Jede Stufe liefert ein `Result`; ein Fehler bricht sofort ab und traegt
//! die Stufe mit, in der er auftrat. Es gibt keine Wiederholungen, da ein
//! Lauf deterministisch ist.
//!
//! # Beispiel
//!
//! ```no_run
//! use mdf4_fixtures::pipeline::{self, FixtureConfig};
//!
//! let outputs = pipeline::run(&FixtureConfig::default().with_resources_root("target/fixtures"))
//!     .unwrap();
//! println!("{}", outputs.binary.display());
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::compression::Compression;
use crate::export::{self, ExportFormat};
use crate::fixture;
use crate::version::FormatVersion;
use crate::writer::MdfWriter;
use crate::Error;

/// Default root directory for generated fixtures.
pub const DEFAULT_RESOURCES_ROOT: &str = "resources";

/// Default base name of both output files.
pub const DEFAULT_BASE_NAME: &str = "primitives";

/// Extension of the binary container.
pub const BINARY_EXTENSION: &str = "mf4";

/// Pipeline stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Write,
    Export,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Write => "write",
            Self::Export => "export",
        }
    }

    /// Process exit code reported for a failure in this stage.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Build => 2,
            Self::Write => 3,
            Self::Export => 4,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fehler einer Pipeline-Stufe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    pub stage: Stage,
    pub error: Error,
}

impl PipelineError {
    pub fn new(stage: Stage, error: Error) -> Self {
        Self { stage, error }
    }

    pub fn exit_code(&self) -> i32 {
        self.stage.exit_code()
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Output locations and encoding options of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureConfig {
    pub resources_root: PathBuf,
    pub base_name: String,
    pub version: FormatVersion,
    pub compression: Compression,
    pub start_time_ns: u64,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            resources_root: PathBuf::from(DEFAULT_RESOURCES_ROOT),
            base_name: DEFAULT_BASE_NAME.to_string(),
            version: FormatVersion::V4_10,
            compression: Compression::None,
            start_time_ns: 0,
        }
    }
}

impl FixtureConfig {
    pub fn with_resources_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resources_root = root.into();
        self
    }

    pub fn with_base_name(mut self, name: impl Into<String>) -> Self {
        self.base_name = name.into();
        self
    }

    pub fn with_version(mut self, version: FormatVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_start_time_ns(mut self, start_time_ns: u64) -> Self {
        self.start_time_ns = start_time_ns;
        self
    }

    /// `<root>/<base>.mf4`
    pub fn binary_path(&self) -> PathBuf {
        self.output_path(BINARY_EXTENSION)
    }

    /// `<root>/<base>.csv`
    pub fn csv_path(&self) -> PathBuf {
        self.output_path(ExportFormat::Csv.extension())
    }

    fn output_path(&self, extension: &str) -> PathBuf {
        self.resources_root
            .join(format!("{}.{extension}", self.base_name))
    }
}

/// Files produced by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outputs {
    pub binary: PathBuf,
    pub csv: PathBuf,
}

/// Fuehrt build → write → export aus und ueberschreibt beide Ausgaben.
pub fn run(config: &FixtureConfig) -> Result<Outputs, PipelineError> {
    log::info!("build: primitives fixture");
    let set = fixture::primitives().map_err(at(Stage::Build))?;

    let binary = config.binary_path();
    log::info!("write: {} (MDF {})", binary.display(), config.version);
    create_root(&config.resources_root).map_err(at(Stage::Write))?;
    let mut writer = MdfWriter::new(config.version)
        .with_compression(config.compression)
        .with_start_time(config.start_time_ns);
    writer
        .append(&set)
        .and_then(|()| writer.save(&binary, true))
        .map_err(at(Stage::Write))?;

    let csv = config.csv_path();
    log::info!("export: {}", csv.display());
    export::export_file(&binary, config.version, ExportFormat::Csv, &csv, true)
        .map_err(at(Stage::Export))?;

    Ok(Outputs { binary, csv })
}

fn at(stage: Stage) -> impl FnOnce(Error) -> PipelineError {
    move |error| PipelineError::new(stage, error)
}

fn create_root(root: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(root)
        .map_err(|e| Error::IoError(format!("create '{}': {e}", root.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths() {
        let config = FixtureConfig::default();
        assert_eq!(config.binary_path(), Path::new("resources").join("primitives.mf4"));
        assert_eq!(config.csv_path(), Path::new("resources").join("primitives.csv"));
        assert_eq!(config.version, FormatVersion::V4_10);
    }

    #[test]
    fn builder_overrides() {
        let config = FixtureConfig::default()
            .with_resources_root("/tmp/x")
            .with_base_name("edge")
            .with_compression(Compression::Deflate)
            .with_start_time_ns(7);
        assert_eq!(config.csv_path(), Path::new("/tmp/x").join("edge.csv"));
        assert_eq!(config.compression, Compression::Deflate);
        assert_eq!(config.start_time_ns, 7);
    }

    #[test]
    fn exit_codes_per_stage() {
        assert_eq!(Stage::Build.exit_code(), 2);
        assert_eq!(Stage::Write.exit_code(), 3);
        assert_eq!(PipelineError::new(Stage::Export, Error::EmptyFixture).exit_code(), 4);
    }

    #[test]
    fn error_names_stage_and_source() {
        let e = PipelineError::new(Stage::Write, Error::OutputExists("x.mf4".into()));
        assert!(e.to_string().starts_with("write stage failed"), "{e}");
        let source = std::error::Error::source(&e).unwrap();
        assert!(source.to_string().contains("x.mf4"));
    }

    #[test]
    fn compression_on_4_00_fails_in_write_stage() {
        let root = std::env::temp_dir().join(format!("mdf4fix_pipeline_400_{}", std::process::id()));
        let config = FixtureConfig::default()
            .with_resources_root(&root)
            .with_version(FormatVersion::V4_00)
            .with_compression(Compression::Deflate);
        let err = run(&config).unwrap_err();
        assert_eq!(err.stage, Stage::Write);
        assert!(!config.binary_path().exists());
        let _ = std::fs::remove_dir_all(&root);
    }
}
