//! mdf4-fixtures CLI: MDF4-Grenzwert-Fixtures erzeugen, exportieren, anzeigen.

#[cfg(feature = "fast-alloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Args, Parser, Subcommand};
use mdf4_fixtures::compression::Compression;
use mdf4_fixtures::export::{self, ExportFormat};
use mdf4_fixtures::pipeline::{self, FixtureConfig, PipelineError, Stage};
use mdf4_fixtures::{FormatVersion, MdfFile};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(
    name = "mdf4-fixtures",
    about = "Boundary-value MDF4 fixtures with CSV export",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    generate: GenerateArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Build, write and export the primitives fixture (default)
    Generate(GenerateArgs),
    /// Export an existing MDF4 file
    Export(ExportArgs),
    /// Show version, comment and channels of an MDF4 file
    Inspect(InspectArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Output directory
    #[arg(long, default_value = pipeline::DEFAULT_RESOURCES_ROOT)]
    root: PathBuf,

    /// Base name of the .mf4 and .csv outputs
    #[arg(long, default_value = pipeline::DEFAULT_BASE_NAME)]
    name: String,

    /// MDF format version (4.00, 4.10, 4.11)
    #[arg(long, default_value = "4.10")]
    version: FormatVersion,

    /// Store records in a ##DZ block (deflate or transposed)
    #[arg(
        long,
        value_name = "MODE",
        num_args = 0..=1,
        default_missing_value = "deflate",
        value_parser = parse_compression
    )]
    compress: Option<Compression>,

    /// hd_start_time_ns written into the header
    #[arg(long, default_value_t = 0)]
    start_time_ns: u64,
}

#[derive(Args)]
struct ExportArgs {
    /// Input MDF4 file
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (optional; without -o derived from the input name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Expected MDF format version of the input
    #[arg(long, default_value = "4.10")]
    version: FormatVersion,

    /// Export format
    #[arg(long, default_value = "csv")]
    format: ExportFormat,
}

#[derive(Args)]
struct InspectArgs {
    /// Input MDF4 file
    #[arg(short, long)]
    input: PathBuf,

    /// Expected MDF format version (default: accept any supported)
    #[arg(long)]
    version: Option<FormatVersion>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

fn parse_compression(s: &str) -> Result<Compression, String> {
    Compression::from_name(s).ok_or_else(|| {
        format!("unknown compression '{s}' (expected none, deflate or transposed)")
    })
}

impl GenerateArgs {
    fn to_config(&self) -> FixtureConfig {
        FixtureConfig::default()
            .with_resources_root(&self.root)
            .with_base_name(&self.name)
            .with_version(self.version)
            .with_compression(self.compress.unwrap_or_default())
            .with_start_time_ns(self.start_time_ns)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help geht nach stdout mit Code 0
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    match cli.command {
        None => run_generate(&cli.generate),
        Some(Command::Generate(args)) => run_generate(&args),
        Some(Command::Export(args)) => run_export(args),
        Some(Command::Inspect(args)) => run_inspect(args),
    }
}

fn run_generate(args: &GenerateArgs) -> Result<(), PipelineError> {
    let outputs = pipeline::run(&args.to_config())?;
    println!("{}", outputs.binary.display());
    println!("{}", outputs.csv.display());
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<(), PipelineError> {
    let output = args
        .output
        .unwrap_or_else(|| derive_output_path(&args.input, args.format));
    export::export_file(&args.input, args.version, args.format, &output, true)
        .map_err(|e| PipelineError::new(Stage::Export, e))?;
    println!("{}", output.display());
    Ok(())
}

/// `foo.mf4` → `foo.csv`
fn derive_output_path(input: &Path, format: ExportFormat) -> PathBuf {
    input.with_extension(format.extension())
}

fn run_inspect(args: InspectArgs) -> Result<(), PipelineError> {
    // Lesefehler zaehlen zur Export-Stufe (gleicher Decoder)
    let read_error = |e| PipelineError::new(Stage::Export, e);
    let bytes = std::fs::read(&args.input)
        .map_err(|e| {
            mdf4_fixtures::Error::IoError(format!("read '{}': {e}", args.input.display()))
        })
        .map_err(read_error)?;
    let file = MdfFile::from_bytes(&bytes, args.version).map_err(read_error)?;

    if args.json {
        let text = serde_json::to_string_pretty(&inspect_json(&file))
            .map_err(|e| read_error(mdf4_fixtures::Error::IoError(e.to_string())))?;
        println!("{text}");
    } else {
        print!("{}", inspect_text(&args.input, &file));
    }
    Ok(())
}

fn inspect_json(file: &MdfFile) -> serde_json::Value {
    let channels: Vec<serde_json::Value> = file
        .channels()
        .map(|ch| {
            serde_json::json!({
                "name": ch.name(),
                "kind": ch.kind().code(),
                "data_type": ch.encoding().data_type.label(),
                "bit_count": ch.encoding().bit_count,
                "samples": ch.samples().len(),
            })
        })
        .collect();
    serde_json::json!({
        "version": file.version().to_string(),
        "program": file.id().program(),
        "start_time_ns": file.start_time_ns(),
        "comment": file.comment().and_then(|c| c.text()),
        "master": file.master_name(),
        "records": file.record_count(),
        "channels": channels,
    })
}

fn inspect_text(path: &Path, file: &MdfFile) -> String {
    let mut out = String::new();
    out.push_str(&format!("file:     {}\n", path.display()));
    out.push_str(&format!("version:  {} ({})\n", file.version(), file.id().program()));
    if let Some(text) = file.comment().and_then(|c| c.text()) {
        out.push_str(&format!("comment:  {text}\n"));
    }
    out.push_str(&format!("records:  {}\n", file.record_count()));
    out.push_str(&format!("master:   {}\n", file.master_name()));
    out.push_str("channels:\n");
    for ch in file.channels() {
        out.push_str(&format!(
            "  {:<8} {:<10} {:>3} bit  {} samples\n",
            ch.name(),
            ch.encoding().data_type.label(),
            ch.encoding().bit_count,
            ch.samples().len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse_cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("CLI parse failed")
    }

    #[test]
    fn no_arguments_means_generate_with_defaults() {
        let cli = parse_cli(&["mdf4-fixtures"]);
        assert!(cli.command.is_none());
        let config = cli.generate.to_config();
        assert_eq!(config, FixtureConfig::default());
    }

    #[test]
    fn compress_flag_without_value_is_deflate() {
        let cli = parse_cli(&["mdf4-fixtures", "generate", "--compress", "--root", "out"]);
        let Some(Command::Generate(args)) = cli.command else {
            panic!("expected generate command");
        };
        let config = args.to_config();
        assert_eq!(config.compression, Compression::Deflate);
        assert_eq!(config.binary_path(), Path::new("out").join("primitives.mf4"));
    }

    #[test]
    fn compress_mode_and_version() {
        let cli = parse_cli(&[
            "mdf4-fixtures", "--compress", "transposed", "--version", "4.11",
        ]);
        let config = cli.generate.to_config();
        assert_eq!(config.compression, Compression::TransposedDeflate);
        assert_eq!(config.version, FormatVersion::V4_11);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(Cli::try_parse_from(["mdf4-fixtures", "--version", "3.30"]).is_err());
        assert!(Cli::try_parse_from(["mdf4-fixtures", "--compress", "lz4"]).is_err());
        assert!(Cli::try_parse_from(["mdf4-fixtures", "export", "-i", "a.mf4", "--format", "xml"]).is_err());
    }

    #[test]
    fn export_output_is_derived() {
        let cli = parse_cli(&["mdf4-fixtures", "export", "-i", "dir/primitives.mf4"]);
        let Some(Command::Export(args)) = cli.command else {
            panic!("expected export command");
        };
        assert!(args.output.is_none());
        assert_eq!(
            derive_output_path(&args.input, args.format),
            Path::new("dir").join("primitives.csv")
        );
    }

    #[test]
    fn top_level_flags_conflict_with_subcommand() {
        assert!(Cli::try_parse_from(["mdf4-fixtures", "--root", "x", "inspect", "-i", "a.mf4"]).is_err());
    }
}
