//! Convert command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::{load_config, merge_cli_with_config, CliOverrides, Settings};
use crate::domain::{EmitFormat, UseFormat};
use crate::translate::ConfigTranslator;

/// Printed when the source argument is missing or does not exist.
pub const INVALID_SOURCE_MESSAGE: &str = "na please enter a valid config file.";

/// Output label used when none is given.
const DEFAULT_OUTPUT_LABEL: &str = "stdout";

#[derive(Args)]
pub struct ConvertArgs {
    /// RequireJS configuration script (e.g. main.js)
    #[arg(value_name = "SOURCE")]
    pub source: Option<PathBuf>,

    /// Output destination label (a file path when --write is set)
    #[arg(value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Path to config file (requirejs2webpack.toml or .yml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Shim `use` rendering: 'compat' (single stringified entry) or 'per-dependency'
    #[arg(short = 'u', long, value_name = "FORMAT")]
    pub use_format: Option<String>,

    /// Output format: 'webpack' or 'json'
    #[arg(short = 'e', long, value_name = "FORMAT")]
    pub emit: Option<String>,

    /// Write the output to the OUTPUT path instead of stdout
    #[arg(short = 'w', long)]
    pub write: bool,
}

pub fn run(args: ConvertArgs) -> Result<()> {
    let Some(source) = args.source.as_deref().filter(|path| path.exists()) else {
        println!("{INVALID_SOURCE_MESSAGE}");
        return Ok(());
    };

    let cli_overrides = CliOverrides {
        use_format: args.use_format.as_deref().map(parse_use_format).transpose()?,
        emit: args.emit.as_deref().map(parse_emit_format).transpose()?,
        write_output: if args.write { Some(true) } else { None },
    };
    let cwd = std::env::current_dir()?;
    let file_config = load_config(&cwd, args.config.as_deref())?;
    let settings = merge_cli_with_config(file_config, cli_overrides);

    let label = args.output.as_deref().unwrap_or(DEFAULT_OUTPUT_LABEL);
    let destination = write_destination(settings.write_output, args.output.as_deref());
    if settings.write_output && destination.is_none() {
        warn!("Writing was requested but no OUTPUT path was given; printing to stdout");
    }
    if let Err(err) = convert(source, label, destination, &settings) {
        error!("{err:#}");
    }
    Ok(())
}

/// The file to write to, if any. `stdout` as OUTPUT names the terminal.
fn write_destination(write_output: bool, output: Option<&str>) -> Option<&str> {
    output.filter(|path| write_output && *path != DEFAULT_OUTPUT_LABEL)
}

fn convert(
    source: &Path,
    label: &str,
    destination: Option<&str>,
    settings: &Settings,
) -> Result<()> {
    let mut translator = ConfigTranslator::new(source);
    translator.load()?;

    let options = settings.render_options();
    if let Some(path) = destination {
        let file = File::create(path).with_context(|| format!("Failed to create {path}"))?;
        let mut writer = BufWriter::new(file);
        translator.save(path, &options, &mut writer)?;
        info!("Wrote {path}");
    } else {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        translator.save(label, &options, &mut lock)?;
    }
    Ok(())
}

fn parse_use_format(value: &str) -> Result<UseFormat> {
    match value.to_lowercase().as_str() {
        "compat" => Ok(UseFormat::Compat),
        "per-dependency" | "per-dep" => Ok(UseFormat::PerDependency),
        _ => anyhow::bail!("Invalid use format: {value}. Use 'compat' or 'per-dependency'"),
    }
}

fn parse_emit_format(value: &str) -> Result<EmitFormat> {
    match value.to_lowercase().as_str() {
        "webpack" => Ok(EmitFormat::Webpack),
        "json" => Ok(EmitFormat::Json),
        _ => anyhow::bail!("Invalid emit format: {value}. Use 'webpack' or 'json'"),
    }
}
