//! Command-line interface for requirejs2webpack
//!
//! `requirejs2webpack [SOURCE] [OUTPUT]` translates one RequireJS
//! configuration file and prints the Webpack fragment.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod convert;

pub use convert::INVALID_SOURCE_MESSAGE;

/// Translate a RequireJS AMD configuration into a Webpack configuration fragment
#[derive(Parser)]
#[command(name = "requirejs2webpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    convert: convert::ConvertArgs,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long)]
    verbose: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    convert::run(cli.convert)
}
