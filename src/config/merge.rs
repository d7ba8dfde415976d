//! CLI argument merging with config

use super::Settings;
use crate::domain::{EmitFormat, UseFormat};

#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub use_format: Option<UseFormat>,
    pub emit: Option<EmitFormat>,
    pub write_output: Option<bool>,
}

pub fn merge_cli_with_config(mut base_config: Settings, cli: CliOverrides) -> Settings {
    if let Some(use_format) = cli.use_format {
        base_config.use_format = use_format;
    }
    if let Some(emit) = cli.emit {
        base_config.emit = emit;
    }
    if let Some(write_output) = cli.write_output {
        base_config.write_output = write_output;
    }

    base_config
}
