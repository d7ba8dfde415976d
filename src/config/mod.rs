//! Configuration loading
//!
//! Settings are layered: built-in defaults, then an optional
//! `requirejs2webpack.toml` / `requirejs2webpack.yml` file, then `R2W_*`
//! environment variables, then command-line flags.

mod merge;

pub use merge::{merge_cli_with_config, CliOverrides};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::domain::{EmitFormat, UseFormat};
use crate::render::RenderOptions;

/// Config file names looked up in the working directory.
pub const CONFIG_FILE_NAMES: &[&str] =
    &["requirejs2webpack.toml", "requirejs2webpack.yml", "requirejs2webpack.yaml"];

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "R2W_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rendering of shim `use` arrays
    pub use_format: UseFormat,

    /// Output flavour
    pub emit: EmitFormat,

    /// Write the buffer to the output path instead of stdout
    pub write_output: bool,
}

impl Settings {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions { emit: self.emit, use_format: self.use_format }
    }
}

/// Load settings from `explicit` (if given) or the first config file found in
/// `dir`, layered over defaults and under the environment.
pub fn load_config(dir: &Path, explicit: Option<&Path>) -> Result<Settings> {
    let mut figment = Figment::from(Serialized::defaults(Settings::default()));

    let file = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.to_path_buf())
        }
        None => CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| path.exists()),
    };

    if let Some(path) = file {
        debug!(path = %path.display(), "Loading config file");
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yml") | Some("yaml")
        );
        figment = if is_yaml {
            figment.merge(Yaml::file(&path))
        } else {
            figment.merge(Toml::file(&path))
        };
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .context("Invalid requirejs2webpack configuration")
}
