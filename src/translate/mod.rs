//! RequireJS to Webpack translation
//!
//! [`ConfigTranslator`] collects the `require` / `require.config` calls made
//! by a configuration script and renders them as a Webpack fragment.
//!
//! Required modules and alias targets are kept as script values and only
//! converted to strings when the tables are built, so an array passed to
//! `require.config` and modified afterwards renders with its final contents.
//! Shim dependencies are converted when recorded.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::{PropertyMap, ShimRule, Tables};
use crate::eval::{evaluate, ModuleRecorder, TypeError, Value};
use crate::render::{render, RenderOptions};
use crate::utils::read_file_safe;

pub struct ConfigTranslator {
    source_path: PathBuf,
    required: Vec<Value>,
    aliases: PropertyMap<Value>,
    rules: Vec<ShimRule>,
}

impl ConfigTranslator {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            required: Vec::new(),
            aliases: PropertyMap::new(),
            rules: Vec::new(),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Snapshot of the collected tables with every value converted to a string.
    pub fn tables(&self) -> Tables {
        let mut aliases = PropertyMap::new();
        for (module, path) in self.aliases.iter() {
            aliases.insert(module, path.to_js_string());
        }
        Tables {
            required: self.required.iter().map(Value::to_js_string).collect(),
            aliases,
            rules: self.rules.clone(),
        }
    }

    /// Read the configuration file and evaluate it once.
    pub fn load(&mut self) -> Result<()> {
        let source = read_file_safe(&self.source_path)?;
        self.load_source(&source)
            .with_context(|| format!("Failed to evaluate {}", self.source_path.display()))
    }

    /// Evaluate configuration script text directly.
    pub fn load_source(&mut self, source: &str) -> Result<()> {
        evaluate(source, self)?;
        debug!(
            required = self.required.len(),
            aliases = self.aliases.len(),
            rules = self.rules.len(),
            "Configuration evaluated"
        );
        Ok(())
    }

    /// Render the collected tables.
    pub fn render(&self, options: &RenderOptions) -> Result<String> {
        render(&self.tables(), options)
    }

    /// Render and write the output. `label` names the destination in the log;
    /// the buffer goes to `out`, followed by a newline.
    pub fn save<W: Write>(&self, label: &str, options: &RenderOptions, out: &mut W) -> Result<()> {
        debug!("Writing to '{label}'.");
        let buffer = self.render(options)?;
        writeln!(out, "{buffer}").with_context(|| format!("Failed to write output to '{label}'"))?;
        out.flush()?;
        Ok(())
    }

    fn record_module(&mut self, module: Value) {
        info!("Module '{}' was required.", module.to_js_string());
        self.required.push(module);
    }
}

impl ModuleRecorder for ConfigTranslator {
    fn record_require(&mut self, modules: &Value) -> Result<(), TypeError> {
        match modules {
            Value::String(_) => self.record_module(modules.clone()),
            Value::Array(_) => {
                for (_, module) in modules.enumerate() {
                    self.record_module(module);
                }
            }
            Value::Null | Value::Object(_) => {
                return Err(TypeError(format!("{} is not iterable", describe(modules))));
            }
            // Numbers, booleans, undefined and functions are ignored.
            _ => {}
        }
        Ok(())
    }

    fn record_config(&mut self, config: &Value) -> Result<(), TypeError> {
        let paths = config.get_property("paths")?;
        for (module, path) in paths.enumerate() {
            debug!("Module '{module}' was mapped to {}.", path.to_js_string());
            self.aliases.insert(module, path);
        }

        let shims = config.get_property("shim")?;
        for (shim_name, shim) in shims.enumerate() {
            let deps = shim.get_property("deps")?;
            let deps_text = deps.to_js_string();
            debug!("Shim '{shim_name}' depends on {deps_text}.");
            self.rules.push(ShimRule::new(&shim_name, deps_text, deps.string_elements()));
        }
        Ok(())
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Object(_) => "object".to_string(),
        other => other.to_js_string(),
    }
}
