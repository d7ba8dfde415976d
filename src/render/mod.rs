//! Output rendering
//!
//! The Webpack template reproduces the established output byte for byte,
//! including its trailing commas, the unquoted `test` values and the
//! `rules: { ... }` braces. Consumers paste the fragment into their own
//! configuration, so the shape is kept stable.

use anyhow::Result;

use crate::domain::{EmitFormat, Tables, UseFormat};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub emit: EmitFormat,
    pub use_format: UseFormat,
}

pub fn render(tables: &Tables, options: &RenderOptions) -> Result<String> {
    match options.emit {
        EmitFormat::Webpack => Ok(render_webpack(tables, options.use_format)),
        EmitFormat::Json => Ok(serde_json::to_string_pretty(tables)?),
    }
}

/// Render the `resolve`/`module` fragment followed by the `define` wrapper.
pub fn render_webpack(tables: &Tables, use_format: UseFormat) -> String {
    let mut buffer = String::new();

    buffer.push_str("resolve: {\n");
    buffer.push_str("\talias: {\n");
    for (module, path) in tables.aliases.iter() {
        buffer.push_str(&format!("\t\t'{module}': '{path}',\n"));
    }
    buffer.push_str("\t},\n");

    buffer.push_str("\tmodule: {\n");
    buffer.push_str("\t\trules: {\n");
    for rule in &tables.rules {
        let uses: Vec<String> = rule
            .use_entries(use_format)
            .iter()
            .map(|entry| format!("\t\t\t\t\t\"{entry}\""))
            .collect();

        buffer.push_str("\t\t\t{\n");
        buffer.push_str(&format!("\t\t\t\ttest: {},\n", rule.test));
        buffer.push_str(&format!("\t\t\t\tuse: [\n{}\n\t\t\t\t],\n", uses.join(",\n")));
        buffer.push_str("\t\t\t},\n");
    }
    buffer.push_str("\t\t},\n");
    buffer.push_str("\t},\n");
    buffer.push_str("}\n");

    buffer.push_str("define([");
    for module in &tables.required {
        buffer.push_str(&format!("\t'{module}',\n"));
    }
    buffer.push_str("], function () {");
    buffer.push_str("});");

    buffer
}
