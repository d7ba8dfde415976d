//! requirejs2webpack: translate a RequireJS configuration into Webpack
//!
//! Reads a RequireJS `main.js`-style configuration and prints the matching
//! `resolve.alias` / `module.rules` fragment plus an AMD `define([...])` wrapper.

use anyhow::Result;

mod cli;
mod config;
mod domain;
mod eval;
mod render;
mod translate;
mod utils;

fn main() -> Result<()> {
    cli::run()
}
