//! RequireJS2Webpack: translate RequireJS AMD configurations into Webpack
//!
//! This library evaluates a RequireJS configuration script in a restricted
//! interpreter, collects its `require` / `require.config` calls, and renders
//! an equivalent Webpack configuration fragment.

pub mod cli;
pub mod config;
pub mod domain;
pub mod eval;
pub mod render;
pub mod translate;
pub mod utils;
