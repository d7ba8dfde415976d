//! Utility functions

pub mod encoding;

pub use encoding::{decode_bytes, read_file_safe};
