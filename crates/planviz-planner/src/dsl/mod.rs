//! Plan document formats.

pub mod yaml;
