//! Decision source adapters.

mod json_file;

pub use json_file::JsonFileDecisionSource;
