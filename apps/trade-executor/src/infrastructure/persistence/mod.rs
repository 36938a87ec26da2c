//! State backends.

mod in_memory;
mod json_file;

pub use in_memory::InMemoryStateBackend;
pub use json_file::JsonFileStateBackend;
