//! practicum-report: where finished sessions go.
//!
//! `ResultSink` implementations for JSON files and memory, and a Markdown
//! summary of a `SessionRecord`.

pub mod json;
pub mod markdown;
pub mod memory;

pub use json::JsonFileSink;
pub use markdown::{generate_markdown, write_markdown_report};
pub use memory::MemorySink;
