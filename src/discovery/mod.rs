//! Link discovery
//!
//! Occurrence sources turn documents into a lazy stream of raw links for
//! the engine. The bundled source reads plain text files, and directory
//! arguments are expanded into the files under them.

pub mod paths;
pub mod source;

// Re-export commonly used items
pub use paths::expand_paths;
pub use source::{OccurrenceSource, TextSource, extract_links};
