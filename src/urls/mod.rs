//! URL canonicalization and deduplication
//!
//! This module turns raw extracted strings into comparable canonical URLs
//! and tracks every distinct link together with the places it was seen.

pub mod dedup;
pub mod normalizer;

// Re-export commonly used items
pub use dedup::{Admission, DedupIndex, LinkKey, RecordState, UrlRecord};
pub use normalizer::{CanonicalUrl, NormalizeError, Scheme, clean_raw, normalize};
