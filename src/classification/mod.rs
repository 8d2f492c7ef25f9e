//! Outcome classification
//!
//! This module maps raw check outcomes onto the fixed category taxonomy
//! with a deterministic rule table.

pub mod category;
pub mod classifier;
pub mod domain;

// Re-export commonly used items
pub use category::Category;
pub use classifier::{Classifier, ClassifierPolicy};
pub use domain::registrable_domain;
