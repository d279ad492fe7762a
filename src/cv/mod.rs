//! # CV / Résumé Handling
//!
//! Text extraction from uploaded CV files plus the process-wide CV context
//! store that answer generation and session creation read from.

pub mod context;
pub mod extract;

pub use context::{CvContext, CvContextStore, DEFAULT_OWNER};
pub use extract::{DocumentTextExtractor, TextExtractor, SUPPORTED_EXTENSIONS};
