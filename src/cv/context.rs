//! CV context store.
//!
//! Holds the extracted CV text and its derived summary between upload and
//! use. The store is process-wide but keyed by an owner identifier with
//! copy-on-read semantics, so an upload racing an in-progress session only
//! ever swaps whole contexts. This build runs single-user against
//! [`DEFAULT_OWNER`]; a multi-user deployment would key by connection or
//! authenticated identity.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Owner key used by the single-user HTTP surface and WebSocket sessions.
pub const DEFAULT_OWNER: &str = "default";

/// Summary length cap; truncation prefers a sentence boundary.
const SUMMARY_MAX_CHARS: usize = 2_000;

/// One uploaded CV and its derived summary.
#[derive(Debug, Clone)]
pub struct CvContext {
    pub filename: String,
    pub full_text: String,
    pub summary: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Keyed CV context storage. Reads clone the stored context.
#[derive(Debug, Default)]
pub struct CvContextStore {
    contexts: RwLock<HashMap<String, CvContext>>,
}

impl CvContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the context for an owner. The summary is derived
    /// from the full text unless one is supplied.
    pub fn set(&self, owner: &str, filename: String, full_text: String, summary: Option<String>) {
        let summary = summary.unwrap_or_else(|| summarize(&full_text));
        let context = CvContext {
            filename,
            full_text,
            summary,
            uploaded_at: Utc::now(),
        };
        self.contexts.write().insert(owner.to_string(), context);
    }

    /// Copy-on-read snapshot of the owner's context.
    pub fn get(&self, owner: &str) -> Option<CvContext> {
        self.contexts.read().get(owner).cloned()
    }

    pub fn clear(&self, owner: &str) {
        self.contexts.write().remove(owner);
    }

    pub fn has_context(&self, owner: &str) -> bool {
        self.contexts.read().contains_key(owner)
    }
}

/// Truncate CV text for use as prompt context, preferring to cut at a
/// sentence boundary when one falls in the last 30% of the window.
pub fn summarize(text: &str) -> String {
    if text.len() <= SUMMARY_MAX_CHARS {
        return text.to_string();
    }

    // Respect char boundaries when slicing.
    let mut cut = SUMMARY_MAX_CHARS;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let truncated = &text[..cut];

    if let Some(last_period) = truncated.rfind('.') {
        if last_period > (SUMMARY_MAX_CHARS * 7) / 10 {
            return truncated[..=last_period].to_string();
        }
    }

    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_its_own_summary() {
        let text = "Short CV.";
        assert_eq!(summarize(text), text);
    }

    #[test]
    fn test_long_text_truncates_at_sentence_boundary() {
        // A sentence ending comfortably inside the last 30% of the window.
        let sentence = "I built things. ";
        let text = sentence.repeat(200); // 3200 chars
        let summary = summarize(&text);

        assert!(summary.len() <= SUMMARY_MAX_CHARS);
        assert!(summary.ends_with('.'));
    }

    #[test]
    fn test_long_text_without_late_period_gets_ellipsis() {
        let text = "x".repeat(3_000);
        let summary = summarize(&text);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.len(), SUMMARY_MAX_CHARS + 3);
    }

    #[test]
    fn test_store_lifecycle() {
        let store = CvContextStore::new();
        assert!(!store.has_context(DEFAULT_OWNER));
        assert!(store.get(DEFAULT_OWNER).is_none());

        store.set(
            DEFAULT_OWNER,
            "resume.txt".to_string(),
            "Ten years of Rust.".to_string(),
            None,
        );

        let ctx = store.get(DEFAULT_OWNER).unwrap();
        assert_eq!(ctx.filename, "resume.txt");
        assert_eq!(ctx.summary, "Ten years of Rust.");

        // Replacement swaps the whole context.
        store.set(
            DEFAULT_OWNER,
            "new.txt".to_string(),
            "Different text.".to_string(),
            Some("custom summary".to_string()),
        );
        assert_eq!(store.get(DEFAULT_OWNER).unwrap().summary, "custom summary");

        store.clear(DEFAULT_OWNER);
        assert!(!store.has_context(DEFAULT_OWNER));
    }

    #[test]
    fn test_owners_are_isolated() {
        let store = CvContextStore::new();
        store.set("a", "a.txt".into(), "A".into(), None);
        store.set("b", "b.txt".into(), "B".into(), None);

        assert_eq!(store.get("a").unwrap().full_text, "A");
        assert_eq!(store.get("b").unwrap().full_text, "B");
        store.clear("a");
        assert!(store.get("b").is_some());
    }
}
