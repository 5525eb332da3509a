//! Tag domain model and name normalization.
//!
//! # Invariants
//! - Tag names are trimmed, lowercased and never blank.
//! - A persisted tag has `note_count >= 1`; zero-count tags are orphans and
//!   are removed by `service::tag_gc`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

static TAG_TEXT_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[#,;\s]+").expect("valid tag separator regex"));

/// Storage row id of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagId(pub i64);

impl Display for TagId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named label attachable to many notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Number of notes currently linked to this tag.
    pub note_count: u64,
}

/// Normalizes one tag value. Returns `None` for blank input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts tag values.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag.as_ref()) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

/// Splits a free-text tag string into normalized tag names.
///
/// `#`, `,`, `;` and whitespace all separate tags, so `"#Work, home"` and
/// `"work home"` yield the same set.
pub fn parse_tag_text(text: &str) -> Vec<String> {
    let parts: Vec<&str> = TAG_TEXT_SEPARATOR_RE.split(text).collect();
    normalize_tags(&parts)
}
