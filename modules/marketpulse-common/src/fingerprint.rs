//! Content fingerprinting for event identity and dedup.
//!
//! The fingerprint is derived from (normalized title, source, first 256 chars
//! of content) and rendered as 16 hex chars. Submitting the same raw event
//! twice always yields the same fingerprint, which is what makes retried and
//! overlapping crawls idempotent.

use crate::types::{EventId, RawEvent};

/// Number of content characters that participate in the fingerprint.
const CONTENT_PREFIX_CHARS: usize = 256;

/// Normalize free text for fingerprinting: trim, lowercase, collapse runs of
/// whitespace to a single space.
pub fn normalize_text(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compute the stable content fingerprint for a raw event.
/// Fingerprinting never fails.
pub fn fingerprint(raw: &RawEvent) -> EventId {
    let title = normalize_text(&raw.title);
    let source = normalize_text(&raw.source);
    let prefix: String = normalize_text(&raw.content)
        .chars()
        .take(CONTENT_PREFIX_CHARS)
        .collect();

    // Fast non-cryptographic hash; collisions at this population size cost a
    // dropped duplicate, never corruption.
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    title.hash(&mut hasher);
    source.hash(&mut hasher);
    prefix.hash(&mut hasher);
    EventId(format!("{:016x}", hasher.finish()))
}
