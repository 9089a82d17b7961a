//! Content-addressed fingerprints for normalized questions
//!
//! The fingerprint is the key space shared by the cache store and the
//! performance monitor. It is a pure function of already-normalized text;
//! callers normalize first so the hash stays testable in isolation.

use sha2::{Digest, Sha256};

/// Normalize a question prior to fingerprinting.
///
/// Policy: trim surrounding whitespace, then lowercase. Two questions that
/// differ only in case or surrounding whitespace share a fingerprint.
pub fn normalize(question: &str) -> String {
    question.trim().to_lowercase()
}

/// Fingerprint already-normalized question text.
///
/// SHA-256 over the input bytes, rendered as 64 lowercase hex characters.
/// Deterministic and stable across process restarts.
pub fn fingerprint(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:064x}", hasher.finalize())
}
