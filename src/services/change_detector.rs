//! Change detection via field fingerprinting.
//!
//! The remote service is polled on every tick, but most polls return
//! the same state. Rather than diffing field-by-field, the scheduler
//! fingerprints the case before and after merging the fetched update
//! and acts only when the digests differ.

use sha2::{Digest, Sha256};

use crate::domain::models::CaseRecord;

/// Computes a stable digest of a case's field set.
///
/// The digest covers the ordered concatenation of all field values in
/// the map's key order, comma-separated. Equal field sets always yield
/// equal digests; any single value change yields a different digest.
/// A cheap equality proxy, not a security primitive.
pub struct ChangeDetector;

impl ChangeDetector {
    /// Hex-encoded SHA-256 over the case's field values.
    pub fn fingerprint(record: &CaseRecord) -> String {
        let mut hasher = Sha256::new();
        for (i, value) in record.fields.values().enumerate() {
            if i > 0 {
                hasher.update(b",");
            }
            hasher.update(canonical_value(value).as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Render a JSON value the same way every time. Bare strings drop
/// their quotes so `"A"` and a hypothetical raw `A` fingerprint alike.
fn canonical_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
