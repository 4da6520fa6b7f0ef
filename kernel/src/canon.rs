//! Canonical JSON bytes: the single serialization-for-hashing implementation.
//!
//! Every byte stream that is hashed, cached on, or compared across runs must
//! route through [`canonical_json_bytes`]. Two logically equal values must
//! serialize identically regardless of construction order or platform.
//!
//! # Canonicalization rules
//!
//! 1. Object keys in sorted order. `serde_json`'s default map is a `BTreeMap`,
//!    so key order is already lexicographic; this module additionally rejects
//!    builds that enable `preserve_order` via a compile-time check below.
//! 2. Compact form, no extraneous whitespace.
//! 3. Numbers must be integers (`i64` or `u64`); floats, NaN and Infinity are
//!    rejected to prevent cross-platform formatting drift.
//! 4. Strings escaped per RFC 8259; output is always valid UTF-8.

use thiserror::Error;

/// Error type for canonical JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonError {
    /// A JSON number was not an integer (float, NaN, Infinity).
    #[error("non-integer number in canonical JSON: {raw}")]
    NonIntegerNumber { raw: String },

    /// The underlying writer failed.
    #[error("canonical JSON serialization failed: {detail}")]
    Serialize { detail: String },
}

/// Produce canonical JSON bytes from a `serde_json::Value`.
///
/// # Errors
///
/// Returns [`CanonError::NonIntegerNumber`] if any number in the value is not
/// representable as `i64` or `u64`.
pub fn canonical_json_bytes(value: &serde_json::Value) -> Result<Vec<u8>, CanonError> {
    reject_non_integers(value)?;
    // Compact writer over a BTreeMap-backed Value: sorted keys, no whitespace.
    serde_json::to_vec(value).map_err(|e| CanonError::Serialize {
        detail: e.to_string(),
    })
}

fn reject_non_integers(value: &serde_json::Value) -> Result<(), CanonError> {
    match value {
        serde_json::Value::Number(n) => {
            if n.as_i64().is_none() && n.as_u64().is_none() {
                return Err(CanonError::NonIntegerNumber { raw: n.to_string() });
            }
            Ok(())
        }
        serde_json::Value::Array(items) => {
            for item in items {
                reject_non_integers(item)?;
            }
            Ok(())
        }
        serde_json::Value::Object(map) => {
            for item in map.values() {
                reject_non_integers(item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

// Canonical key ordering relies on serde_json's BTreeMap-backed map type.
// The `preserve_order` feature would silently replace it with an
// insertion-ordered map and break every fingerprint in the workspace.
#[cfg(feature = "preserve_order")]
compile_error!("stylefit requires serde_json's default sorted map");
