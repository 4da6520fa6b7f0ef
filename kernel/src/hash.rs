//! Content-addressed fingerprints with domain separation.
//!
//! Every identity the engine compares or caches on — styles, source files,
//! formatter binaries, reformatted outputs, the search log — is reduced to a
//! SHA-256 digest computed over a null-terminated domain prefix followed by
//! the canonical bytes of the value. Distinct domains guarantee that equal
//! byte payloads in different roles can never alias a cache key.
//!
//! **Exactly one place defines fingerprint hashing** — all digest flows in
//! the workspace route through [`canonical_hash`].

use sha2::{Digest, Sha256};

/// A content-addressed identity in `"algorithm:hex_digest"` form
/// (e.g. `"sha256:abcdef..."`).
///
/// Both constructors uphold the same invariant: one `:` separator, a
/// lowercase alphanumeric algorithm name on the left, lowercase hex on the
/// right. The accessors rely on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash {
    full: String,
}

impl ContentHash {
    /// Parse an identity from `"algorithm:hex_digest"` form.
    ///
    /// Anything looser than the documented shape is refused — a malformed
    /// identity must never become a cache key. Note a second `:` lands in
    /// the digest half and fails the hex scan, so exactly one separator is
    /// accepted without a dedicated check.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (algorithm, digest) = s.split_once(':')?;

        let algorithm_ok = !algorithm.is_empty()
            && algorithm
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9'));
        let digest_ok = !digest.is_empty()
            && digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));

        (algorithm_ok && digest_ok).then(|| Self {
            full: s.to_string(),
        })
    }

    /// The algorithm portion (e.g. "sha256").
    #[must_use]
    pub fn algorithm(&self) -> &str {
        self.parts().0
    }

    /// The hex digest portion.
    #[must_use]
    pub fn hex_digest(&self) -> &str {
        self.parts().1
    }

    /// The full `"algorithm:hex_digest"` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }

    fn parts(&self) -> (&str, &str) {
        // The separator exists by construction; the fallback keeps the
        // accessors total without panicking machinery.
        self.full.split_once(':').unwrap_or((&self.full, ""))
    }
}

// Domain separation constants. Each prefix is null-terminated so that no
// prefix can extend into another's payload.

/// Domain prefix for style fingerprints (canonical option/value bytes).
pub const DOMAIN_STYLE: &[u8] = b"STYLEFIT::STYLE::V1\0";

/// Domain prefix for source-file fingerprints (raw content bytes).
pub const DOMAIN_SOURCE_FILE: &[u8] = b"STYLEFIT::SOURCE_FILE::V1\0";

/// Domain prefix for formatter identity (binary path + version output).
pub const DOMAIN_FORMATTER_IDENTITY: &[u8] = b"STYLEFIT::FORMATTER_IDENTITY::V1\0";

/// Domain prefix for reformatted-output digests.
pub const DOMAIN_REFORMATTED_OUTPUT: &[u8] = b"STYLEFIT::REFORMATTED_OUTPUT::V1\0";

/// Domain prefix for search-log artifact hashing.
pub const DOMAIN_SEARCH_LOG: &[u8] = b"STYLEFIT::SEARCH_LOG::V1\0";

/// Compute `sha256(domain || data)` as a `"sha256:<hex>"` identity.
///
/// The domain prefix must include its null terminator (all `DOMAIN_*`
/// constants in this module already do).
#[must_use]
pub fn canonical_hash(domain: &[u8], data: &[u8]) -> ContentHash {
    let digest = Sha256::new_with_prefix(domain).chain_update(data).finalize();
    ContentHash {
        full: format!("sha256:{}", hex::encode(digest)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const ALL_DOMAINS: &[&[u8]] = &[
        DOMAIN_STYLE,
        DOMAIN_SOURCE_FILE,
        DOMAIN_FORMATTER_IDENTITY,
        DOMAIN_REFORMATTED_OUTPUT,
        DOMAIN_SEARCH_LOG,
    ];

    #[test]
    fn domain_prefixes_are_self_delimiting() {
        // The null terminator makes every prefix self-delimiting: were one
        // prefix an extension of another, crafted payload bytes could make
        // two roles hash the same stream.
        for (i, a) in ALL_DOMAINS.iter().enumerate() {
            assert_eq!(a.last(), Some(&0), "domain prefix missing terminator");
            for (j, b) in ALL_DOMAINS.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a), "one domain prefix extends another");
                }
            }
        }
    }

    #[test]
    fn same_payload_never_aliases_across_domains() {
        // A style's canonical bytes, a source file, and a reformatted
        // output may all carry identical content; their cache identities
        // must still be pairwise distinct.
        let payload = br#"{"indent_width":2}"#;
        let mut distinct = BTreeSet::new();
        for domain in ALL_DOMAINS {
            assert!(
                distinct.insert(canonical_hash(domain, payload)),
                "two domains produced the same identity for one payload"
            );
        }
        assert_eq!(distinct.len(), ALL_DOMAINS.len());
    }

    #[test]
    fn fingerprints_are_stable_cache_keys() {
        let first = canonical_hash(DOMAIN_STYLE, br#"{"use_tabs":true}"#);
        let again = canonical_hash(DOMAIN_STYLE, br#"{"use_tabs":true}"#);
        assert_eq!(first, again, "equal inputs must be interchangeable keys");
        assert_ne!(
            first,
            canonical_hash(DOMAIN_STYLE, br#"{"use_tabs":false}"#),
            "distinct style bytes must produce distinct keys"
        );
    }

    #[test]
    fn produced_fingerprints_round_trip_through_parse() {
        let fingerprint = canonical_hash(DOMAIN_SOURCE_FILE, b"int main() {}\n");
        assert_eq!(fingerprint.algorithm(), "sha256");
        assert_eq!(fingerprint.hex_digest().len(), 64, "SHA-256 is 64 hex chars");
        assert!(
            fingerprint
                .hex_digest()
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')),
            "digest must be lowercase hex"
        );
        assert_eq!(
            ContentHash::parse(fingerprint.as_str()),
            Some(fingerprint),
            "every produced identity must survive its own validation"
        );
    }

    #[test]
    fn parse_accepts_well_formed_identities() {
        let h = ContentHash::parse("sha256:00ff9a").unwrap();
        assert_eq!(h.algorithm(), "sha256");
        assert_eq!(h.hex_digest(), "00ff9a");
        assert_eq!(h.as_str(), "sha256:00ff9a");
    }

    #[test]
    fn parse_rejects_malformed_identities() {
        let rejected = [
            "deadbeef",         // no separator
            ":deadbeef",        // empty algorithm
            "sha256:",          // empty digest
            "sha256:dead:beef", // second separator lands in the digest scan
            "SHA256:deadbeef",  // uppercase algorithm
            "sha256:DEADBEEF",  // uppercase digest
            "sha256:wxyz",      // non-hex digest
            "sha-256:deadbeef", // punctuation in the algorithm name
            "sha256",           // digest missing entirely
        ];
        for input in rejected {
            assert!(
                ContentHash::parse(input).is_none(),
                "must reject {input:?}"
            );
        }
    }
}
