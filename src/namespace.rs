//! Deterministic cache namespace derivation.
//!
//! A namespace partitions the vector index per source document. It doubles as the
//! ingestion-cache key: an existence probe against the namespace decides whether a
//! document must be re-ingested. Derivation is a pure function of the source URL,
//! stable across restarts.

use sha2::{Digest, Sha256};

/// Tag prepended to every derived namespace.
const NAMESPACE_PREFIX: &str = "pdf-";

/// Hex characters of the digest kept in the namespace.
///
/// Compatibility-sensitive: changing this constant (or the hash algorithm) changes
/// every derived namespace and orphans all previously indexed documents.
const NAMESPACE_DIGEST_CHARS: usize = 12;

/// Derive the cache namespace for a document source URL.
///
/// Identical sources always map to the same namespace; distinct sources collide with
/// negligible probability (48 bits of a SHA-256 digest). Any string input is valid.
pub fn derive_namespace(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{NAMESPACE_PREFIX}{}", &digest[..NAMESPACE_DIGEST_CHARS])
}
