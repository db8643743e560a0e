//! Password digest handling.
//!
//! The staff password is never stored; operators configure its SHA-256
//! digest and requests are checked by hashing the submitted password and
//! comparing digests in constant time.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of a SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Prefixes operators commonly paste in front of a digest.
const ALGORITHM_PREFIXES: &[&str] = &["sha-256", "sha256"];

/// The configured password digest.
///
/// `Debug` is redacted so the digest never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ExpectedHash([u8; DIGEST_LEN]);

impl ExpectedHash {
    /// Parse a digest in any form accepted by [`normalize_hash`].
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_hash(raw)?;
        let mut bytes = [0_u8; DIGEST_LEN];
        hex::decode_to_slice(normalized, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Digest of `password`.
    #[must_use]
    pub fn of_password(password: &str) -> Self {
        Self(Sha256::digest(password.as_bytes()).into())
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for ExpectedHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExpectedHash([REDACTED])")
    }
}

/// Lowercase hex SHA-256 digest of `password`.
#[must_use]
pub fn sha256_hex(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Canonicalize a hex digest.
///
/// Lowercases, drops all whitespace, strips one optional `sha256` /
/// `sha-256` prefix (with optional `:` or `=`) and then an optional `0x`.
/// Returns `None` unless exactly 64 hex characters remain.
#[must_use]
pub fn normalize_hash(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    let mut rest = compact.as_str();
    if let Some(stripped) = ALGORITHM_PREFIXES
        .iter()
        .find_map(|prefix| rest.strip_prefix(prefix))
    {
        rest = stripped.strip_prefix([':', '=']).unwrap_or(stripped);
    }
    rest = rest.strip_prefix("0x").unwrap_or(rest);

    (rest.len() == DIGEST_LEN * 2 && rest.bytes().all(|b| b.is_ascii_hexdigit()))
        .then(|| rest.to_string())
}

/// Compare a hex digest against the expected digest bytes.
///
/// Malformed candidates and length mismatches are a plain `false`. Equal
/// length inputs are compared with `subtle`, so timing does not depend on
/// where the first differing byte is.
#[must_use]
pub fn compare(candidate_hash: &str, expected: &[u8]) -> bool {
    let Some(normalized) = normalize_hash(candidate_hash) else {
        tracing::debug!("candidate password hash is malformed");
        return false;
    };

    let Ok(candidate) = hex::decode(normalized) else {
        return false;
    };

    if candidate.len() != expected.len() {
        return false;
    }

    candidate.ct_eq(expected).into()
}
