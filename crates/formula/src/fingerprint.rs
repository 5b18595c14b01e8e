use sha2::{Digest, Sha256};

/// Stable cache key for a formula
///
/// All whitespace is removed before hashing, so formulas that differ only
/// in spacing share a fingerprint. Lowercase hex SHA-256.
pub fn fingerprint(expression: &str) -> String {
    let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    let mut hasher = Sha256::new();
    hasher.update(compact.as_bytes());
    hex::encode(hasher.finalize())
}
