//! SHA-256 digests used to derive replacement values.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `input` (64 characters)
pub fn digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest of `key + "_" + value`
pub fn keyed_digest(key: &str, value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(b"_");
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// First 16 hex characters of a digest read as an unsigned integer
pub fn leading_u64(hex_digest: &str) -> u64 {
    let prefix = hex_digest.get(..16).unwrap_or(hex_digest);
    u64::from_str_radix(prefix, 16).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_known_vectors() {
        assert_eq!(
            digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            digest("s_alice"),
            "5a4427a7cbdbfb7d5d269c98652f8a7cf0d757e187c669252e83167d6e27abec"
        );
    }

    #[test]
    fn test_keyed_digest_joins_with_underscore() {
        assert_eq!(keyed_digest("s", "alice"), digest("s_alice"));
        assert_eq!(keyed_digest("k", "42").len(), 64);
        assert_ne!(keyed_digest("s", "alice"), keyed_digest("t", "alice"));
    }

    #[test]
    fn test_leading_u64() {
        assert_eq!(leading_u64("00000000000000ff00"), 255);
        assert_eq!(leading_u64(&digest("s_100")) % 100, 50);
        assert_eq!(leading_u64("zz"), 0);
    }
}
