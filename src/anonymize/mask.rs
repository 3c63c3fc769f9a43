//! Masking transforms: the output keeps the shape of the input.

use super::digest::leading_u64;

pub fn username(digest: &str) -> String {
    format!("user_{}", &digest[..8])
}

pub fn category(digest: &str) -> String {
    format!("masked_{}", &digest[..6])
}

/// Shift `original` by up to `percent` of itself, in 1% steps chosen by the digest
pub fn numeric_noise(original: f64, digest: &str, percent: u32) -> f64 {
    let factor = (leading_u64(digest) % 100) as f64 / 100.0;
    let noise = factor * (f64::from(percent) / 100.0) * original;
    original + noise
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymize::digest::keyed_digest;

    #[test]
    fn test_username_from_digest() {
        assert_eq!(username(&keyed_digest("s", "alice")), "user_5a4427a7");
    }

    #[test]
    fn test_category_prefix() {
        let masked = category(&keyed_digest("s", "gold"));
        assert_eq!(masked, "masked_dc3369");
    }

    #[test]
    fn test_numeric_noise_bounds() {
        let digest = keyed_digest("s", "100");
        assert_eq!(numeric_noise(100.0, &digest, 10), 105.0);
        assert_eq!(numeric_noise(100.0, &digest, 0), 100.0);
        assert_eq!(numeric_noise(-100.0, &digest, 10), -105.0);
    }
}
