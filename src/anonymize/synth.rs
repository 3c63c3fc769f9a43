//! Synthetic replacements with fixed formats.

pub fn email(digest: &str, domain: &str) -> String {
    format!("user{}@{}", &digest[..6], domain)
}

/// Looks like a bcrypt hash but is not a verifiable one
pub fn password_hash(digest: &str) -> String {
    format!("$2b$10${}...{}", &digest[..22], &digest[22..31])
}

pub fn address(digest: &str) -> String {
    format!("{} Fake St, Test City, TC 12345", &digest[..8])
}

pub fn credit_card(digest: &str) -> String {
    format!("XXXX-XXXX-XXXX-{}", &digest[..4])
}
