//! Shared-secret admin gate.
//!
//! The whole authentication surface is one comparison against a
//! configured secret. The sync engine stores the resulting flag; it
//! performs no per-call authorization check.

/// Compare a supplied secret against the configured one. With no
/// secret configured, login always fails. The comparison scans the
/// full length rather than bailing at the first mismatched byte.
pub fn verify_secret(configured: Option<&str>, supplied: &str) -> bool {
    let expected = match configured {
        Some(s) if !s.is_empty() => s.as_bytes(),
        _ => return false,
    };
    let supplied = supplied.as_bytes();
    if expected.len() != supplied.len() {
        return false;
    }
    expected
        .iter()
        .zip(supplied)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secret() {
        assert!(verify_secret(Some("shuhada-admin"), "shuhada-admin"));
    }

    #[test]
    fn test_wrong_secret() {
        assert!(!verify_secret(Some("shuhada-admin"), "guess"));
        assert!(!verify_secret(Some("shuhada-admin"), "shuhada-admiN"));
        assert!(!verify_secret(Some("shuhada-admin"), ""));
    }

    #[test]
    fn test_no_secret_configured_always_fails() {
        assert!(!verify_secret(None, "anything"));
        assert!(!verify_secret(Some(""), ""));
    }
}
