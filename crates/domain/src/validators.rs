use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// A fully qualified, dot-terminated DNS name of valid label shape.
pub fn is_valid_fqdn(name: &str) -> bool {
    if !name.ends_with('.') || name.len() > 255 {
        return false;
    }
    if name == "." {
        return true;
    }
    name.trim_end_matches('.').split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}

/// Normalise a zone name to lowercase FQDN form, or reject it.
pub fn normalize_zone_name(name: &str) -> Result<String, String> {
    let mut normalized = name.trim().to_ascii_lowercase();
    if !normalized.ends_with('.') {
        normalized.push('.');
    }
    if !is_valid_fqdn(&normalized) {
        return Err(format!("'{}' is not a valid zone name", name));
    }
    Ok(normalized)
}

pub fn validate_tsig_secret(secret: &str) -> Result<(), String> {
    if secret.is_empty() {
        return Err("TSIG secret cannot be empty".to_string());
    }
    BASE64
        .decode(secret.as_bytes())
        .map(|_| ())
        .map_err(|_| "TSIG secret is not valid base64".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqdn_requires_trailing_dot() {
        assert!(is_valid_fqdn("example.com."));
        assert!(!is_valid_fqdn("example.com"));
        assert!(is_valid_fqdn("."));
    }

    #[test]
    fn fqdn_rejects_bad_labels() {
        assert!(!is_valid_fqdn("-bad.example.com."));
        assert!(!is_valid_fqdn("exa mple.com."));
        assert!(!is_valid_fqdn(&format!("{}.com.", "a".repeat(64))));
    }

    #[test]
    fn normalize_appends_dot_and_lowercases() {
        assert_eq!(normalize_zone_name("Example.COM").unwrap(), "example.com.");
        assert!(normalize_zone_name("bad name").is_err());
    }

    #[test]
    fn tsig_secret_must_be_base64() {
        assert!(validate_tsig_secret("dGVzdC1zZWNyZXQ=").is_ok());
        assert!(validate_tsig_secret("!!!").is_err());
        assert!(validate_tsig_secret("").is_err());
    }
}
