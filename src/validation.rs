//! Input validation for values sent to Pipedrive.
use once_cell::sync::Lazy;
use regex::Regex;

// Simplified RFC 5322: local@label(.label)+
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("email regex is valid")
});

/// Validate an email address.
///
/// Checks for:
/// - No surrounding whitespace
/// - A local part and a dotted domain
/// - Local part no longer than 64 characters
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || email.len() > 254 || email.trim() != email {
        return false;
    }

    match email.split_once('@') {
        Some((local, _)) if local.len() > 64 => {
            tracing::debug!("Email local part too long: {}", email);
            return false;
        }
        None => return false,
        _ => {}
    }

    EMAIL_REGEX.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("test.user+tag@subdomain.example.co.uk"));
        assert!(is_valid_email("x@example.com"));
        assert!(is_valid_email("valid_email-2023@company.org"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("not_an_email"));
        assert!(!is_valid_email("missing@domain"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user @example.com"));
        assert!(!is_valid_email(" user@example.com"));
        assert!(!is_valid_email("user@exam ple.com"));
        assert!(!is_valid_email("user@-example.com"));
    }

    #[test]
    fn test_local_part_length() {
        let local = "a".repeat(65);
        assert!(!is_valid_email(&format!("{}@example.com", local)));
        let local = "a".repeat(64);
        assert!(is_valid_email(&format!("{}@example.com", local)));
    }
}
