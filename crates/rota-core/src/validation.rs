//! Input validation helpers
//!
//! Request bodies are checked with `validator` derives in the API layer; the
//! rules they share with the CLI live here.

use anyhow::Result;

/// Shortest invitation lifetime a caller may request
pub const MIN_EXPIRY_DAYS: i64 = 1;

/// Longest invitation lifetime a caller may request
pub const MAX_EXPIRY_DAYS: i64 = 30;

/// Maximum length of an invitation's personal message
pub const MAX_MESSAGE_LENGTH: usize = 1000;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const MAX_COMPANY_NAME_LENGTH: usize = 200;

/// Canonical form used for every stored and compared email: trimmed, lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_expiry_days(days: i64) -> Result<()> {
    if !(MIN_EXPIRY_DAYS..=MAX_EXPIRY_DAYS).contains(&days) {
        return Err(anyhow::anyhow!(
            "Expiry must be between {} and {} days, got {}",
            MIN_EXPIRY_DAYS,
            MAX_EXPIRY_DAYS,
            days
        ));
    }
    Ok(())
}

pub fn validate_message(message: Option<&str>) -> Result<()> {
    if let Some(message) = message {
        let len = message.chars().count();
        if len > MAX_MESSAGE_LENGTH {
            return Err(anyhow::anyhow!(
                "Message exceeds maximum length of {} characters",
                MAX_MESSAGE_LENGTH
            ));
        }
    }
    Ok(())
}

pub fn validate_company_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(anyhow::anyhow!("Company name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_COMPANY_NAME_LENGTH {
        return Err(anyhow::anyhow!(
            "Company name exceeds maximum length of {} characters",
            MAX_COMPANY_NAME_LENGTH
        ));
    }
    Ok(())
}

/// Turn an empty or whitespace-only message into `None`.
pub fn clean_message(message: Option<String>) -> Option<String> {
    message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Bob@Co.COM "), "bob@co.com");
        assert_eq!(normalize_email("ann@co.com"), "ann@co.com");
    }

    #[test]
    fn test_expiry_days_bounds() {
        assert!(validate_expiry_days(1).is_ok());
        assert!(validate_expiry_days(7).is_ok());
        assert!(validate_expiry_days(30).is_ok());
        assert!(validate_expiry_days(0).is_err());
        assert!(validate_expiry_days(31).is_err());
        assert!(validate_expiry_days(-3).is_err());
    }

    #[test]
    fn test_message_length() {
        assert!(validate_message(None).is_ok());
        assert!(validate_message(Some(&"a".repeat(1000))).is_ok());
        assert!(validate_message(Some(&"a".repeat(1001))).is_err());
    }

    #[test]
    fn test_company_name() {
        assert!(validate_company_name("Acme").is_ok());
        assert!(validate_company_name("   ").is_err());
        assert!(validate_company_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_clean_message() {
        assert_eq!(clean_message(Some("  hi ".into())), Some("hi".to_string()));
        assert_eq!(clean_message(Some("   ".into())), None);
        assert_eq!(clean_message(None), None);
    }
}
