//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest username accepted as a completion record key.
pub const MAX_USERNAME_LEN: usize = 64;

/// Validates that a username is non-blank, at most [`MAX_USERNAME_LEN`] characters
/// and free of control characters.
///
/// # Examples
///
/// ```ignore
/// validate_username("alice")    // Ok
/// validate_username("   ")      // Err - blank
/// validate_username("a\u{7}b")  // Err - control character
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        let mut err = ValidationError::new("username_blank");
        err.message = Some("Username must not be blank".into());
        return Err(err);
    }

    let len = username.chars().count();
    if len > MAX_USERNAME_LEN {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!("Username must be at most {MAX_USERNAME_LEN} characters (got {len})").into(),
        );
        return Err(err);
    }

    if username.chars().any(char::is_control) {
        let mut err = ValidationError::new("username_format");
        err.message = Some("Username must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("Jane Doe").is_ok());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN)).is_ok());
    }

    #[test]
    fn test_validate_username_invalid_length() {
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_username_invalid_format() {
        assert!(validate_username("a\nb").is_err());
        assert!(validate_username("tab\there").is_err());
    }
}
