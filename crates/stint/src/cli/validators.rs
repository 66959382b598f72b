//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time, providing immediate feedback for invalid values.

/// Maximum length of an issue title or project name.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Validate an identifier (issue, project or user).
///
/// Identifiers are opaque but must be non-empty and free of whitespace.
pub fn validate_id(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }
    if s.chars().any(char::is_whitespace) {
        return Err(format!("Identifier cannot contain whitespace: '{s}'"));
    }
    Ok(s.to_string())
}

/// Validate an issue title or project name.
pub fn validate_title(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Title cannot be empty".to_string());
    }
    if s.chars().count() > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title cannot exceed {MAX_TITLE_LENGTH} characters"
        ));
    }
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::uuid("3f2b8c1e-6a47-4d1e-9a55-0c4e5f1b2a90", true)]
    #[case::padded("  alice  ", true)]
    #[case::empty("", false)]
    #[case::blank("   ", false)]
    #[case::inner_space("bob smith", false)]
    fn test_validate_id(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(validate_id(input).is_ok(), ok);
    }

    #[test]
    fn test_validate_id_trims() {
        assert_eq!(validate_id("  alice ").unwrap(), "alice");
    }

    #[rstest]
    #[case::simple("Fix login", true)]
    #[case::blank("  ", false)]
    #[case::max_length("a".repeat(MAX_TITLE_LENGTH), true)]
    #[case::too_long("a".repeat(MAX_TITLE_LENGTH + 1), false)]
    fn test_validate_title(#[case] input: impl AsRef<str>, #[case] ok: bool) {
        assert_eq!(validate_title(input.as_ref()).is_ok(), ok);
    }
}
