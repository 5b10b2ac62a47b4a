//! Input validation for identifiers.
//!
//! Every dataset and field name ends up inside rendered SQL. Names are quoted by
//! the dialect renderer, and this module additionally restricts them to a safe
//! character set before planning starts.
//!
//! # Security
//!
//! Input validation prevents:
//! - SQL injection via malicious table/field names
//! - Buffer overflows via excessively long inputs

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Maximum length for identifiers in general
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

static RE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").expect("Invalid regex"));

/// Errors that can occur during input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} '{value}' must start with a letter or underscore and contain only letters, digits, underscores and hyphens")]
    InvalidCharacters { field: &'static str, value: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate an identifier (namespace, dataset or field name).
///
/// # Rules
///
/// - Must not be empty
/// - Must not exceed 255 characters
/// - Must start with a letter or underscore
/// - May contain letters, digits, underscores, and hyphens
///
/// # Examples
///
/// ```
/// use data_persistence_sdk::validation::input::validate_identifier;
///
/// assert!(validate_identifier("table name", "staging").is_ok());
/// assert!(validate_identifier("field name", "insert_ts").is_ok());
/// assert!(validate_identifier("field name", "").is_err());
/// assert!(validate_identifier("field name", "1st").is_err());
/// assert!(validate_identifier("table name", "main\"; DROP TABLE x;--").is_err());
/// ```
pub fn validate_identifier(kind: &'static str, name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Empty(kind));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            field: kind,
            max: MAX_IDENTIFIER_LENGTH,
            actual: name.len(),
        });
    }

    if !RE_IDENTIFIER.is_match(name) {
        return Err(ValidationError::InvalidCharacters {
            field: kind,
            value: name.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_long_identifier() {
        let name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(matches!(
            validate_identifier("field name", &name),
            Err(ValidationError::TooLong { actual: 256, .. })
        ));
    }

    #[test]
    fn test_hyphenated_identifier_allowed() {
        assert!(validate_identifier("namespace", "my-project").is_ok());
        assert!(validate_identifier("namespace", "my project").is_err());
    }
}
