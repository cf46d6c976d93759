//! Input validation for user-provided strings.
//!
//! Pure functions; the server validates before mutating and the UI validates
//! before issuing a request.

use crate::error::ValidationError;

/// Maximum alias length in characters.
pub const MAX_ALIAS_LEN: usize = 24;
/// Maximum card content length in characters.
pub const MAX_CONTENT_LEN: usize = 500;
/// Maximum board name length in characters.
pub const MAX_BOARD_NAME_LEN: usize = 80;
/// Maximum column name length in characters.
pub const MAX_COLUMN_NAME_LEN: usize = 40;

/// Validate a participant alias.
pub fn validate_alias(alias: &str) -> Result<(), ValidationError> {
    let trimmed = alias.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_ALIAS_LEN {
        return Err(ValidationError::AliasLength { max: MAX_ALIAS_LEN });
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '_' || c == '-')
    {
        return Err(ValidationError::AliasCharset);
    }
    Ok(())
}

/// Validate card content.
pub fn validate_card_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::ContentEmpty);
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(ValidationError::ContentLength {
            max: MAX_CONTENT_LEN,
        });
    }
    Ok(())
}

/// Validate a board name.
pub fn validate_board_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::BoardNameEmpty);
    }
    if name.chars().count() > MAX_BOARD_NAME_LEN {
        return Err(ValidationError::BoardNameLength {
            max: MAX_BOARD_NAME_LEN,
        });
    }
    Ok(())
}

/// Validate a column name.
pub fn validate_column_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::ColumnNameEmpty);
    }
    if name.chars().count() > MAX_COLUMN_NAME_LEN {
        return Err(ValidationError::ColumnNameLength {
            max: MAX_COLUMN_NAME_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_aliases() {
        assert!(validate_alias("Alice").is_ok());
        assert!(validate_alias("dev_42").is_ok());
        assert!(validate_alias("Mary Jane").is_ok());
        assert!(validate_alias("  padded  ").is_ok());
    }

    #[test]
    fn invalid_aliases() {
        assert_eq!(
            validate_alias(""),
            Err(ValidationError::AliasLength { max: MAX_ALIAS_LEN })
        );
        assert_eq!(
            validate_alias("   "),
            Err(ValidationError::AliasLength { max: MAX_ALIAS_LEN })
        );
        assert_eq!(
            validate_alias(&"x".repeat(MAX_ALIAS_LEN + 1)),
            Err(ValidationError::AliasLength { max: MAX_ALIAS_LEN })
        );
        assert_eq!(validate_alias("a<script>"), Err(ValidationError::AliasCharset));
    }

    #[test]
    fn content_bounds() {
        assert!(validate_card_content("Retro went well").is_ok());
        assert_eq!(
            validate_card_content("   "),
            Err(ValidationError::ContentEmpty)
        );
        assert!(validate_card_content(&"x".repeat(MAX_CONTENT_LEN)).is_ok());
        assert_eq!(
            validate_card_content(&"x".repeat(MAX_CONTENT_LEN + 1)),
            Err(ValidationError::ContentLength {
                max: MAX_CONTENT_LEN
            })
        );
    }

    #[test]
    fn board_and_column_names() {
        assert!(validate_board_name("Sprint 14 Retro").is_ok());
        assert_eq!(
            validate_board_name(""),
            Err(ValidationError::BoardNameEmpty)
        );
        assert!(validate_column_name("What went well").is_ok());
        assert_eq!(
            validate_column_name(&"c".repeat(MAX_COLUMN_NAME_LEN + 1)),
            Err(ValidationError::ColumnNameLength {
                max: MAX_COLUMN_NAME_LEN
            })
        );
    }
}
