//! Key name validation.
//!
//! The backend stores each key as a column name in a table row, which
//! restricts keys to identifiers: non-empty, not starting with a digit,
//! and made only of ASCII letters, ASCII digits and underscores.

use thiserror::Error;

/// Why a key was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidKeyReason {
    /// The key is the empty string.
    #[error("key is empty")]
    Empty,

    /// The first character is a digit.
    #[error("key cannot start with a digit")]
    StartsWithDigit,

    /// The key contains a character other than an ASCII letter, ASCII
    /// digit or `_`.
    #[error("key contains illegal character {0:?}")]
    IllegalCharacter(char),
}

/// Checks that `key` is acceptable to the backend.
pub fn validate_key(key: &str) -> Result<(), InvalidKeyReason> {
    let mut chars = key.chars();
    let first = chars.next().ok_or(InvalidKeyReason::Empty)?;

    if first.is_ascii_digit() {
        return Err(InvalidKeyReason::StartsWithDigit);
    }

    match std::iter::once(first)
        .chain(chars)
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_')
    {
        Some(c) => Err(InvalidKeyReason::IllegalCharacter(c)),
        None => Ok(()),
    }
}

/// Returns true if `key` passes [`validate_key`].
pub fn is_valid_key(key: &str) -> bool {
    validate_key(key).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_identifiers() {
        for key in ["Coins", "PlayerLevel", "_hidden", "a1", "Level_2_Stars"] {
            assert_eq!(validate_key(key), Ok(()), "{key}");
        }
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(validate_key(""), Err(InvalidKeyReason::Empty));
    }

    #[test]
    fn rejects_leading_digit() {
        assert_eq!(validate_key("1st"), Err(InvalidKeyReason::StartsWithDigit));
        assert_eq!(validate_key("9"), Err(InvalidKeyReason::StartsWithDigit));
    }

    #[test]
    fn rejects_illegal_characters() {
        assert_eq!(
            validate_key("high-score"),
            Err(InvalidKeyReason::IllegalCharacter('-'))
        );
        assert_eq!(
            validate_key("high score"),
            Err(InvalidKeyReason::IllegalCharacter(' '))
        );
        assert_eq!(
            validate_key("odata.etag"),
            Err(InvalidKeyReason::IllegalCharacter('.'))
        );
        assert!(!is_valid_key("-"));
    }

    #[test]
    fn rejects_non_ascii_letters_and_numbers() {
        assert_eq!(validate_key("a²"), Err(InvalidKeyReason::IllegalCharacter('²')));
        assert_eq!(validate_key("aⅫ"), Err(InvalidKeyReason::IllegalCharacter('Ⅻ')));
        assert_eq!(validate_key("x½"), Err(InvalidKeyReason::IllegalCharacter('½')));
        assert_eq!(validate_key("Über"), Err(InvalidKeyReason::IllegalCharacter('Ü')));
        assert_eq!(validate_key("²x"), Err(InvalidKeyReason::IllegalCharacter('²')));
        assert_eq!(validate_key("٣x"), Err(InvalidKeyReason::IllegalCharacter('٣')));
    }

    #[test]
    fn reason_display() {
        assert_eq!(InvalidKeyReason::Empty.to_string(), "key is empty");
        assert!(InvalidKeyReason::IllegalCharacter('$')
            .to_string()
            .contains('$'));
    }
}
