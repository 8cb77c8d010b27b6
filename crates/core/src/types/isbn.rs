//! ISBN type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Isbn`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IsbnError {
    /// The input string is empty.
    #[error("isbn cannot be empty")]
    Empty,
    /// The input string does not have the fixed length.
    #[error("isbn must be exactly {expected} characters, got {actual}")]
    WrongLength {
        /// Required length.
        expected: usize,
        /// Length of the rejected input.
        actual: usize,
    },
}

/// A book's ISBN in its hyphenated 14-character form (e.g. `978-0132350884`).
///
/// Only the length is enforced. The value is stored verbatim and compared
/// byte-for-byte, so `978-0132350884` and `9780132350884-` are different ISBNs.
///
/// ## Examples
///
/// ```
/// use bookstore_core::Isbn;
///
/// assert!(Isbn::parse("978-0132350884").is_ok());
///
/// assert!(Isbn::parse("").is_err());
/// assert!(Isbn::parse("9780132350884").is_err()); // 13 characters
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    /// Required length of an ISBN, in characters.
    pub const LENGTH: usize = 14;

    /// Parse an `Isbn` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or is not exactly
    /// [`Isbn::LENGTH`] characters long.
    pub fn parse(s: &str) -> Result<Self, IsbnError> {
        if s.is_empty() {
            return Err(IsbnError::Empty);
        }

        let actual = s.chars().count();
        if actual != Self::LENGTH {
            return Err(IsbnError::WrongLength {
                expected: Self::LENGTH,
                actual,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the ISBN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Isbn` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Isbn {
    type Err = IsbnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Isbn {
    type Error = IsbnError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Isbn {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Isbn {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Isbn {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_isbns() {
        assert!(Isbn::parse("978-0132350884").is_ok());
        assert!(Isbn::parse("979-1234567890").is_ok());
        assert!(Isbn::parse("00000000000000").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Isbn::parse(""), Err(IsbnError::Empty));
    }

    #[test]
    fn test_parse_wrong_length() {
        assert_eq!(
            Isbn::parse("9780132350884"),
            Err(IsbnError::WrongLength {
                expected: 14,
                actual: 13
            })
        );
        assert!(matches!(
            Isbn::parse("978-01323508845"),
            Err(IsbnError::WrongLength { actual: 15, .. })
        ));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 14 characters, more than 14 bytes
        assert!(Isbn::parse("ißbn-123456789").is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<Isbn, _> = serde_json::from_str("\"978-0132350884\"");
        assert!(ok.is_ok());

        let bad: Result<Isbn, _> = serde_json::from_str("\"978\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_display_and_as_str() {
        let isbn = Isbn::parse("978-0132350884").unwrap();
        assert_eq!(isbn.to_string(), "978-0132350884");
        assert_eq!(isbn.as_str(), "978-0132350884");
    }
}
