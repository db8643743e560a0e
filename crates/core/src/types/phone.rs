//! Canonical phone key.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CanonicalPhone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input contains no characters at all.
    #[error("phone number is required")]
    Empty,
    /// The input has fewer digits than a full number.
    #[error("phone number must contain at least {min} digits (got {actual})")]
    TooFewDigits {
        /// Minimum number of digits.
        min: usize,
        /// Digits found in the input.
        actual: usize,
    },
}

/// The last ten digits of a phone number, used as lookup and storage key.
///
/// Any formatting (country code, spaces, brackets, dashes) is discarded, so
/// `+7 (999) 123-45-67` and `89991234567` map to the same guest.
///
/// ## Examples
///
/// ```
/// use loyalty_core::CanonicalPhone;
///
/// let phone = CanonicalPhone::parse("+7 (999) 123-45-67").unwrap();
/// assert_eq!(phone.as_str(), "9991234567");
///
/// assert!(CanonicalPhone::parse("12-34").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CanonicalPhone(String);

impl CanonicalPhone {
    /// Number of digits kept in the canonical key.
    pub const DIGITS: usize = 10;

    /// Parse a canonical phone key from free-form input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank or has fewer than ten digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        if s.trim().is_empty() {
            return Err(PhoneError::Empty);
        }

        let digits: Vec<char> = s.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < Self::DIGITS {
            return Err(PhoneError::TooFewDigits {
                min: Self::DIGITS,
                actual: digits.len(),
            });
        }

        let tail = digits.len() - Self::DIGITS;
        Ok(Self(digits.into_iter().skip(tail).collect()))
    }

    /// Returns the canonical key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPhone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CanonicalPhone {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CanonicalPhone {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
