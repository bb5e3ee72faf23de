//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneError {
    /// The input contains no digits at all.
    #[error("phone number cannot be empty")]
    Empty,
    /// The digit count is outside the accepted range.
    #[error("phone number must be {min}-{max} digits, got {got}")]
    WrongLength {
        /// Minimum accepted digits.
        min: usize,
        /// Maximum accepted digits.
        max: usize,
        /// Digits found in the input.
        got: usize,
    },
}

/// A phone number, stored as its bare digit string.
///
/// Separators, parentheses, and a leading `+` are accepted on input and
/// stripped; what remains must be 10 to 15 digits (loose E.164 envelope,
/// which is all the order endpoint checks).
///
/// ## Examples
///
/// ```
/// use fernmart_core::Phone;
///
/// let phone = Phone::parse("+1 (555) 010-9922").unwrap();
/// assert_eq!(phone.digits(), "15550109922");
///
/// assert!(Phone::parse("12345").is_err()); // too short
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum digit count.
    pub const MIN_DIGITS: usize = 10;
    /// Maximum digit count.
    pub const MAX_DIGITS: usize = 15;

    /// Parse a `Phone` from a string, stripping non-digit characters.
    ///
    /// # Errors
    ///
    /// Returns an error if the input has no digits or the wrong number of
    /// them.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();

        if digits.is_empty() {
            return Err(PhoneError::Empty);
        }

        let count = digits.len();
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&count) {
            return Err(PhoneError::WrongLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
                got: count,
            });
        }

        Ok(Self(digits))
    }

    /// Returns the bare digit string.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its digit string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_digits() {
        let phone = Phone::parse("0244123456").unwrap();
        assert_eq!(phone.digits(), "0244123456");
    }

    #[test]
    fn test_parse_strips_separators() {
        let phone = Phone::parse("+233 (24) 412-3456").unwrap();
        assert_eq!(phone.digits(), "233244123456");
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(Phone::parse(""), Err(PhoneError::Empty)));
        assert!(matches!(Phone::parse("ext."), Err(PhoneError::Empty)));
    }

    #[test]
    fn test_parse_too_short() {
        assert!(matches!(
            Phone::parse("123456789"),
            Err(PhoneError::WrongLength { got: 9, .. })
        ));
    }

    #[test]
    fn test_parse_too_long() {
        assert!(matches!(
            Phone::parse("1234567890123456"),
            Err(PhoneError::WrongLength { got: 16, .. })
        ));
    }

    #[test]
    fn test_boundaries() {
        assert!(Phone::parse(&"1".repeat(10)).is_ok());
        assert!(Phone::parse(&"1".repeat(15)).is_ok());
    }

    #[test]
    fn test_serde() {
        let phone = Phone::parse("0244123456").unwrap();
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"0244123456\"");
    }
}
