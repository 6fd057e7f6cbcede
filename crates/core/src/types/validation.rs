//! Validated user input: display names, passwords, review ratings and titles.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors raised by the input types in this module.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must be at most {max} characters")]
    NameTooLong { max: usize },
    #[error("name may only contain letters and spaces")]
    NameInvalidCharacters,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("password must contain a letter, a digit and one of @$!%*#?&")]
    PasswordTooWeak,
    #[error("rating must be between {min} and {max}")]
    RatingOutOfRange { min: i16, max: i16 },
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
}

/// A customer display name. Empty is allowed; otherwise ASCII letters and
/// spaces only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    pub const MAX_LENGTH: usize = 100;

    /// # Errors
    ///
    /// Returns an error if the trimmed name is too long or contains anything
    /// other than ASCII letters and spaces.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(ValidationError::NameTooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
            return Err(ValidationError::NameInvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `None` for an empty name, which is how it is stored.
    #[must_use]
    pub fn into_option(self) -> Option<String> {
        (!self.0.is_empty()).then_some(self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Characters that count toward the "special character" requirement.
pub const PASSWORD_SPECIAL_CHARS: &str = "@$!%*#?&";

/// A plaintext password that satisfies the account password policy.
///
/// Never serialized and redacted in `Debug`. Only lives long enough to be
/// hashed or verified.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub const MIN_LENGTH: usize = 8;

    /// # Errors
    ///
    /// Returns an error if the password is shorter than 8 characters or lacks
    /// a letter, a digit or a special character from `@$!%*#?&`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if s.chars().count() < Self::MIN_LENGTH {
            return Err(ValidationError::PasswordTooShort {
                min: Self::MIN_LENGTH,
            });
        }
        let has_letter = s.chars().any(|c| c.is_ascii_alphabetic());
        let has_digit = s.chars().any(|c| c.is_ascii_digit());
        let has_special = s.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c));
        if !(has_letter && has_digit && has_special) {
            return Err(ValidationError::PasswordTooWeak);
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// A review star rating, 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct Rating(i16);

impl Rating {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;

    /// # Errors
    ///
    /// Returns an error if `value` is outside `1..=5`.
    pub const fn new(value: i16) -> Result<Self, ValidationError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(ValidationError::RatingOutOfRange {
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn value(self) -> i16 {
        self.0
    }
}

impl TryFrom<i16> for Rating {
    type Error = ValidationError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// An optional review headline of at most 30 characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewTitle(String);

impl ReviewTitle {
    pub const MAX_LENGTH: usize = 30;

    /// # Errors
    ///
    /// Returns an error if the trimmed title is longer than 30 characters.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(ValidationError::TitleTooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_option(self) -> Option<String> {
        (!self.0.is_empty()).then_some(self.0)
    }
}
