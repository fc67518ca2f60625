//! Small validated value types shared across the care-plan crates.

/// Maximum number of characters accepted for a single piece of user text (goal or answer).
pub const MAX_TEXT_CHARS: usize = 4_000;

/// Reject text longer than [`MAX_TEXT_CHARS`] characters. Blank text is allowed.
///
/// # Errors
///
/// Returns `TextError::TooLong` with the actual character count.
pub fn check_len(input: &str) -> Result<(), TextError> {
    let chars = input.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(TextError::TooLong {
            max: MAX_TEXT_CHARS,
            actual: chars,
        });
    }
    Ok(())
}

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input text exceeded [`MAX_TEXT_CHARS`]
    #[error("Text exceeds maximum length of {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },
}

/// A string type that guarantees non-empty, bounded content.
///
/// The input is trimmed of leading and trailing whitespace during construction. Used for the
/// free-form health goal that opens a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty, or `TextError::TooLong` if it
    /// has more than [`MAX_TEXT_CHARS`] characters.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        check_len(trimmed)?;
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let text = NonEmptyText::new("  manage breast cancer \n").unwrap();
        assert_eq!(text.as_str(), "manage breast cancer");
    }

    #[test]
    fn rejects_blank_input() {
        assert_eq!(NonEmptyText::new("   ").unwrap_err(), TextError::Empty);
        assert_eq!(NonEmptyText::new("").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn rejects_overlong_input() {
        let long = "a".repeat(MAX_TEXT_CHARS + 1);
        assert_eq!(
            NonEmptyText::new(long).unwrap_err(),
            TextError::TooLong {
                max: MAX_TEXT_CHARS,
                actual: MAX_TEXT_CHARS + 1
            }
        );
    }

    #[test]
    fn length_check_allows_blank_and_limit() {
        assert_eq!(check_len(""), Ok(()));
        assert_eq!(check_len(&"a".repeat(MAX_TEXT_CHARS)), Ok(()));
        assert!(check_len(&"é".repeat(MAX_TEXT_CHARS + 1)).is_err());
    }

    #[test]
    fn deserialize_applies_validation() {
        let ok: NonEmptyText = serde_json::from_str("\" goal \"").unwrap();
        assert_eq!(ok.as_str(), "goal");
        assert!(serde_json::from_str::<NonEmptyText>("\"  \"").is_err());
    }
}
