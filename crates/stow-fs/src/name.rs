//! File and folder name validation

use crate::{FsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated file or folder name.
///
/// Allowed characters: alphanumeric, hyphen, underscore, and dot.
/// Length must be between 1 and 255 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Validate `s` as a name.
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.is_empty() || s.len() > 255 {
            return Err(FsError::InvalidName("invalid length".to_owned()));
        }
        if let Some(ch) = s.chars().find(|ch| !is_allowed(*ch)) {
            return Err(FsError::InvalidName(format!("invalid character: '{ch}'")));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a value read back from the store, where the insert already
    /// enforced validity.
    pub(crate) fn from_stored(s: String) -> Self {
        Self(s)
    }
}

fn is_allowed(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Name {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Name {
    type Error = FsError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(Name::parse("").is_err());
        assert!(Name::parse("a".repeat(256)).is_err());
        assert!(Name::parse("a".repeat(255)).is_ok());
    }

    #[test]
    fn rejects_outside_charset() {
        for s in ["a b", "a/b", "a\\b", "naïve", "tab\there", "a\n"] {
            assert!(Name::parse(s).is_err(), "{s:?} should be rejected");
        }
    }

    #[test]
    fn accepts_typical_names() {
        for s in ["hello.txt", "src", "a", "x-1_2.tar.gz", "..", "READ_ME"] {
            assert!(Name::parse(s).is_ok(), "{s:?} should be accepted");
        }
    }

    #[test]
    fn deserializes_through_validation() {
        assert!(serde_json::from_str::<Name>(r#""hello.txt""#).is_ok());
        assert!(serde_json::from_str::<Name>(r#""not/ok""#).is_err());
    }

    proptest! {
        #[test]
        fn parse_display_roundtrip(s in "[A-Za-z0-9._-]{1,255}") {
            let name = Name::parse(s.as_str()).unwrap();
            let again = Name::parse(name.to_string()).unwrap();
            prop_assert_eq!(again.as_str(), s.as_str());
        }

        #[test]
        fn any_disallowed_char_rejects(s in "[A-Za-z0-9._-]{0,10}[^A-Za-z0-9._-][A-Za-z0-9._-]{0,10}") {
            prop_assert!(Name::parse(s).is_err());
        }
    }
}
