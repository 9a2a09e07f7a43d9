//! URL-safe composition slugs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;

/// Lowercase ASCII slug made of `[a-z0-9-]`, never starting or ending with `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Validates an existing slug.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let valid = !s.is_empty()
            && !s.starts_with('-')
            && !s.ends_with('-')
            && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::InvalidSlug(s.to_string()))
        }
    }

    /// Derives a slug from a display name. Runs of anything that is not an
    /// ASCII letter or digit collapse into a single `-`. Names without any
    /// usable character become `"form"`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut out = String::with_capacity(name.len());
        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() {
                out.push(ch.to_ascii_lowercase());
            } else if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        }
        while out.ends_with('-') {
            out.pop();
        }
        if out.is_empty() {
            out.push_str("form");
        }
        Self(out)
    }

    /// Returns this slug with a numeric suffix, e.g. `contact-2`.
    #[must_use]
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}-{}", self.0, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_collapses_separators() {
        assert_eq!(Slug::from_name("Contact  Us!").as_str(), "contact-us");
        assert_eq!(Slug::from_name("--Job / Application--").as_str(), "job-application");
    }

    #[test]
    fn from_name_without_usable_chars() {
        assert_eq!(Slug::from_name("???").as_str(), "form");
        assert_eq!(Slug::from_name("").as_str(), "form");
    }

    #[test]
    fn parse_rejects_invalid() {
        assert!(Slug::parse("Contact").is_err());
        assert!(Slug::parse("-contact").is_err());
        assert!(Slug::parse("contact-").is_err());
        assert!(Slug::parse("").is_err());
        assert!(Slug::parse("a b").is_err());
        assert!(Slug::parse("contact-us-2").is_ok());
    }

    #[test]
    fn suffix() {
        let slug = Slug::from_name("Contact");
        assert_eq!(slug.with_suffix(3).as_str(), "contact-3");
    }
}
