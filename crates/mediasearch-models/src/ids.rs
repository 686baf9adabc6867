//! Typed identifiers, following the teacher crate's `JobId` newtype pattern.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! int_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(v: i64) -> Self {
                Self(v)
            }

            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }
    };
}

int_id!(AssetId);
int_id!(VideoSceneId);
int_id!(AiModelId);

/// Library identifier — the URL-safe slug itself, not a surrogate key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibrarySlug(pub String);

impl LibrarySlug {
    /// Validate a candidate slug: lowercase ascii alphanumerics and hyphens,
    /// non-empty, no leading/trailing hyphen.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidSlug> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > 128 {
            return Err(InvalidSlug(raw));
        }
        let valid = raw
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid || raw.starts_with('-') || raw.ends_with('-') {
            return Err(InvalidSlug(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LibrarySlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid library slug: {0:?} (expected lowercase alphanumerics and hyphens)")]
pub struct InvalidSlug(pub String);

/// Stable worker identifier: `<role>-<hostname>-<short-random>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub String);

impl WorkerId {
    pub fn new(role: &str, hostname: &str, suffix: &str) -> Self {
        Self(format!("{role}-{hostname}-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_rejects_uppercase_and_leading_hyphen() {
        assert!(LibrarySlug::parse("Vacation-2024").is_err());
        assert!(LibrarySlug::parse("-vacation").is_err());
        assert!(LibrarySlug::parse("vacation-").is_err());
        assert!(LibrarySlug::parse("").is_err());
        assert!(LibrarySlug::parse("vacation-2024").is_ok());
    }

    #[test]
    fn worker_id_format() {
        let id = WorkerId::new("scanner", "host01", "a1b2c3");
        assert_eq!(id.as_str(), "scanner-host01-a1b2c3");
    }
}
