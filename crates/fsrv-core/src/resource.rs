//! Resource names
//!
//! A resource is addressed by a fixed-format token: exactly
//! [`RESOURCE_NAME_LEN`] characters drawn from `[a-zA-Z0-9_-]`.
//! The name doubles as the file name inside the storage directory, so
//! validation must happen before any filesystem access.

use std::fmt;
use std::path::{Path, PathBuf};

/// Required length of every resource name
pub const RESOURCE_NAME_LEN: usize = 27;

/// Reasons a resource name is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// Wrong number of characters
    #[error("resource name must be {RESOURCE_NAME_LEN} characters, got {0}")]
    Length(usize),

    /// Character outside `[a-zA-Z0-9_-]`
    #[error("invalid character {0:?} in resource name")]
    Charset(char),
}

/// A validated resource name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName(String);

impl ResourceName {
    /// Validate `raw` and wrap it.
    pub fn parse(raw: &str) -> Result<Self, ResourceError> {
        let len = raw.chars().count();
        if len != RESOURCE_NAME_LEN {
            return Err(ResourceError::Length(len));
        }
        if let Some(bad) = raw.chars().find(|&c| !is_name_char(c)) {
            return Err(ResourceError::Charset(bad));
        }
        Ok(Self(raw.to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the backing file under `root`
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[inline]
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Predicate form of [`ResourceName::parse`]
#[inline]
pub fn is_valid_resource_name(raw: &str) -> bool {
    ResourceName::parse(raw).is_ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "abcdefghijklmnopqrstuvwxyz_";

    #[test]
    fn test_accepts_full_charset() {
        assert!(is_valid_resource_name(GOOD));
        assert!(is_valid_resource_name("ABCDEFGHIJKLMNOPQRSTUVWXYZ-"));
        assert!(is_valid_resource_name("0123456789-_0123456789-_abc"));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(ResourceName::parse(""), Err(ResourceError::Length(0)));
        assert_eq!(ResourceName::parse(&GOOD[..26]), Err(ResourceError::Length(26)));
        let long = format!("{}a", GOOD);
        assert_eq!(ResourceName::parse(&long), Err(ResourceError::Length(28)));
    }

    #[test]
    fn test_rejects_bad_chars() {
        let slash = format!("/{}", &GOOD[..26]);
        assert_eq!(ResourceName::parse(&slash), Err(ResourceError::Charset('/')));
        let dot = format!("{}.", &GOOD[..26]);
        assert_eq!(ResourceName::parse(&dot), Err(ResourceError::Charset('.')));
        let accented = format!("{}\u{e9}", "a".repeat(26));
        assert_eq!(ResourceName::parse(&accented), Err(ResourceError::Charset('\u{e9}')));
    }

    #[test]
    fn test_path_in_root() {
        let name = ResourceName::parse(GOOD).unwrap();
        assert_eq!(name.path_in(Path::new("/srv")), PathBuf::from("/srv").join(GOOD));
        assert_eq!(name.to_string(), GOOD);
    }
}
