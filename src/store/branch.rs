//! Branch names and listings.

use std::fmt;

use scenelog_git::RefName;

use crate::error::StoreError;

/// A branch name git would accept (`git check-ref-format --branch`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// Validate `name`.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidBranchName`] with the first rule broken.
    pub fn new(name: &str) -> Result<Self, StoreError> {
        match Self::violation(name) {
            Some(reason) => Err(StoreError::InvalidBranchName {
                name: name.to_owned(),
                reason: reason.to_owned(),
            }),
            None => Ok(Self(name.to_owned())),
        }
    }

    fn violation(name: &str) -> Option<&'static str> {
        if name.is_empty() {
            return Some("name is empty");
        }
        if name == "@" || name == "HEAD" {
            return Some("name is reserved");
        }
        if name.starts_with('-') {
            return Some("name starts with '-'");
        }
        if name.ends_with('/') || name.ends_with('.') {
            return Some("name ends with '/' or '.'");
        }
        if name.contains("..") || name.contains("//") || name.contains("@{") {
            return Some("name contains '..', '//' or '@{'");
        }
        if name
            .chars()
            .any(|c| c.is_ascii_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\'))
        {
            return Some("name contains a space, control character, or one of ~^:?*[\\");
        }
        if name
            .split('/')
            .any(|component| component.starts_with('.') || component.ends_with(".lock"))
        {
            return Some("a path component starts with '.' or ends with '.lock'");
        }
        None
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The full ref (`refs/heads/<name>`).
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidBranchName`] if the ref layer rejects it.
    pub fn to_ref(&self) -> Result<RefName, StoreError> {
        RefName::branch(&self.0).map_err(|e| StoreError::InvalidBranchName {
            name: self.0.clone(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of [`VersionStore::branch_list`](super::VersionStore::branch_list).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        for name in ["main", "feature", "feature/lighting", "v1.2", "alice-wip"] {
            assert!(BranchName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_names_git_would_reject() {
        for name in [
            "", "-x", "a..b", "a b", "a~1", "a^", "a:b", "what?", "st*r", "[x]", "a\\b",
            "a/", "a.", ".hidden", "a/.b", "x.lock", "a//b", "@", "a@{1}", "HEAD", "tab\t",
        ] {
            assert!(
                matches!(
                    BranchName::new(name),
                    Err(StoreError::InvalidBranchName { .. })
                ),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn to_ref_prefixes_heads() {
        let name = BranchName::new("feature").unwrap();
        assert_eq!(name.to_ref().unwrap().as_str(), "refs/heads/feature");
    }
}
