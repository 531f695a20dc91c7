use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ScanError};

/// A repository on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parses an `owner/repo` spec.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        match spec.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(ScanError::InvalidRepo(spec.to_string())),
        }
    }

    /// Case-insensitive identity used to de-duplicate repositories.
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name).to_lowercase()
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Where candidate files are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// The local working tree.
    Local,
    /// Files at the root of a repository branch only.
    RemoteRoot { repo: RepoRef, branch: String },
    /// Files anywhere in the commit tree of a repository branch.
    RemoteTree { repo: RepoRef, branch: String },
}

impl ScanTarget {
    pub fn remote(repo: RepoRef, branch: impl Into<String>, root_only: bool) -> Self {
        let branch = branch.into();
        if root_only {
            ScanTarget::RemoteRoot { repo, branch }
        } else {
            ScanTarget::RemoteTree { repo, branch }
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, ScanTarget::Local)
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanTarget::Local => write!(f, "local"),
            ScanTarget::RemoteRoot { repo, branch } => write!(f, "{}@{} (root)", repo, branch),
            ScanTarget::RemoteTree { repo, branch } => write!(f, "{}@{} (tree)", repo, branch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo() {
        let repo = RepoRef::parse(" acme/widgets ").unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.to_string(), "acme/widgets");
    }

    #[test]
    fn test_parse_repo_invalid() {
        assert!(RepoRef::parse("widgets").is_err());
        assert!(RepoRef::parse("/widgets").is_err());
        assert!(RepoRef::parse("acme/").is_err());
        assert!(RepoRef::parse("acme/widgets/extra").is_err());
    }

    #[test]
    fn test_repo_key_ignores_case() {
        assert_eq!(
            RepoRef::new("Acme", "Widgets").key(),
            RepoRef::new("acme", "widgets").key()
        );
    }

    #[test]
    fn test_remote_target_kind() {
        let repo = RepoRef::new("acme", "widgets");
        assert!(matches!(
            ScanTarget::remote(repo.clone(), "main", true),
            ScanTarget::RemoteRoot { .. }
        ));
        assert!(matches!(
            ScanTarget::remote(repo, "main", false),
            ScanTarget::RemoteTree { .. }
        ));
        assert!(!ScanTarget::Local.is_remote());
    }
}
