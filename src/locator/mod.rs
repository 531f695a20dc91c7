//! Locating candidate files for a scan target.
//!
//! A [`SourceLocator`] turns a [`ScanTarget`] into one [`Probe`] per candidate
//! file: either the file's content, ready for its analyzer, or a note that it
//! was absent.
//!
//! # Available Locators
//!
//! | Locator | Target | Looks at |
//! |---------|--------|----------|
//! | [`LocalLocator`] | [`ScanTarget::Local`] | files directly under a directory |
//! | [`RemoteRootLocator`] | [`ScanTarget::RemoteRoot`] | files at a branch's root |
//! | [`RemoteTreeLocator`] | [`ScanTarget::RemoteTree`] | matching files anywhere in a branch |

mod local;
mod remote_root;
mod remote_tree;

pub use local::LocalLocator;
pub use remote_root::RemoteRootLocator;
pub use remote_tree::RemoteTreeLocator;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::analyzer::{AnalyzerKind, AnalyzerRegistry};
use crate::error::{Result, ScanError};
use crate::github::GithubClient;
use crate::model::ScanTarget;

/// Remote files fetched at once within a single target.
pub const FILE_FETCH_CONCURRENCY: usize = 5;

/// A file found by a locator, ready to hand to its analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToAnalyze {
    pub analyzer: AnalyzerKind,
    /// File name (local, remote root) or repository path (remote tree).
    pub filename: String,
    /// Label copied into every match, e.g. `acme/web@main:yarn.lock`.
    pub source: String,
    pub content: String,
}

/// Outcome of looking for one candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Found(FileToAnalyze),
    Missing { filename: String, source: String },
}

impl Probe {
    pub fn is_found(&self) -> bool {
        matches!(self, Probe::Found(_))
    }
}

/// Trait for resolving a scan target into candidate files.
#[async_trait]
pub trait SourceLocator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Probes every file the registry knows about.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnsupportedTarget`] for a target of the wrong kind.
    /// Missing files and upstream failures are not errors.
    async fn locate(&self, target: &ScanTarget, registry: &AnalyzerRegistry) -> Result<Vec<Probe>>;
}

pub(crate) fn unsupported(locator: &'static str, target: &ScanTarget) -> ScanError {
    ScanError::UnsupportedTarget {
        locator,
        target: target.to_string(),
    }
}

/// The three locators, dispatched on the target variant.
pub struct Locators {
    local: LocalLocator,
    remote_root: RemoteRootLocator,
    remote_tree: RemoteTreeLocator,
}

impl Locators {
    pub fn new(local_root: impl Into<PathBuf>, github: GithubClient) -> Self {
        Self {
            local: LocalLocator::new(local_root),
            remote_root: RemoteRootLocator::new(github.clone()),
            remote_tree: RemoteTreeLocator::new(github),
        }
    }

    pub fn for_target(&self, target: &ScanTarget) -> &dyn SourceLocator {
        match target {
            ScanTarget::Local => &self.local,
            ScanTarget::RemoteRoot { .. } => &self.remote_root,
            ScanTarget::RemoteTree { .. } => &self.remote_tree,
        }
    }

    pub async fn locate(
        &self,
        target: &ScanTarget,
        registry: &AnalyzerRegistry,
    ) -> Result<Vec<Probe>> {
        self.for_target(target).locate(target, registry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RepoRef;

    #[test]
    fn test_dispatch_on_target() {
        let github = GithubClient::new(reqwest::Client::new(), None).unwrap();
        let locators = Locators::new(".", github);
        let repo = RepoRef::new("acme", "widgets");

        assert_eq!(locators.for_target(&ScanTarget::Local).name(), "local");
        assert_eq!(
            locators
                .for_target(&ScanTarget::remote(repo.clone(), "main", true))
                .name(),
            "remote-root"
        );
        assert_eq!(
            locators
                .for_target(&ScanTarget::remote(repo, "main", false))
                .name(),
            "remote-tree"
        );
    }
}
