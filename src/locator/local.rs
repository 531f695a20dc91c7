use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{unsupported, FileToAnalyze, Probe, SourceLocator};
use crate::analyzer::AnalyzerRegistry;
use crate::error::Result;
use crate::model::ScanTarget;

/// Reads candidate files directly under a directory. No recursion.
pub struct LocalLocator {
    root: PathBuf,
}

impl LocalLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for LocalLocator {
    fn default() -> Self {
        Self::new(".")
    }
}

#[async_trait]
impl SourceLocator for LocalLocator {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn locate(&self, target: &ScanTarget, registry: &AnalyzerRegistry) -> Result<Vec<Probe>> {
        if !matches!(target, ScanTarget::Local) {
            return Err(unsupported(self.name(), target));
        }

        let mut probes = Vec::new();
        for (kind, name) in registry.file_names() {
            let path = self.root.join(name);
            let probe = match tokio::fs::read_to_string(&path).await {
                Ok(content) if !content.trim().is_empty() => Probe::Found(FileToAnalyze {
                    analyzer: kind,
                    filename: name.to_string(),
                    source: name.to_string(),
                    content,
                }),
                Ok(_) => {
                    tracing::debug!("{} is empty", path.display());
                    Probe::Missing {
                        filename: name.to_string(),
                        source: name.to_string(),
                    }
                }
                Err(e) => {
                    tracing::debug!("{} not readable: {}", path.display(), e);
                    Probe::Missing {
                        filename: name.to_string(),
                        source: name.to_string(),
                    }
                }
            };
            probes.push(probe);
        }

        Ok(probes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerKind;
    use crate::error::ScanError;
    use crate::model::RepoRef;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_probes_every_registered_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name":"app"}"#).unwrap();
        fs::write(dir.path().join("yarn.lock"), "  \n").unwrap();

        let locator = LocalLocator::new(dir.path());
        let registry = AnalyzerRegistry::default();
        let probes = locator.locate(&ScanTarget::Local, &registry).await.unwrap();

        assert_eq!(probes.len(), registry.file_names().count());
        match &probes[0] {
            Probe::Found(file) => {
                assert_eq!(file.analyzer, AnalyzerKind::PackageJson);
                assert_eq!(file.source, "package.json");
            }
            other => panic!("expected package.json to be found, got {:?}", other),
        }

        // Empty files count as absent.
        let yarn = probes
            .iter()
            .find(|p| matches!(p, Probe::Missing { filename, .. } if filename == "yarn.lock"));
        assert!(yarn.is_some());
        assert_eq!(probes.iter().filter(|p| p.is_found()).count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_remote_target() {
        let locator = LocalLocator::default();
        let target = ScanTarget::remote(RepoRef::new("acme", "widgets"), "main", true);
        let err = locator
            .locate(&target, &AnalyzerRegistry::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedTarget { locator: "local", .. }));
    }
}
