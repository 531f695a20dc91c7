use async_trait::async_trait;

use super::{unsupported, FileToAnalyze, Probe, SourceLocator, FILE_FETCH_CONCURRENCY};
use crate::analyzer::AnalyzerRegistry;
use crate::concurrency::run_with_concurrency;
use crate::error::Result;
use crate::github::GithubClient;
use crate::model::ScanTarget;

/// Fetches candidate files from the root of a repository branch.
pub struct RemoteRootLocator {
    github: GithubClient,
}

impl RemoteRootLocator {
    pub fn new(github: GithubClient) -> Self {
        Self { github }
    }
}

#[async_trait]
impl SourceLocator for RemoteRootLocator {
    fn name(&self) -> &'static str {
        "remote-root"
    }

    async fn locate(&self, target: &ScanTarget, registry: &AnalyzerRegistry) -> Result<Vec<Probe>> {
        let ScanTarget::RemoteRoot { repo, branch } = target else {
            return Err(unsupported(self.name(), target));
        };

        let files: Vec<_> = registry.file_names().collect();
        let probes = run_with_concurrency(files, FILE_FETCH_CONCURRENCY, |(kind, name)| async move {
            let source = format!("{}@{}:{}", repo, branch, name);
            match self.github.fetch_raw(repo, branch, name).await {
                Ok(Some(content)) if !content.trim().is_empty() => Probe::Found(FileToAnalyze {
                    analyzer: kind,
                    filename: name.to_string(),
                    source,
                    content,
                }),
                Ok(_) => Probe::Missing {
                    filename: name.to_string(),
                    source,
                },
                Err(e) => {
                    tracing::warn!("failed to fetch {}: {}", source, e);
                    Probe::Missing {
                        filename: name.to_string(),
                        source,
                    }
                }
            }
        })
        .await;

        Ok(probes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerKind;
    use crate::model::RepoRef;
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn locator_for(server: &MockServer) -> RemoteRootLocator {
        let base = server.uri();
        let github = GithubClient::with_base_urls(
            Client::new(),
            &format!("{}/api", base),
            &format!("{}/raw", base),
            &format!("{}/web", base),
            None,
        )
        .unwrap();
        RemoteRootLocator::new(github)
    }

    #[tokio::test]
    async fn test_fetches_root_files_in_registry_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/raw/acme/widgets/main/package.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"widgets"}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/acme/widgets/main/yarn.lock"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# yarn lockfile v1\n"))
            .mount(&server)
            .await;

        let target = ScanTarget::remote(RepoRef::new("acme", "widgets"), "main", true);
        let registry = AnalyzerRegistry::default();
        let probes = locator_for(&server)
            .locate(&target, &registry)
            .await
            .unwrap();

        assert_eq!(probes.len(), registry.file_names().count());
        let found: Vec<_> = probes
            .iter()
            .filter_map(|p| match p {
                Probe::Found(f) => Some(f),
                Probe::Missing { .. } => None,
            })
            .collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].analyzer, AnalyzerKind::PackageJson);
        assert_eq!(found[0].source, "acme/widgets@main:package.json");
        assert_eq!(found[1].analyzer, AnalyzerKind::YarnLock);

        match &probes[1] {
            Probe::Missing { filename, source } => {
                assert_eq!(filename, "package-lock.json");
                assert_eq!(source, "acme/widgets@main:package-lock.json");
            }
            other => panic!("expected package-lock.json to be missing, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejects_tree_target() {
        let server = MockServer::start().await;
        let target = ScanTarget::remote(RepoRef::new("acme", "widgets"), "main", false);
        assert!(locator_for(&server)
            .locate(&target, &AnalyzerRegistry::default())
            .await
            .is_err());
    }
}
