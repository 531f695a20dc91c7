use async_trait::async_trait;

use super::{unsupported, FileToAnalyze, Probe, SourceLocator, FILE_FETCH_CONCURRENCY};
use crate::analyzer::AnalyzerRegistry;
use crate::concurrency::run_with_concurrency;
use crate::error::Result;
use crate::github::GithubClient;
use crate::model::ScanTarget;

/// Searches a branch's whole commit tree for candidate files (monorepos).
///
/// Only files that were found are reported: with no fixed list of paths
/// there is nothing meaningful to call missing.
pub struct RemoteTreeLocator {
    github: GithubClient,
}

impl RemoteTreeLocator {
    pub fn new(github: GithubClient) -> Self {
        Self { github }
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[async_trait]
impl SourceLocator for RemoteTreeLocator {
    fn name(&self) -> &'static str {
        "remote-tree"
    }

    async fn locate(&self, target: &ScanTarget, registry: &AnalyzerRegistry) -> Result<Vec<Probe>> {
        let ScanTarget::RemoteTree { repo, branch } = target else {
            return Err(unsupported(self.name(), target));
        };

        let head = match self.github.resolve_branch(repo, branch).await {
            Ok(Some(head)) => head,
            Ok(None) => {
                tracing::debug!("branch {} not found in {}", branch, repo);
                return Ok(Vec::new());
            }
            Err(e) => {
                tracing::warn!("cannot resolve {}@{}: {}", repo, branch, e);
                return Ok(Vec::new());
            }
        };

        let paths = match self.github.list_tree(repo, &head.sha).await {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!("cannot list tree of {}@{}: {}", repo, branch, e);
                return Ok(Vec::new());
            }
        };

        let wanted: Vec<_> = registry
            .file_names()
            .flat_map(|(kind, name)| {
                paths
                    .iter()
                    .filter(move |p| file_name(p) == name)
                    .map(move |p| (kind, p.clone()))
            })
            .collect();

        tracing::debug!(
            "{}@{} ({}): {} candidate files",
            repo,
            branch,
            head.resolved_ref,
            wanted.len()
        );

        let probes = run_with_concurrency(wanted, FILE_FETCH_CONCURRENCY, |(kind, path)| async move {
            let source = format!("{}@{}:{}", repo, branch, path);
            match self.github.fetch_raw(repo, branch, &path).await {
                Ok(Some(content)) if !content.trim().is_empty() => Some(Probe::Found(FileToAnalyze {
                    analyzer: kind,
                    filename: path,
                    source,
                    content,
                })),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("failed to fetch {}: {}", source, e);
                    None
                }
            }
        })
        .await;

        Ok(probes.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerKind;
    use crate::model::RepoRef;
    use reqwest::Client;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn locator_for(server: &MockServer) -> RemoteTreeLocator {
        let base = server.uri();
        let github = GithubClient::with_base_urls(
            Client::new(),
            &format!("{}/api", base),
            &format!("{}/raw", base),
            &format!("{}/web", base),
            Some("ghp_test".to_string()),
        )
        .unwrap();
        RemoteTreeLocator::new(github)
    }

    fn target(branch: &str) -> ScanTarget {
        ScanTarget::remote(RepoRef::new("acme", "mono"), branch, false)
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("apps/web/package.json"), "package.json");
        assert_eq!(file_name("yarn.lock"), "yarn.lock");
    }

    #[tokio::test]
    async fn test_finds_files_anywhere_in_tree() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/repos/acme/mono/git/refs/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/main",
                "object": {"sha": "abc123"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/repos/acme/mono/git/trees/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tree": [
                    {"path": "package.json", "type": "blob"},
                    {"path": "apps/web/package.json", "type": "blob"},
                    {"path": "apps/web/pnpm-lock.yaml", "type": "blob"},
                    {"path": "apps/web/my-package.json", "type": "blob"},
                    {"path": "docs/README.md", "type": "blob"}
                ]
            })))
            .mount(&server)
            .await;
        for file in ["package.json", "apps/web/package.json", "apps/web/pnpm-lock.yaml"] {
            Mock::given(method("GET"))
                .and(path(format!("/raw/acme/mono/main/{}", file)))
                .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
                .mount(&server)
                .await;
        }

        let probes = locator_for(&server)
            .locate(&target("main"), &AnalyzerRegistry::default())
            .await
            .unwrap();

        let found: Vec<_> = probes
            .iter()
            .filter_map(|p| match p {
                Probe::Found(f) => Some((f.analyzer, f.source.as_str())),
                Probe::Missing { .. } => None,
            })
            .collect();
        assert_eq!(
            found,
            vec![
                (AnalyzerKind::PackageJson, "acme/mono@main:package.json"),
                (AnalyzerKind::PackageJson, "acme/mono@main:apps/web/package.json"),
                (AnalyzerKind::PnpmLock, "acme/mono@main:apps/web/pnpm-lock.yaml"),
            ]
        );
        assert_eq!(probes.len(), 3);
    }

    #[tokio::test]
    async fn test_blank_files_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/repos/acme/mono/git/refs/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": {"sha": "abc123"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/repos/acme/mono/git/trees/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tree": [
                    {"path": "package.json", "type": "blob"},
                    {"path": "apps/api/yarn.lock", "type": "blob"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/acme/mono/main/package.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(" \n\t\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/acme/mono/main/apps/api/yarn.lock"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# yarn lockfile v1\n"))
            .mount(&server)
            .await;

        let probes = locator_for(&server)
            .locate(&target("main"), &AnalyzerRegistry::default())
            .await
            .unwrap();

        assert_eq!(probes.len(), 1);
        match &probes[0] {
            Probe::Found(file) => assert_eq!(file.filename, "apps/api/yarn.lock"),
            other => panic!("expected yarn.lock to be found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_branch_yields_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/repos/acme/mono/git/refs/heads/develop"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let probes = locator_for(&server)
            .locate(&target("develop"), &AnalyzerRegistry::default())
            .await
            .unwrap();
        assert!(probes.is_empty());
    }

    #[tokio::test]
    async fn test_tree_failure_yields_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/repos/acme/mono/git/refs/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": {"sha": "abc123"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/repos/acme/mono/git/trees/abc123"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let probes = locator_for(&server)
            .locate(&target("main"), &AnalyzerRegistry::default())
            .await
            .unwrap();
        assert!(probes.is_empty());
    }
}
