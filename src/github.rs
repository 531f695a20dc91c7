//! GitHub access: organization listing, refs, trees, raw content and the
//! web UI branch listing.
//!
//! Base URLs are configurable so tests can point the client at a mock
//! server. A token, when present, is sent as a bearer credential on API and
//! UI calls. Raw content is fetched anonymously.

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;

use crate::error::{Result, ScanError};
use crate::model::RepoRef;

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_RAW_URL: &str = "https://raw.githubusercontent.com";
pub const GITHUB_WEB_URL: &str = "https://github.com";

/// Page size for organization listings; a shorter page is the last one.
const PER_PAGE: usize = 100;

/// A branch resolved to its head commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub sha: String,
    /// Full ref name as reported by the API, e.g. `refs/heads/main`.
    pub resolved_ref: String,
}

#[derive(Deserialize)]
struct OrgRepo {
    name: String,
    owner: Option<RepoOwner>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    private: bool,
}

#[derive(Deserialize)]
struct RepoOwner {
    login: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RefResponse {
    One(GitRef),
    Many(Vec<GitRef>),
}

#[derive(Deserialize)]
struct GitRef {
    #[serde(rename = "ref")]
    reference: Option<String>,
    object: Option<GitObject>,
}

#[derive(Deserialize)]
struct GitObject {
    sha: Option<String>,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct BranchPage {
    payload: Option<BranchPayload>,
}

#[derive(Deserialize)]
struct BranchPayload {
    #[serde(default)]
    branches: Vec<BranchEntry>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Deserialize)]
struct BranchEntry {
    name: Option<String>,
}

/// Client for the GitHub REST API, raw content host and web UI.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    api_url: Url,
    raw_url: Url,
    web_url: Url,
    token: Option<String>,
}

fn parse_base(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| ScanError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Appends path segments to a base URL. Segments containing `/` are split so
/// branch names like `feature/x` stay literal paths.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ScanError::InvalidUrl {
            url: base.to_string(),
            reason: "cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .extend(segments.iter().flat_map(|s| s.split('/')));
    Ok(url)
}

impl GithubClient {
    pub fn new(client: Client, token: Option<String>) -> Result<Self> {
        Self::with_base_urls(client, GITHUB_API_URL, GITHUB_RAW_URL, GITHUB_WEB_URL, token)
    }

    pub fn with_base_urls(
        client: Client,
        api_url: &str,
        raw_url: &str,
        web_url: &str,
        token: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            client,
            api_url: parse_base(api_url)?,
            raw_url: parse_base(raw_url)?,
            web_url: parse_base(web_url)?,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn api_get(&self, url: Url) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        self.authorize(request)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Public, non-archived repositories of an organization.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Api`] on a non-success page. Pages fetched before
    /// the failure are discarded.
    pub async fn list_org_repos(&self, org: &str) -> Result<Vec<RepoRef>> {
        let mut repos = Vec::new();
        let mut page = 1usize;

        loop {
            let mut url = endpoint(&self.api_url, &["orgs", org, "repos"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string())
                .append_pair("type", "public");

            let response = self.api_get(url.clone()).send().await?;
            if !response.status().is_success() {
                return Err(ScanError::Api {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                });
            }

            let batch: Vec<OrgRepo> = response.json().await?;
            let count = batch.len();

            repos.extend(
                batch
                    .into_iter()
                    .filter(|r| !r.archived && !r.private)
                    .map(|r| {
                        let owner = r.owner.map(|o| o.login).unwrap_or_else(|| org.to_string());
                        RepoRef::new(owner, r.name)
                    }),
            );

            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        tracing::info!("{} public repositories found in {}", repos.len(), org);
        Ok(repos)
    }

    /// Resolves a branch to its head commit.
    ///
    /// Returns `Ok(None)` when the branch does not exist (404) or the answer
    /// carries no SHA.
    pub async fn resolve_branch(&self, repo: &RepoRef, branch: &str) -> Result<Option<BranchRef>> {
        let url = endpoint(
            &self.api_url,
            &["repos", repo.owner.as_str(), repo.name.as_str(), "git", "refs", "heads", branch],
        )?;

        let response = self.api_get(url.clone()).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ScanError::Api {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let git_ref = match response.json::<RefResponse>().await? {
            RefResponse::One(r) => Some(r),
            RefResponse::Many(refs) => refs.into_iter().next(),
        };

        let Some(git_ref) = git_ref else {
            return Ok(None);
        };
        let Some(sha) = git_ref.object.and_then(|o| o.sha) else {
            tracing::warn!("ref answer without SHA for {}@{}", repo, branch);
            return Ok(None);
        };

        Ok(Some(BranchRef {
            sha,
            resolved_ref: git_ref
                .reference
                .unwrap_or_else(|| format!("refs/heads/{}", branch)),
        }))
    }

    /// Every blob path in a commit tree.
    pub async fn list_tree(&self, repo: &RepoRef, sha: &str) -> Result<Vec<String>> {
        let mut url = endpoint(
            &self.api_url,
            &["repos", repo.owner.as_str(), repo.name.as_str(), "git", "trees", sha],
        )?;
        url.query_pairs_mut().append_pair("recursive", "1");

        let response = self.api_get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(ScanError::Api {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let tree: TreeResponse = response.json().await?;
        if tree.truncated {
            tracing::warn!("tree listing for {} truncated by the API", repo);
        }

        Ok(tree
            .tree
            .into_iter()
            .filter(|e| e.kind.as_deref() == Some("blob"))
            .filter_map(|e| e.path)
            .collect())
    }

    /// Raw file content at a branch. `Ok(None)` for any non-success status.
    pub async fn fetch_raw(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
    ) -> Result<Option<String>> {
        let url = endpoint(
            &self.raw_url,
            &[repo.owner.as_str(), repo.name.as_str(), branch, path],
        )?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github.v3.raw")
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(
                "{}@{}:{} not available (HTTP {})",
                repo,
                branch,
                path,
                response.status().as_u16()
            );
            return Ok(None);
        }

        Ok(Some(response.text().await?))
    }

    /// Every branch name shown by the web UI, de-duplicated in listing order.
    ///
    /// A non-success page stops the listing; names gathered so far are kept.
    pub async fn list_all_branches(&self, repo: &RepoRef) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        let mut page = 1usize;

        loop {
            let mut url = endpoint(
                &self.web_url,
                &[repo.owner.as_str(), repo.name.as_str(), "branches", "all.json"],
            )?;
            url.query_pairs_mut().append_pair("page", &page.to_string());

            let request = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .header("X-Requested-With", "XMLHttpRequest");
            let response = self.authorize(request).send().await?;

            if !response.status().is_success() {
                tracing::warn!(
                    "branch listing for {} stopped at page {}: HTTP {}",
                    repo,
                    page,
                    response.status().as_u16()
                );
                break;
            }

            let Some(payload) = response.json::<BranchPage>().await?.payload else {
                break;
            };

            for name in payload.branches.into_iter().filter_map(|b| b.name) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }

            if !payload.has_more {
                break;
            }
            page += 1;
        }

        tracing::debug!("branches of {}: {}", repo, names.join(", "));
        Ok(names)
    }
}
