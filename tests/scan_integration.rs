use iocscan::github::GithubClient;
use iocscan::model::{RepoRef, ScanTarget};
use iocscan::{Config, ScanMode, ScanOrchestrator, Summary, VulnerabilityIndex};
use reqwest::Client;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = "package_name,package_versions,sources\n\
left-pad,1.3.0,datadog\n\
chalk,5.6.1 | 5.6.2,datadog\n\
@ctrl/tinycolor,4.1.1;4.1.2,socket\n";

async fn mount_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/iocs.csv"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(server)
        .await;
}

async fn fetch_index(server: &MockServer) -> Arc<VulnerabilityIndex> {
    let url = format!("{}/iocs.csv", server.uri());
    Arc::new(VulnerabilityIndex::fetch(&Client::new(), &url).await.unwrap())
}

fn github_for(server: &MockServer, token: Option<&str>) -> GithubClient {
    let base = server.uri();
    GithubClient::with_base_urls(
        Client::new(),
        &format!("{}/api", base),
        &format!("{}/raw", base),
        &format!("{}/web", base),
        token.map(str::to_string),
    )
    .unwrap()
}

#[tokio::test]
async fn test_local_scan_across_formats() {
    let server = MockServer::start().await;
    mount_feed(&server).await;
    let index = fetch_index(&server).await;
    assert_eq!(index.get("chalk"), Some(&["5.6.1".to_string(), "5.6.2".to_string()][..]));

    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{"dependencies": {"chalk": "^5.0.0"}, "devDependencies": {"left-pad": "~1.2.0"}}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("package-lock.json"),
        r#"{
            "lockfileVersion": 3,
            "packages": {
                "": {"name": "app"},
                "node_modules/chalk": {"version": "5.3.0"},
                "node_modules/left-pad": {"version": "1.3.0"},
            }
        }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("deno.json"),
        r#"{"imports": {"tinycolor": "npm:@ctrl/tinycolor@^4.0.0"}}"#,
    )
    .unwrap();

    let config = Arc::new(Config {
        local_root: dir.path().to_path_buf(),
        ..Config::default()
    });
    let github = GithubClient::new(Client::new(), None).unwrap();
    let report = ScanOrchestrator::new(Arc::clone(&config), index, github)
        .run()
        .await;

    assert_eq!(report.mode, ScanMode::Local);
    assert_eq!(report.analyzed_count(), 3);

    let matches = report.matches();
    let described: Vec<_> = matches
        .iter()
        .map(|m| (m.source.as_str(), m.package_name.as_str(), m.version()))
        .collect();
    assert_eq!(
        described,
        vec![
            ("package.json (dependencies)", "chalk", "^5.0.0"),
            ("package-lock.json", "left-pad", "1.3.0"),
            ("deno.json", "@ctrl/tinycolor", "^4.0.0"),
        ]
    );
    assert_eq!(matches[0].vulnerable_versions, vec!["5.6.1", "5.6.2"]);

    // Absent files are reported as not analyzed, never as clean.
    let yarn = report.results.iter().find(|r| r.label == "yarn.lock").unwrap();
    assert!(!yarn.analyzed);

    assert!(report.has_relevant_matches(false));

    let summary = Summary::new(&report, &config);
    assert_eq!(summary.total_matches, 3);
    assert_eq!(summary.unique_packages, 3);
    assert_eq!(summary.by_source["package-lock.json"].packages, vec!["left-pad"]);
}

#[tokio::test]
async fn test_combined_scan_of_repos_and_org() {
    let server = MockServer::start().await;
    mount_feed(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "web", "owner": {"login": "acme"}},
            {"name": "old", "owner": {"login": "acme"}, "archived": true},
            {"name": "tools", "owner": {"login": "acme"}}
        ])))
        .mount(&server)
        .await;

    // Listed explicitly as ACME/web and again by the org; the explicit spelling wins.
    Mock::given(method("GET"))
        .and(path("/raw/ACME/web/main/yarn.lock"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "\"chalk@^5.0.0\":\n  version \"5.6.2\"\n  resolved \"https://registry.yarnpkg.com/chalk\"\n",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/acme/tools/main/pnpm-lock.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "lockfileVersion: '9.0'\n",
            "packages:\n",
            "  left-pad@1.2.0:\n",
            "    resolution: {integrity: sha512-x}\n",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/other/lib/dev/package.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"peerDependencies": {"left-pad": ">=1.0.0 <2"}}"#,
        ))
        .mount(&server)
        .await;

    let config = Arc::new(Config {
        orgs: vec!["acme".to_string()],
        repos: vec!["ACME/web".to_string(), "other/lib".to_string()],
        branches: vec!["main".to_string(), "dev".to_string()],
        concurrency: 2,
        ..Config::default()
    });
    config.validate().unwrap();

    let index = fetch_index(&server).await;
    let orchestrator =
        ScanOrchestrator::new(Arc::clone(&config), index, github_for(&server, None));

    let repos = orchestrator.collect_repositories().await;
    assert_eq!(
        repos,
        vec![
            RepoRef::new("ACME", "web"),
            RepoRef::new("other", "lib"),
            RepoRef::new("acme", "tools"),
        ]
    );
    let targets = orchestrator.build_targets(&repos).await;
    assert_eq!(targets.len(), 6);
    assert!(targets
        .iter()
        .all(|t| matches!(t, ScanTarget::RemoteRoot { .. })));

    let report = orchestrator.run().await;
    assert_eq!(report.mode, ScanMode::Combined);

    let labels: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.analyzed)
        .map(|r| r.label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec![
            "ACME/web@main:yarn.lock",
            "other/lib@dev:package.json",
            "acme/tools@main:pnpm-lock.yaml",
        ]
    );

    let matches = report.matches();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].package_name, "chalk");
    assert_eq!(matches[0].installed_version.as_deref(), Some("5.6.2"));
    assert_eq!(matches[1].source, "other/lib@dev:package.json (peerDependencies)");
    assert_eq!(matches[1].declared_version.as_deref(), Some(">=1.0.0 <2"));

    // left-pad 1.2.0 in the pnpm lock is not listed.
    assert!(matches.iter().all(|m| m.source != "acme/tools@main:pnpm-lock.yaml"));

    let summary = Summary::new(&report, &config);
    assert_eq!(summary.repos.as_deref(), Some(&config.repos[..]));
    assert_eq!(summary.all_branches, Some(false));
    assert!(report.has_relevant_matches(false));
}

#[tokio::test]
async fn test_unreachable_feed_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/iocs.csv"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/iocs.csv", server.uri());
    let err = VulnerabilityIndex::fetch(&Client::new(), &url).await.unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_contradictory_options_rejected_before_scanning() {
    let config = Config {
        repos: vec!["acme/web".to_string()],
        root_only: false,
        ..Config::default()
    };
    assert!(config.validate().unwrap_err().is_fatal());

    let config = Config {
        orgs: vec!["acme".to_string()],
        all_branches: true,
        ..Config::default()
    };
    assert!(config.validate().is_err());
}
