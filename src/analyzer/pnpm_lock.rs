use regex::Regex;
use serde_yaml::Value;
use std::sync::LazyLock;

use super::{Analyzer, AnalyzerKind, InstalledVersions};
use crate::ioc::VulnerabilityIndex;
use crate::model::Match;

/// `/name@1.0.0`, `/@scope/name@1.0.0(peer@1.0.0)` (v6) and `name@1.0.0` (v9).
static AT_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?((?:@[^/@]+/)?[^/@(]+)@([^(@/]+)").expect("valid pnpm key regex")
});

/// `/name/1.0.0` and `/@scope/name/1.0.0_peer@1.0.0` (v5).
static SLASH_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/((?:@[^/@]+/)?[^/@(]+)/([0-9][^/(]*)").expect("valid pnpm key regex")
});

/// Analyzer for `pnpm-lock.yaml`, lockfile versions 5 through 9.
pub struct PnpmLockAnalyzer;

/// Splits a `packages` key into name and version, dropping peer suffixes.
fn parse_package_key(key: &str) -> Option<(&str, &str)> {
    let caps = AT_KEY
        .captures(key)
        .or_else(|| SLASH_KEY.captures(key))?;
    let name = caps.get(1)?.as_str();
    let version = caps.get(2)?.as_str();
    let version = version.split('_').next().unwrap_or(version);
    Some((name, version))
}

impl Analyzer for PnpmLockAnalyzer {
    fn name(&self) -> &'static str {
        "pnpm lockfile"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::PnpmLock
    }

    fn file_names(&self) -> &'static [&'static str] {
        &["pnpm-lock.yaml", "pnpm-lock.yml"]
    }

    fn analyze(&self, content: &str, source: &str, index: &VulnerabilityIndex) -> Vec<Match> {
        let data: Value = match serde_yaml::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("{}: not valid YAML, skipping: {}", source, e);
                return Vec::new();
            }
        };

        let packages = data
            .get("packages")
            .and_then(Value::as_mapping)
            .or_else(|| data.get("dependencies").and_then(Value::as_mapping));
        let Some(packages) = packages else {
            return Vec::new();
        };

        let mut installed = InstalledVersions::default();
        for key in packages.keys().filter_map(Value::as_str) {
            if let Some((name, version)) = parse_package_key(key) {
                installed.register(name, version);
            }
        }

        installed.matches(source, index)
    }
}
