use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::{
    match_dependency, parse_json_loose, split_name_version, Analyzer, AnalyzerKind,
    InstalledVersions,
};
use crate::ioc::VulnerabilityIndex;
use crate::model::{Dependency, Match};

static NPM_PINNED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"npm:((?:@[A-Za-z0-9._-]+/)?[A-Za-z0-9._-]+)@([0-9][0-9A-Za-z.+-]*)")
        .expect("valid npm specifier regex")
});

/// Analyzer for Bun's text lockfile, `bun.lock`.
///
/// Two passes. The `packages` map gives installed versions: each value is a
/// tuple whose first element is `name@version`. The raw text is then swept
/// for pinned `npm:name@version` specifiers, which are reported as declared
/// unless the same `name@version` was already reported.
pub struct BunLockAnalyzer;

impl BunLockAnalyzer {
    fn installed(lock: &Value) -> InstalledVersions {
        let mut installed = InstalledVersions::default();
        let Some(packages) = lock.get("packages").and_then(Value::as_object) else {
            return installed;
        };

        for (key, entry) in packages {
            let id = entry
                .as_array()
                .and_then(|tuple| tuple.first())
                .and_then(Value::as_str)
                .unwrap_or(key);
            let id = id.strip_prefix("npm:").unwrap_or(id);
            if let Some((name, version)) = split_name_version(id) {
                installed.register(name, version);
            }
        }
        installed
    }
}

impl Analyzer for BunLockAnalyzer {
    fn name(&self) -> &'static str {
        "bun lockfile"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::BunLock
    }

    fn file_names(&self) -> &'static [&'static str] {
        &["bun.lock"]
    }

    fn analyze(&self, content: &str, source: &str, index: &VulnerabilityIndex) -> Vec<Match> {
        let mut matches = match parse_json_loose(content) {
            Some(lock) => Self::installed(&lock).matches(source, index),
            None => {
                tracing::debug!("{}: not valid JSON, sweeping raw text only", source);
                Vec::new()
            }
        };

        let mut seen: HashSet<(String, String)> = matches
            .iter()
            .map(|m| (m.package_name.clone(), m.version().to_string()))
            .collect();

        for caps in NPM_PINNED.captures_iter(content) {
            let (Some(name), Some(version)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let key = (name.as_str().to_string(), version.as_str().to_string());
            if seen.contains(&key) {
                continue;
            }

            let dep = Dependency::declared(name.as_str(), version.as_str());
            if let Some(m) = match_dependency(&dep, source, index) {
                seen.insert(key);
                matches.push(m);
            }
        }

        matches
    }
}
