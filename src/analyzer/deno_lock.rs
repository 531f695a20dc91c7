use serde_json::Value;

use super::{split_name_version, Analyzer, AnalyzerKind, InstalledVersions};
use crate::ioc::VulnerabilityIndex;
use crate::model::Match;

/// Analyzer for `deno.lock`.
///
/// npm packages are keyed `name@version` under `packages.npm` (v3),
/// `npm.packages` (v2) or a top-level `npm` map (v4). Peer suffixes such as
/// `_supports-color@9.0.0` are dropped.
pub struct DenoLockAnalyzer;

fn register_keys(section: Option<&Value>, installed: &mut InstalledVersions) {
    let Some(section) = section.and_then(Value::as_object) else {
        return;
    };
    for key in section.keys() {
        let key = key.strip_prefix("npm:").unwrap_or(key);
        if let Some((name, version)) = split_name_version(key) {
            let version = version.split('_').next().unwrap_or(version);
            installed.register(name, version);
        }
    }
}

impl Analyzer for DenoLockAnalyzer {
    fn name(&self) -> &'static str {
        "deno lockfile"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::DenoLock
    }

    fn file_names(&self) -> &'static [&'static str] {
        &["deno.lock"]
    }

    fn analyze(&self, content: &str, source: &str, index: &VulnerabilityIndex) -> Vec<Match> {
        let lock: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("{}: not valid JSON, skipping: {}", source, e);
                return Vec::new();
            }
        };

        let mut installed = InstalledVersions::default();
        register_keys(lock.pointer("/packages/npm"), &mut installed);
        register_keys(lock.get("npm"), &mut installed);
        register_keys(lock.pointer("/npm/packages"), &mut installed);

        installed.matches(source, index)
    }
}
