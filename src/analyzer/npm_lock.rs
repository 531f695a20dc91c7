use serde_json::Value;

use super::{parse_json_loose, Analyzer, AnalyzerKind, InstalledVersions};
use crate::ioc::VulnerabilityIndex;
use crate::model::Match;

/// Analyzer for `package-lock.json` and `npm-shrinkwrap.json`.
///
/// Reads both layouts when present: the v1 nested `dependencies` tree and the
/// v2/v3 flat `packages` map keyed by install path.
pub struct NpmLockAnalyzer;

impl NpmLockAnalyzer {
    fn walk_dependencies(deps: &Value, installed: &mut InstalledVersions) {
        let Some(deps) = deps.as_object() else {
            return;
        };
        for (name, info) in deps {
            if let Some(version) = info.get("version").and_then(Value::as_str) {
                installed.register(name, version);
            }
            if let Some(nested) = info.get("dependencies") {
                Self::walk_dependencies(nested, installed);
            }
        }
    }

    fn read_packages(packages: &Value, installed: &mut InstalledVersions) {
        let Some(packages) = packages.as_object() else {
            return;
        };
        for (path, info) in packages {
            // "" is the root project itself
            if path.is_empty() {
                continue;
            }
            let Some(version) = info.get("version").and_then(Value::as_str) else {
                continue;
            };
            let name = match path.rfind("node_modules/") {
                Some(idx) => &path[idx + "node_modules/".len()..],
                None => path.as_str(),
            };
            installed.register(name, version);
        }
    }
}

impl Analyzer for NpmLockAnalyzer {
    fn name(&self) -> &'static str {
        "npm lockfile"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::NpmLock
    }

    fn file_names(&self) -> &'static [&'static str] {
        &["package-lock.json", "npm-shrinkwrap.json"]
    }

    fn analyze(&self, content: &str, source: &str, index: &VulnerabilityIndex) -> Vec<Match> {
        let Some(lock) = parse_json_loose(content) else {
            tracing::debug!("{}: not valid JSON, skipping", source);
            return Vec::new();
        };

        let mut installed = InstalledVersions::default();
        if let Some(deps) = lock.get("dependencies") {
            Self::walk_dependencies(deps, &mut installed);
        }
        if let Some(packages) = lock.get("packages") {
            Self::read_packages(packages, &mut installed);
        }

        installed.matches(source, index)
    }
}
