use serde_json::Value;

use super::{match_dependency, Analyzer, AnalyzerKind};
use crate::ioc::VulnerabilityIndex;
use crate::model::{Dependency, Match};

/// Dependency sections read from a manifest, in report order.
const SECTIONS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "optionalDependencies",
    "peerDependencies",
];

/// Analyzer for `package.json` manifests.
///
/// Every dependency section is matched on its own, so a package listed in
/// two sections can produce two matches. Source labels carry the section
/// name, e.g. `package.json (devDependencies)`.
pub struct PackageJsonAnalyzer;

impl Analyzer for PackageJsonAnalyzer {
    fn name(&self) -> &'static str {
        "npm manifest"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::PackageJson
    }

    fn file_names(&self) -> &'static [&'static str] {
        &["package.json"]
    }

    fn analyze(&self, content: &str, source: &str, index: &VulnerabilityIndex) -> Vec<Match> {
        let manifest: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("{}: not valid JSON, skipping: {}", source, e);
                return Vec::new();
            }
        };

        let mut matches = Vec::new();

        for section in SECTIONS {
            let Some(deps) = manifest.get(section).and_then(Value::as_object) else {
                continue;
            };

            let label = format!("{} ({})", source, section);
            for (name, range) in deps {
                let Some(range) = range.as_str() else {
                    continue;
                };
                let dep = Dependency::declared(name.as_str(), range);
                if let Some(m) = match_dependency(&dep, &label, index) {
                    matches.push(m);
                }
            }
        }

        matches
    }
}
