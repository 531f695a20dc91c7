use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::{match_dependency, Analyzer, AnalyzerKind};
use crate::ioc::VulnerabilityIndex;
use crate::model::{Dependency, Match};

/// `npm:name@range`, optionally scoped. The range stops at a quote, comma,
/// whitespace or a `/` that starts a sub-path import.
static NPM_SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"npm:((?:@[A-Za-z0-9._-]+/)?[A-Za-z0-9._-]+)@([^\s"'/,}\]]+)"#)
        .expect("valid npm specifier regex")
});

/// Analyzer for `deno.json` / `deno.jsonc`.
///
/// Comments and trailing commas make `.jsonc` awkward to parse, so the text
/// is swept for `npm:` specifiers wherever they occur (import maps, tasks,
/// scopes).
pub struct DenoConfigAnalyzer;

impl Analyzer for DenoConfigAnalyzer {
    fn name(&self) -> &'static str {
        "deno config"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::DenoConfig
    }

    fn file_names(&self) -> &'static [&'static str] {
        &["deno.json", "deno.jsonc"]
    }

    fn analyze(&self, content: &str, source: &str, index: &VulnerabilityIndex) -> Vec<Match> {
        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        for caps in NPM_SPECIFIER.captures_iter(content) {
            let (Some(name), Some(range)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let (name, range) = (name.as_str(), range.as_str());
            if !seen.insert((name, range)) {
                continue;
            }

            let dep = Dependency::declared(name, range);
            if let Some(m) = match_dependency(&dep, source, index) {
                matches.push(m);
            }
        }

        matches
    }
}
