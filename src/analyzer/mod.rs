//! Manifest and lockfile analyzers.
//!
//! Each analyzer understands one file dialect, extracts `(name, version)`
//! pairs from it and matches them against the [`VulnerabilityIndex`].
//! Analyzers are pure: no I/O, no panics on malformed input. A document that
//! cannot be parsed yields no matches.
//!
//! # Available Analyzers
//!
//! | Analyzer | Files | Versions |
//! |----------|-------|----------|
//! | [`PackageJsonAnalyzer`] | `package.json` | declared |
//! | [`NpmLockAnalyzer`] | `package-lock.json`, `npm-shrinkwrap.json` | installed |
//! | [`PnpmLockAnalyzer`] | `pnpm-lock.yaml`, `pnpm-lock.yml` | installed |
//! | [`YarnLockAnalyzer`] | `yarn.lock` | installed |
//! | [`DenoConfigAnalyzer`] | `deno.json`, `deno.jsonc` | declared |
//! | [`DenoLockAnalyzer`] | `deno.lock` | installed |
//! | [`BunLockAnalyzer`] | `bun.lock` | installed and declared |
//!
//! # Example
//!
//! ```
//! use iocscan::analyzer::{get_analyzer, AnalyzerKind};
//! use iocscan::VulnerabilityIndex;
//!
//! let index = VulnerabilityIndex::from_entries(vec![("left-pad", vec!["1.3.0"])]);
//! let analyzer = get_analyzer(AnalyzerKind::PackageJson);
//! let matches = analyzer.analyze(
//!     r#"{"dependencies":{"left-pad":"^1.0.0"}}"#,
//!     "package.json",
//!     &index,
//! );
//! assert_eq!(matches.len(), 1);
//! ```

mod bun_lock;
mod deno_config;
mod deno_lock;
mod npm_lock;
mod package_json;
mod pnpm_lock;
pub mod version;
mod yarn_lock;

pub use bun_lock::BunLockAnalyzer;
pub use deno_config::DenoConfigAnalyzer;
pub use deno_lock::DenoLockAnalyzer;
pub use npm_lock::NpmLockAnalyzer;
pub use package_json::PackageJsonAnalyzer;
pub use pnpm_lock::PnpmLockAnalyzer;
pub use yarn_lock::YarnLockAnalyzer;

use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use crate::ioc::VulnerabilityIndex;
use crate::model::{Dependency, DependencyVersion, Match};
use version::{parse_version, versions_equal, NpmRange};

/// Identifies a file dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalyzerKind {
    PackageJson,
    NpmLock,
    PnpmLock,
    YarnLock,
    DenoConfig,
    DenoLock,
    BunLock,
}

impl AnalyzerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::PackageJson => "package-json",
            AnalyzerKind::NpmLock => "npm-lock",
            AnalyzerKind::PnpmLock => "pnpm-lock",
            AnalyzerKind::YarnLock => "yarn-lock",
            AnalyzerKind::DenoConfig => "deno-config",
            AnalyzerKind::DenoLock => "deno-lock",
            AnalyzerKind::BunLock => "bun-lock",
        }
    }

    /// The stateless analyzer for this dialect.
    pub fn analyzer(&self) -> &'static dyn Analyzer {
        match self {
            AnalyzerKind::PackageJson => &PackageJsonAnalyzer,
            AnalyzerKind::NpmLock => &NpmLockAnalyzer,
            AnalyzerKind::PnpmLock => &PnpmLockAnalyzer,
            AnalyzerKind::YarnLock => &YarnLockAnalyzer,
            AnalyzerKind::DenoConfig => &DenoConfigAnalyzer,
            AnalyzerKind::DenoLock => &DenoLockAnalyzer,
            AnalyzerKind::BunLock => &BunLockAnalyzer,
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for extracting dependencies from one file dialect and matching them
/// against the IOC feed.
pub trait Analyzer: Send + Sync {
    /// Human-readable name of the dialect.
    fn name(&self) -> &'static str;

    fn kind(&self) -> AnalyzerKind;

    /// File names this analyzer accepts, in probe order.
    fn file_names(&self) -> &'static [&'static str];

    /// Analyzes file content. `source` is the label copied into every match.
    ///
    /// Never fails: a document that cannot be parsed yields an empty vector.
    fn analyze(&self, content: &str, source: &str, index: &VulnerabilityIndex) -> Vec<Match>;
}

/// Returns every analyzer, in scan order.
pub fn all_analyzers() -> Vec<&'static dyn Analyzer> {
    AnalyzerRegistry::default()
        .entries()
        .iter()
        .map(|(kind, _)| kind.analyzer())
        .collect()
}

/// Returns the analyzer for a specific dialect.
///
/// # Example
///
/// ```
/// use iocscan::analyzer::{get_analyzer, AnalyzerKind};
///
/// let analyzer = get_analyzer(AnalyzerKind::YarnLock);
/// assert_eq!(analyzer.file_names(), ["yarn.lock"]);
/// ```
pub fn get_analyzer(kind: AnalyzerKind) -> &'static dyn Analyzer {
    kind.analyzer()
}

/// Ordered list of dialects and the file names each one claims.
///
/// Locators probe files in registry order, so results come out in that order
/// too.
#[derive(Debug, Clone)]
pub struct AnalyzerRegistry {
    entries: Vec<(AnalyzerKind, &'static [&'static str])>,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new(&[
            AnalyzerKind::PackageJson,
            AnalyzerKind::NpmLock,
            AnalyzerKind::PnpmLock,
            AnalyzerKind::YarnLock,
            AnalyzerKind::DenoConfig,
            AnalyzerKind::DenoLock,
            AnalyzerKind::BunLock,
        ])
    }
}

impl AnalyzerRegistry {
    /// Builds a registry restricted to the given dialects.
    pub fn new(kinds: &[AnalyzerKind]) -> Self {
        Self {
            entries: kinds
                .iter()
                .map(|kind| (*kind, kind.analyzer().file_names()))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[(AnalyzerKind, &'static [&'static str])] {
        &self.entries
    }

    /// Every registered file name paired with its dialect, in probe order.
    pub fn file_names(&self) -> impl Iterator<Item = (AnalyzerKind, &'static str)> + '_ {
        self.entries
            .iter()
            .flat_map(|(kind, names)| names.iter().map(move |name| (*kind, *name)))
    }

    /// The dialect that claims a bare file name, if any.
    pub fn kind_for_file(&self, file_name: &str) -> Option<AnalyzerKind> {
        self.file_names()
            .find(|(_, name)| *name == file_name)
            .map(|(kind, _)| kind)
    }
}

/// Highest installed version seen per package name within one lockfile.
///
/// Only semver-valid versions are tracked. A lower copy of a package is
/// discarded in favour of the higher one.
#[derive(Debug, Default)]
pub(crate) struct InstalledVersions {
    versions: BTreeMap<String, (Version, String)>,
}

impl InstalledVersions {
    pub(crate) fn register(&mut self, name: &str, raw: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let Some(version) = parse_version(raw) else {
            return;
        };

        let replace = match self.versions.get(name) {
            Some((current, _)) => version.cmp_precedence(current).is_gt(),
            None => true,
        };
        if replace {
            self.versions
                .insert(name.to_string(), (version, raw.trim().to_string()));
        }
    }

    pub(crate) fn dependencies(&self) -> impl Iterator<Item = Dependency> + '_ {
        self.versions
            .iter()
            .map(|(name, (_, raw))| Dependency::installed(name.clone(), raw.clone()))
    }

    /// Matches every tracked package against the index.
    pub(crate) fn matches(&self, source: &str, index: &VulnerabilityIndex) -> Vec<Match> {
        self.dependencies()
            .filter_map(|dep| match_dependency(&dep, source, index))
            .collect()
    }
}

/// Matches one extracted dependency against the index.
///
/// Declared ranges match every vulnerable version that satisfies them.
/// Installed versions match by exact equality.
pub fn match_dependency(
    dep: &Dependency,
    source: &str,
    index: &VulnerabilityIndex,
) -> Option<Match> {
    let vulnerable = index.get(&dep.name)?;

    match &dep.version {
        DependencyVersion::Declared(range) => {
            let parsed = NpmRange::parse(range)?;
            let hits: Vec<String> = vulnerable
                .iter()
                .filter(|v| parsed.satisfies_str(v))
                .cloned()
                .collect();
            (!hits.is_empty()).then(|| Match::declared(source, &dep.name, range, hits))
        }
        DependencyVersion::Installed(version) => {
            let hits: Vec<String> = vulnerable
                .iter()
                .filter(|v| versions_equal(v, version))
                .cloned()
                .collect();
            (!hits.is_empty()).then(|| Match::installed(source, &dep.name, version, hits))
        }
    }
}

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("valid trailing comma regex"));

/// Parses JSON, retrying once with trailing commas removed.
pub(crate) fn parse_json_loose(raw: &str) -> Option<serde_json::Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            let cleaned = TRAILING_COMMA.replace_all(raw, "$1");
            serde_json::from_str(&cleaned).ok()
        }
    }
}

/// Splits `name@version`, honouring scoped names (`@scope/name@1.0.0`).
///
/// The separator is the first `@` after the leading character, so a scope's
/// `@` is never taken for it. Returns `None` when either side would be empty.
pub(crate) fn split_name_version(token: &str) -> Option<(&str, &str)> {
    let at = token.get(1..)?.find('@')? + 1;
    let (name, version) = (token[..at].trim(), token[at + 1..].trim());
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((name, version))
}
