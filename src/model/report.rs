use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{Match, ScanResult};
use crate::config::Config;

/// Which kind of scan produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Local,
    Repos,
    Org,
    Combined,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Local => "local",
            ScanMode::Repos => "repos",
            ScanMode::Org => "org",
            ScanMode::Combined => "combined",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every result collected during one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub mode: ScanMode,
    pub scan_time: DateTime<Utc>,
    pub results: Vec<ScanResult>,
}

impl ScanReport {
    pub fn new(mode: ScanMode, results: Vec<ScanResult>) -> Self {
        Self {
            mode,
            scan_time: Utc::now(),
            results,
        }
    }

    /// All matches, flattened in result order. No cross-file de-duplication.
    pub fn matches(&self) -> Vec<Match> {
        self.results
            .iter()
            .flat_map(|r| r.matches.iter().cloned())
            .collect()
    }

    pub fn analyzed_count(&self) -> usize {
        self.results.iter().filter(|r| r.analyzed).count()
    }

    /// Whether the run found something that should fail it.
    ///
    /// With `fail_on_declared_only` every match counts; otherwise only matches
    /// backed by an installed (lockfile) version do.
    pub fn has_relevant_matches(&self, fail_on_declared_only: bool) -> bool {
        self.results
            .iter()
            .flat_map(|r| r.matches.iter())
            .any(|m| fail_on_declared_only || m.is_installed())
    }
}

/// Per-source aggregate inside a [`Summary`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub matches: usize,
    pub packages: Vec<String>,
}

/// Aggregated view of a report, as rendered by the output layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub mode: ScanMode,
    pub scan_time: DateTime<Utc>,
    pub orgs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repos: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_branches: Option<bool>,
    pub total_matches: usize,
    pub unique_packages: usize,
    pub matches: Vec<Match>,
    pub by_source: BTreeMap<String, SourceSummary>,
}

impl Summary {
    pub fn new(report: &ScanReport, config: &Config) -> Self {
        let matches = report.matches();
        let unique_packages = matches
            .iter()
            .map(|m| m.package_name.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let mut by_source: BTreeMap<String, SourceSummary> = BTreeMap::new();
        for m in &matches {
            let entry = by_source.entry(m.source.clone()).or_default();
            entry.matches += 1;
            if !entry.packages.contains(&m.package_name) {
                entry.packages.push(m.package_name.clone());
            }
        }

        let remote = report.mode != ScanMode::Local;

        Self {
            mode: report.mode,
            scan_time: report.scan_time,
            orgs: config.orgs.clone(),
            repos: remote.then(|| config.repos.clone()),
            branches: remote.then(|| config.branches.clone()),
            all_branches: remote.then_some(config.all_branches),
            total_matches: matches.len(),
            unique_packages,
            matches,
            by_source,
        }
    }
}
