//! Scan orchestration: from run options to a [`ScanReport`].
//!
//! The orchestrator decides the mode, builds the repository list and the
//! `repos x branches` target list, runs every target through the bounded
//! scheduler and hands each found file to its analyzer. Failures are
//! contained per repository, per branch and per file; none of them abort the
//! run.

use indicatif::ProgressBar;
use std::collections::HashSet;
use std::sync::Arc;

use crate::analyzer::AnalyzerRegistry;
use crate::concurrency::run_with_concurrency;
use crate::config::Config;
use crate::github::GithubClient;
use crate::ioc::VulnerabilityIndex;
use crate::locator::{Locators, Probe};
use crate::model::{RepoRef, ScanMode, ScanReport, ScanResult, ScanTarget};

/// Turns found files into results; absent files become `analyzed: false`.
pub fn analyze_files(probes: Vec<Probe>, index: &VulnerabilityIndex) -> Vec<ScanResult> {
    probes
        .into_iter()
        .map(|probe| match probe {
            Probe::Found(file) => {
                let matches = file
                    .analyzer
                    .analyzer()
                    .analyze(&file.content, &file.source, index);
                tracing::debug!("{}: {} match(es)", file.source, matches.len());
                ScanResult::analyzed(file.source, matches)
            }
            Probe::Missing { source, .. } => {
                tracing::debug!("{} not found", source);
                ScanResult::missing(source)
            }
        })
        .collect()
}

/// Drives one run. Shares only read-only state with its jobs.
pub struct ScanOrchestrator {
    config: Arc<Config>,
    index: Arc<VulnerabilityIndex>,
    registry: AnalyzerRegistry,
    github: GithubClient,
    locators: Locators,
    progress: Option<ProgressBar>,
}

impl ScanOrchestrator {
    pub fn new(config: Arc<Config>, index: Arc<VulnerabilityIndex>, github: GithubClient) -> Self {
        let locators = Locators::new(config.local_root.clone(), github.clone());
        Self {
            config,
            index,
            registry: AnalyzerRegistry::default(),
            github,
            locators,
            progress: None,
        }
    }

    pub fn with_registry(mut self, registry: AnalyzerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Ticks `progress` once per finished target. Its length is set once the
    /// target list is known.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn run(&self) -> ScanReport {
        let mode = self.config.mode();
        tracing::info!("starting {} scan", mode);

        let results = match mode {
            ScanMode::Local => {
                if let Some(pb) = &self.progress {
                    pb.set_length(1);
                }
                self.scan_target(&ScanTarget::Local).await
            }
            ScanMode::Repos | ScanMode::Org | ScanMode::Combined => self.scan_remote().await,
        };

        let report = ScanReport::new(mode, results);
        tracing::info!(
            "{} file(s) analyzed, {} match(es)",
            report.analyzed_count(),
            report.matches().len()
        );
        report
    }

    /// Explicit repositories followed by organization repositories,
    /// de-duplicated case-insensitively in first-seen order.
    pub async fn collect_repositories(&self) -> Vec<RepoRef> {
        let mut seen = HashSet::new();
        let mut repos = Vec::new();

        for spec in &self.config.repos {
            match RepoRef::parse(spec) {
                Ok(repo) => {
                    if seen.insert(repo.key()) {
                        repos.push(repo);
                    }
                }
                Err(e) => tracing::warn!("{}, skipping", e),
            }
        }

        for org in &self.config.orgs {
            match self.github.list_org_repos(org).await {
                Ok(listed) => {
                    for repo in listed {
                        if seen.insert(repo.key()) {
                            repos.push(repo);
                        }
                    }
                }
                Err(e) => tracing::warn!("cannot list repositories of {}: {}", org, e),
            }
        }

        repos
    }

    async fn branches_for(&self, repo: &RepoRef) -> Vec<String> {
        if !self.config.all_branches {
            return self.config.branches.clone();
        }
        match self.github.list_all_branches(repo).await {
            Ok(branches) => branches,
            Err(e) => {
                tracing::warn!("cannot list branches of {}: {}", repo, e);
                Vec::new()
            }
        }
    }

    /// Every `repos x branches` pair as a remote target, built up front.
    pub async fn build_targets(&self, repos: &[RepoRef]) -> Vec<ScanTarget> {
        let branch_lists = run_with_concurrency(repos.to_vec(), self.config.concurrency, |repo| async move {
            let branches = self.branches_for(&repo).await;
            (repo, branches)
        })
        .await;

        let mut targets = Vec::new();
        for (repo, branches) in branch_lists {
            if branches.is_empty() {
                tracing::warn!("no branches to scan in {}, skipping", repo);
                continue;
            }
            for branch in branches {
                targets.push(ScanTarget::remote(repo.clone(), branch, self.config.root_only));
            }
        }
        targets
    }

    async fn scan_remote(&self) -> Vec<ScanResult> {
        let repos = self.collect_repositories().await;
        if repos.is_empty() {
            tracing::warn!("no repositories to scan");
            return Vec::new();
        }

        let targets = self.build_targets(&repos).await;
        tracing::info!(
            "scanning {} branch(es) across {} repositories",
            targets.len(),
            repos.len()
        );
        if let Some(pb) = &self.progress {
            pb.set_length(targets.len() as u64);
        }

        run_with_concurrency(targets, self.config.concurrency, |target| async move {
            self.scan_target(&target).await
        })
        .await
        .into_iter()
        .flatten()
        .collect()
    }

    /// Locates and analyzes one target.
    ///
    /// A remote target where no file at all was found yields nothing: the
    /// branch most likely does not exist.
    pub async fn scan_target(&self, target: &ScanTarget) -> Vec<ScanResult> {
        let probes = match self.locators.locate(target, &self.registry).await {
            Ok(probes) => probes,
            Err(e) => {
                tracing::warn!("{}: {}", target, e);
                Vec::new()
            }
        };

        let found_any = probes.iter().any(Probe::is_found);
        let results = analyze_files(probes, &self.index);

        if let Some(pb) = &self.progress {
            pb.inc(1);
        }

        if target.is_remote() && !found_any {
            tracing::debug!("nothing found for {}", target);
            return Vec::new();
        }
        results
    }
}
