//! Configuration file handling and run options.
//!
//! Defaults for a run can be persisted in a TOML file. Command-line values
//! override them, after which the resulting [`Config`] is validated once and
//! shared read-only with every component.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/iocscan/config.toml`
//! - macOS: `~/Library/Application Support/iocscan/config.toml`
//! - Windows: `%APPDATA%\iocscan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! ioc_url = "https://example.com/iocs.csv"
//! branches = ["main", "develop"]
//! concurrency = 10
//! fail_on_declared_only = true
//! root_only = true
//! all_branches = false
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::ScanError;
use crate::model::ScanMode;

/// Default IOC feed: DataDog's consolidated shai-hulud 2.0 list.
pub const DEFAULT_IOC_URL: &str = "https://raw.githubusercontent.com/DataDog/indicators-of-compromise/refs/heads/main/shai-hulud-2.0/consolidated_iocs.csv";

/// Branches probed when none are given.
pub const DEFAULT_BRANCHES: [&str; 4] = ["main", "master", "dev", "develop"];

/// Repositories (or branches) scanned in parallel by default.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Run-wide options.
///
/// Built once at start-up, then passed by reference (usually behind an `Arc`).
/// Fields marked `serde(skip)` are per-run and never persisted.
///
/// # Example
///
/// ```
/// use iocscan::Config;
///
/// let config = Config::default();
/// assert!(config.root_only);
/// assert_eq!(config.concurrency, 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL of the IOC CSV feed.
    pub ioc_url: String,

    /// Branches scanned in each remote repository.
    ///
    /// Default: main, master, dev, develop
    pub branches: Vec<String>,

    /// Enumerate every branch through the hosting UI instead of `branches`.
    ///
    /// Requires a token.
    pub all_branches: bool,

    /// Maximum number of repository branches scanned at once.
    ///
    /// Default: 10
    pub concurrency: usize,

    /// Whether a declared-only match (manifest range, no lockfile) fails the run.
    ///
    /// Default: true
    pub fail_on_declared_only: bool,

    /// Only look at the repository root. When false the whole commit tree is
    /// searched, which requires a token.
    ///
    /// Default: true
    pub root_only: bool,

    /// Organizations to scan (lowercased, de-duplicated).
    #[serde(skip)]
    pub orgs: Vec<String>,

    /// Explicit `owner/repo` specs.
    #[serde(skip)]
    pub repos: Vec<String>,

    /// Emit machine-readable output.
    #[serde(skip)]
    pub json: bool,

    /// 0 = errors only, 3 = debug.
    #[serde(skip)]
    pub verbosity: u8,

    /// Bearer token for the hosting API.
    #[serde(skip)]
    pub token: Option<String>,

    /// Directory probed in local mode.
    #[serde(skip)]
    pub local_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ioc_url: DEFAULT_IOC_URL.to_string(),
            branches: DEFAULT_BRANCHES.iter().map(|b| b.to_string()).collect(),
            all_branches: false,
            concurrency: DEFAULT_CONCURRENCY,
            fail_on_declared_only: true,
            root_only: true,
            orgs: Vec::new(),
            repos: Vec::new(),
            json: false,
            verbosity: 0,
            token: None,
            local_root: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the persisted part of the configuration.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("iocscan")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// The scan mode implied by the requested targets.
    pub fn mode(&self) -> ScanMode {
        match (self.orgs.is_empty(), self.repos.is_empty()) {
            (true, true) => ScanMode::Local,
            (true, false) => ScanMode::Repos,
            (false, true) => ScanMode::Org,
            (false, false) => ScanMode::Combined,
        }
    }

    /// Rejects contradictory options before anything touches the network.
    pub fn validate(&self) -> std::result::Result<(), ScanError> {
        if self.concurrency == 0 {
            return Err(ScanError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }

        if self.mode() == ScanMode::Local {
            return Ok(());
        }

        let has_token = self.token.as_deref().is_some_and(|t| !t.trim().is_empty());

        if !self.root_only && !has_token {
            return Err(ScanError::Config(
                "scanning the whole repository tree (--no-root-only) requires a token (--token or GITHUB_TOKEN)"
                    .to_string(),
            ));
        }

        if self.all_branches && !has_token {
            return Err(ScanError::Config(
                "--all-branches requires a token (--token or GITHUB_TOKEN)".to_string(),
            ));
        }

        if !self.all_branches && self.branches.is_empty() {
            return Err(ScanError::Config(
                "no branches to scan; pass --branches or --all-branches".to_string(),
            ));
        }

        Ok(())
    }
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalizes organization names: lowercased, de-duplicated, order kept.
pub fn normalize_orgs(raw: &str) -> Vec<String> {
    let mut orgs: Vec<String> = Vec::new();
    for org in split_list(raw) {
        let org = org.to_lowercase();
        if !orgs.contains(&org) {
            orgs.push(org);
        }
    }
    orgs
}
