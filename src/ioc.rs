//! The IOC feed: which exact versions of which packages are compromised.
//!
//! The feed is a CSV document whose first two columns are the package name and
//! a list of versions separated by `|`, `;` or whitespace. Any further columns
//! are ignored. A leading `package_name,...` header row is skipped.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::header::{ACCEPT, CACHE_CONTROL, PRAGMA};
use reqwest::Client;

use crate::error::{Result, ScanError};

/// Lookup from package name to the exact versions known to be compromised.
///
/// Names are case-sensitive. Version lists keep first-seen order and hold no
/// duplicates. Built once per run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VulnerabilityIndex {
    packages: HashMap<String, Vec<String>>,
}

impl VulnerabilityIndex {
    /// Builds an index from `(name, versions)` pairs, merging repeated names.
    pub fn from_entries<I, N, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<V>)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut index = Self::default();
        for (name, versions) in entries {
            index.insert(name.into(), versions.into_iter().map(Into::into));
        }
        index
    }

    /// Parses the CSV feed. Malformed or empty rows are skipped.
    pub fn parse(csv_text: &str) -> Self {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_text.as_bytes());

        let mut index = Self::default();

        for (row, record) in reader.records().enumerate() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!("skipping malformed IOC row {}: {}", row + 1, e);
                    continue;
                }
            };

            let name = record.get(0).unwrap_or_default();
            if row == 0 && name.eq_ignore_ascii_case("package_name") {
                continue;
            }

            let versions_field = record.get(1).unwrap_or_default();
            if name.is_empty() || versions_field.is_empty() {
                continue;
            }

            let versions: Vec<&str> = versions_field
                .split(|c: char| c == '|' || c == ';' || c.is_whitespace())
                .filter(|v| !v.is_empty())
                .collect();

            if versions.is_empty() {
                continue;
            }

            index.insert(name.to_string(), versions.into_iter().map(str::to_string));
        }

        index
    }

    /// Downloads and parses the feed.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::FeedFetch`] if the feed is unreachable or answers
    /// with a non-success status. Callers treat this as fatal.
    pub async fn fetch(client: &Client, url: &str) -> Result<Self> {
        tracing::info!("loading IOC feed from {}", url);

        let nocache = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let response = client
            .get(url)
            .query(&[("nocache", nocache.to_string())])
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header(ACCEPT, "text/csv")
            .send()
            .await
            .map_err(|e| ScanError::FeedFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::FeedFetch {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let body = response.text().await.map_err(|e| ScanError::FeedFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let index = Self::parse(&body);
        tracing::info!("{} packages listed in the IOC feed", index.len());
        Ok(index)
    }

    fn insert(&mut self, name: String, versions: impl Iterator<Item = String>) {
        let current = self.packages.entry(name).or_default();
        for version in versions {
            if !current.contains(&version) {
                current.push(version);
            }
        }
    }

    /// Vulnerable versions for a package, if it is listed.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.packages.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
