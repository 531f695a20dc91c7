use serde::{Deserialize, Serialize};

/// How a dependency's version was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "version")]
pub enum DependencyVersion {
    /// A range as written in a manifest, e.g. `^1.2.0`.
    Declared(String),
    /// An exact version recorded in a lockfile.
    Installed(String),
}

/// A package extracted from a manifest or lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: DependencyVersion,
}

impl Dependency {
    pub fn declared(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: DependencyVersion::Declared(range.into()),
        }
    }

    pub fn installed(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: DependencyVersion::Installed(version.into()),
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self.version, DependencyVersion::Installed(_))
    }
}

/// A dependency whose version intersects the vulnerable set for its package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub source: String,
    pub package_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    pub vulnerable_versions: Vec<String>,
}

impl Match {
    pub fn declared(
        source: impl Into<String>,
        package_name: impl Into<String>,
        range: impl Into<String>,
        vulnerable_versions: Vec<String>,
    ) -> Self {
        Self {
            source: source.into(),
            package_name: package_name.into(),
            declared_version: Some(range.into()),
            installed_version: None,
            vulnerable_versions,
        }
    }

    pub fn installed(
        source: impl Into<String>,
        package_name: impl Into<String>,
        version: impl Into<String>,
        vulnerable_versions: Vec<String>,
    ) -> Self {
        Self {
            source: source.into(),
            package_name: package_name.into(),
            declared_version: None,
            installed_version: Some(version.into()),
            vulnerable_versions,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed_version.is_some()
    }

    /// The version that triggered the match, whichever kind it is.
    pub fn version(&self) -> &str {
        self.installed_version
            .as_deref()
            .or(self.declared_version.as_deref())
            .unwrap_or("?")
    }
}

/// Outcome for one logical scan unit.
///
/// `analyzed == false` means the file was not there. It says nothing about
/// vulnerabilities and must not be read as a clean result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub label: String,
    pub analyzed: bool,
    pub matches: Vec<Match>,
}

impl ScanResult {
    pub fn analyzed(label: impl Into<String>, matches: Vec<Match>) -> Self {
        Self {
            label: label.into(),
            analyzed: true,
            matches,
        }
    }

    pub fn missing(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            analyzed: false,
            matches: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_serializes_camel_case() {
        let m = Match::declared("package.json (dependencies)", "left-pad", "^1.0.0", vec!["1.3.0".into()]);
        let json = serde_json::to_value(&m).unwrap();

        assert_eq!(json["packageName"], "left-pad");
        assert_eq!(json["declaredVersion"], "^1.0.0");
        assert_eq!(json["vulnerableVersions"][0], "1.3.0");
        assert!(json.get("installedVersion").is_none());
    }

    #[test]
    fn test_match_version() {
        let installed = Match::installed("yarn.lock", "a", "1.0.0", vec![]);
        let declared = Match::declared("package.json", "a", "~1.0.0", vec![]);

        assert!(installed.is_installed());
        assert!(!declared.is_installed());
        assert_eq!(installed.version(), "1.0.0");
        assert_eq!(declared.version(), "~1.0.0");
    }

    #[test]
    fn test_missing_result_is_not_analyzed() {
        let result = ScanResult::missing("yarn.lock");
        assert!(!result.analyzed);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_dependency_kinds() {
        assert!(Dependency::installed("a", "1.0.0").is_installed());
        assert!(!Dependency::declared("a", "^1.0.0").is_installed());
    }
}
