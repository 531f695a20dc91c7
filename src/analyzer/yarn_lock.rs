use regex::Regex;
use std::sync::LazyLock;

use super::{Analyzer, AnalyzerKind, InstalledVersions};
use crate::ioc::VulnerabilityIndex;
use crate::model::Match;

static VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^version\s*[: ]\s*"?([^"\s]+)"?"#).expect("valid yarn version regex")
});

/// Analyzer for `yarn.lock` (classic and berry).
///
/// Block headers are unindented lines ending in `:`; the first indented
/// `version` line beneath a header is its resolved version.
pub struct YarnLockAnalyzer;

/// Package name from a block header such as
/// `"@babel/core@^7.0.0", "@babel/core@^7.1.0":`.
fn header_package_name(line: &str) -> Option<&str> {
    let key = line.trim().strip_suffix(':')?;
    let descriptor = key.trim_matches('"');
    let descriptor = descriptor
        .split(", ")
        .next()
        .unwrap_or(descriptor)
        .trim_matches('"');

    let name = match descriptor.get(1..).and_then(|rest| rest.find('@')) {
        Some(at) => &descriptor[..at + 1],
        None => descriptor,
    };
    (!name.is_empty()).then_some(name)
}

impl Analyzer for YarnLockAnalyzer {
    fn name(&self) -> &'static str {
        "yarn lockfile"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::YarnLock
    }

    fn file_names(&self) -> &'static [&'static str] {
        &["yarn.lock"]
    }

    fn analyze(&self, content: &str, source: &str, index: &VulnerabilityIndex) -> Vec<Match> {
        let lines: Vec<&str> = content.lines().collect();
        let mut installed = InstalledVersions::default();

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let is_header = line.ends_with(':')
                && line.chars().next().is_some_and(|c| !c.is_whitespace());
            if !is_header {
                i += 1;
                continue;
            }

            let mut j = i + 1;
            let mut version = None;
            while j < lines.len() && lines[j].starts_with(char::is_whitespace) {
                if let Some(caps) = VERSION_LINE.captures(lines[j].trim()) {
                    version = caps.get(1).map(|m| m.as_str());
                    break;
                }
                j += 1;
            }

            if let (Some(name), Some(version)) = (header_package_name(line), version) {
                installed.register(name, version);
            }

            i = j.max(i + 1);
        }

        installed.matches(source, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> VulnerabilityIndex {
        VulnerabilityIndex::from_entries(vec![
            ("left-pad", vec!["1.3.0"]),
            ("@ctrl/tinycolor", vec!["4.1.1"]),
        ])
    }

    #[test]
    fn test_header_package_name() {
        assert_eq!(header_package_name("left-pad@^1.0.0:"), Some("left-pad"));
        assert_eq!(
            header_package_name(r#""@ctrl/tinycolor@^4.0.0", "@ctrl/tinycolor@^4.1.0":"#),
            Some("@ctrl/tinycolor")
        );
        assert_eq!(
            header_package_name(r#""left-pad@npm:^1.0.0":"#),
            Some("left-pad")
        );
        assert_eq!(header_package_name("__metadata:"), Some("__metadata"));
    }

    #[test]
    fn test_classic_lockfile() {
        let content = "# yarn lockfile v1\n\
\n\
left-pad@^1.0.0:\n  version \"1.3.0\"\n  resolved \"https://registry.yarnpkg.com/left-pad/-/left-pad-1.3.0.tgz\"\n\
\n\
\"@ctrl/tinycolor@^4.0.0\", \"@ctrl/tinycolor@^4.1.0\":\n  version \"4.1.1\"\n";

        let matches = YarnLockAnalyzer.analyze(content, "yarn.lock", &index());
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].package_name, "@ctrl/tinycolor");
        assert_eq!(matches[1].package_name, "left-pad");
        assert_eq!(matches[1].installed_version.as_deref(), Some("1.3.0"));
    }

    #[test]
    fn test_berry_lockfile() {
        let content = "__metadata:\n  version: 6\n\n\
\"left-pad@npm:^1.0.0\":\n  version: 1.3.0\n  resolution: \"left-pad@npm:1.3.0\"\n";

        let matches = YarnLockAnalyzer.analyze(content, "yarn.lock", &index());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].installed_version.as_deref(), Some("1.3.0"));
    }

    #[test]
    fn test_crlf_and_highest_version() {
        let content = "left-pad@^1.0.0:\r\n  version \"1.3.0\"\r\n\r\nleft-pad@^2.0.0:\r\n  version \"2.0.0\"\r\n";
        let matches = YarnLockAnalyzer.analyze(content, "yarn.lock", &index());
        // 2.0.0 shadows the vulnerable 1.3.0
        assert!(matches.is_empty());
    }

    #[test]
    fn test_garbage_input() {
        assert!(YarnLockAnalyzer
            .analyze("not a lockfile\n\u{0}\u{1}", "yarn.lock", &index())
            .is_empty());
    }
}
