//! npm-flavoured version ranges.
//!
//! `semver::VersionReq` follows Cargo's rules (a bare `1.2.3` means `^1.2.3`,
//! no `||`, no hyphen ranges), so manifest ranges are desugared here into
//! plain comparator sets the way npm does it, with pre-releases included.
//! Upper bounds carry a `-0` pre-release so `^1.0.0` excludes `2.0.0-beta`.

use semver::{BuildMetadata, Prerelease, Version};
use std::cmp::Ordering;

/// Parses a single exact version, tolerating a leading `v` or `=`.
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches('=').trim_start_matches(['v', 'V']);
    Version::parse(trimmed).ok()
}

/// Exact equality for installed versions: semver precedence when both sides
/// parse (build metadata ignored), plain string equality otherwise.
pub fn versions_equal(a: &str, b: &str) -> bool {
    match (parse_version(a), parse_version(b)) {
        (Some(x), Some(y)) => x.cmp_precedence(&y) == Ordering::Equal,
        _ => a.trim() == b.trim(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    fn matches(&self, candidate: &Version) -> bool {
        let ord = candidate.cmp_precedence(&self.version);
        match self.op {
            Op::Lt => ord == Ordering::Less,
            Op::Le => ord != Ordering::Greater,
            Op::Gt => ord == Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
            Op::Eq => ord == Ordering::Equal,
        }
    }
}

/// A version with missing or wildcard components, e.g. `1`, `1.2.x`, `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_start_matches('=').trim_start_matches(['v', 'V']);
        if raw.is_empty() {
            return None;
        }

        let raw = raw.split_once('+').map_or(raw, |(core, _)| core);
        let (core, pre) = match raw.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (raw, None),
        };

        let mut parts = core.split('.');
        let mut numbers = [None; 3];
        let mut wildcard = false;
        for slot in numbers.iter_mut() {
            match parts.next() {
                None => wildcard = true,
                Some(p) if matches!(p, "x" | "X" | "*") => wildcard = true,
                Some(p) => {
                    let n: u64 = p.parse().ok()?;
                    if !wildcard {
                        *slot = Some(n);
                    }
                }
            }
        }
        if parts.next().is_some() {
            return None;
        }

        let pre = match pre {
            Some(p) if numbers[2].is_some() => Prerelease::new(p).ok()?,
            Some(_) => return None,
            None => Prerelease::EMPTY,
        };

        Some(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre,
        })
    }
}

fn version(major: u64, minor: u64, patch: u64, pre: Prerelease) -> Version {
    Version {
        major,
        minor,
        patch,
        pre,
        build: BuildMetadata::EMPTY,
    }
}

/// The lowest version with the given core, i.e. `M.m.p-0`.
fn floor(major: u64, minor: u64, patch: u64) -> Option<Version> {
    Some(version(major, minor, patch, Prerelease::new("0").ok()?))
}

/// A comparator nothing satisfies.
fn never() -> Option<Comparator> {
    Some(Comparator::new(Op::Lt, floor(0, 0, 0)?))
}

/// The next component value, or `None` at `u64::MAX`.
fn bump(n: u64) -> Option<u64> {
    n.checked_add(1)
}

fn caret(major: u64, p: &Partial) -> Option<Vec<Comparator>> {
    let (minor, patch) = match (p.minor, p.patch) {
        (None, _) => {
            return Some(vec![
                Comparator::new(Op::Ge, floor(major, 0, 0)?),
                Comparator::new(Op::Lt, floor(bump(major)?, 0, 0)?),
            ])
        }
        (Some(minor), None) => {
            let upper = if major == 0 {
                floor(0, bump(minor)?, 0)?
            } else {
                floor(bump(major)?, 0, 0)?
            };
            return Some(vec![
                Comparator::new(Op::Ge, floor(major, minor, 0)?),
                Comparator::new(Op::Lt, upper),
            ]);
        }
        (Some(minor), Some(patch)) => (minor, patch),
    };

    let upper = match (major, minor) {
        (0, 0) => floor(0, 0, bump(patch)?)?,
        (0, _) => floor(0, bump(minor)?, 0)?,
        _ => floor(bump(major)?, 0, 0)?,
    };
    let lower = if !p.pre.is_empty() {
        version(major, minor, patch, p.pre.clone())
    } else if major == 0 {
        floor(0, minor, patch)?
    } else {
        version(major, minor, patch, Prerelease::EMPTY)
    };

    Some(vec![
        Comparator::new(Op::Ge, lower),
        Comparator::new(Op::Lt, upper),
    ])
}

fn tilde(major: u64, p: &Partial) -> Option<Vec<Comparator>> {
    let bounds = match (p.minor, p.patch) {
        (None, _) => (
            version(major, 0, 0, Prerelease::EMPTY),
            floor(bump(major)?, 0, 0)?,
        ),
        (Some(minor), None) => (
            version(major, minor, 0, Prerelease::EMPTY),
            floor(major, bump(minor)?, 0)?,
        ),
        (Some(minor), Some(patch)) => (
            version(major, minor, patch, p.pre.clone()),
            floor(major, bump(minor)?, 0)?,
        ),
    };
    Some(vec![
        Comparator::new(Op::Ge, bounds.0),
        Comparator::new(Op::Lt, bounds.1),
    ])
}

fn x_range(major: u64, p: &Partial) -> Option<Vec<Comparator>> {
    match (p.minor, p.patch) {
        (None, _) => Some(vec![
            Comparator::new(Op::Ge, floor(major, 0, 0)?),
            Comparator::new(Op::Lt, floor(bump(major)?, 0, 0)?),
        ]),
        (Some(minor), None) => Some(vec![
            Comparator::new(Op::Ge, floor(major, minor, 0)?),
            Comparator::new(Op::Lt, floor(major, bump(minor)?, 0)?),
        ]),
        (Some(minor), Some(patch)) => Some(vec![Comparator::new(
            Op::Eq,
            version(major, minor, patch, p.pre.clone()),
        )]),
    }
}

fn primitive(op: Op, major: u64, p: &Partial) -> Option<Vec<Comparator>> {
    if let (Some(minor), Some(patch)) = (p.minor, p.patch) {
        return Some(vec![Comparator::new(
            op,
            version(major, minor, patch, p.pre.clone()),
        )]);
    }

    let comparator = match (op, p.minor) {
        (Op::Gt, None) => Comparator::new(Op::Ge, floor(bump(major)?, 0, 0)?),
        (Op::Gt, Some(minor)) => Comparator::new(Op::Ge, floor(major, bump(minor)?, 0)?),
        (Op::Ge, minor) => Comparator::new(Op::Ge, floor(major, minor.unwrap_or(0), 0)?),
        (Op::Lt, minor) => Comparator::new(Op::Lt, floor(major, minor.unwrap_or(0), 0)?),
        (Op::Le, None) => Comparator::new(Op::Lt, floor(bump(major)?, 0, 0)?),
        (Op::Le, Some(minor)) => Comparator::new(Op::Lt, floor(major, bump(minor)?, 0)?),
        (Op::Eq, _) => return x_range(major, p),
    };
    Some(vec![comparator])
}

fn hyphen(from: &Partial, to: &Partial) -> Option<Vec<Comparator>> {
    let mut set = Vec::with_capacity(2);

    if let Some(major) = from.major {
        let lower = match (from.minor, from.patch) {
            (None, _) => floor(major, 0, 0)?,
            (Some(minor), None) => floor(major, minor, 0)?,
            (Some(minor), Some(patch)) if !from.pre.is_empty() => {
                version(major, minor, patch, from.pre.clone())
            }
            (Some(minor), Some(patch)) => floor(major, minor, patch)?,
        };
        set.push(Comparator::new(Op::Ge, lower));
    }

    if let Some(major) = to.major {
        let upper = match (to.minor, to.patch) {
            (None, _) => Comparator::new(Op::Lt, floor(bump(major)?, 0, 0)?),
            (Some(minor), None) => Comparator::new(Op::Lt, floor(major, bump(minor)?, 0)?),
            (Some(minor), Some(patch)) if !to.pre.is_empty() => {
                Comparator::new(Op::Le, version(major, minor, patch, to.pre.clone()))
            }
            (Some(minor), Some(patch)) => Comparator::new(Op::Lt, floor(major, minor, bump(patch)?)?),
        };
        set.push(upper);
    }

    Some(set)
}

fn split_operator(token: &str) -> (&str, &str) {
    for op in ["~>", ">=", "<=", "^", "~", ">", "<", "="] {
        if let Some(rest) = token.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", token)
}

fn parse_comparator(token: &str) -> Option<Vec<Comparator>> {
    let (op, rest) = split_operator(token);
    let partial = Partial::parse(rest)?;

    let Some(major) = partial.major else {
        return match op {
            ">" | "<" => Some(vec![never()?]),
            _ => Some(Vec::new()),
        };
    };

    match op {
        "^" => caret(major, &partial),
        "~" | "~>" => tilde(major, &partial),
        "" | "=" => x_range(major, &partial),
        ">" => primitive(Op::Gt, major, &partial),
        ">=" => primitive(Op::Ge, major, &partial),
        "<" => primitive(Op::Lt, major, &partial),
        "<=" => primitive(Op::Le, major, &partial),
        _ => None,
    }
}

/// Joins operators separated from their version by whitespace (`>= 1.2.3`).
fn tokenize(part: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending = String::new();
    for word in part.split_whitespace() {
        if word.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
            pending.push_str(word);
            continue;
        }
        tokens.push(format!("{}{}", pending, word));
        pending.clear();
    }
    if !pending.is_empty() {
        tokens.push(pending);
    }
    tokens
}

fn parse_set(part: &str) -> Option<Vec<Comparator>> {
    let part = part.trim();

    if let Some((from, to)) = part.split_once(" - ") {
        return hyphen(&Partial::parse(from)?, &Partial::parse(to)?);
    }

    let mut set = Vec::new();
    for token in tokenize(part) {
        set.extend(parse_comparator(&token)?);
    }
    Some(set)
}

/// A parsed npm range: a union of comparator sets.
///
/// # Example
///
/// ```
/// use iocscan::analyzer::version::NpmRange;
///
/// let range = NpmRange::parse("^1.0.0 || 3.x").unwrap();
/// assert!(range.satisfies_str("1.3.0"));
/// assert!(range.satisfies_str("3.9.1"));
/// assert!(!range.satisfies_str("2.0.0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRange {
    sets: Vec<Vec<Comparator>>,
}

impl NpmRange {
    /// Parses a range. Returns `None` for anything that is not a semver range
    /// (`latest`, git URLs, `file:`/`workspace:` specs, aliases).
    pub fn parse(raw: &str) -> Option<Self> {
        let sets = raw
            .split("||")
            .map(parse_set)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { sets })
    }

    /// Pre-release inclusive satisfaction check.
    pub fn satisfies(&self, candidate: &Version) -> bool {
        self.sets
            .iter()
            .any(|set| set.iter().all(|c| c.matches(candidate)))
    }

    /// Like [`satisfies`](Self::satisfies); unparseable versions never satisfy.
    pub fn satisfies_str(&self, candidate: &str) -> bool {
        parse_version(candidate).is_some_and(|v| self.satisfies(&v))
    }
}
