//! Ordering of content-pack versions found in storage keys.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Part {
    Number(u64),
    Text(String),
}

/// Where a version sits relative to its numeric release
///
/// Variant order is the sort order: `1.0.0.dev1 < 1.0.0-rc1 < 1.0.0 < 1.0.0.post1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Dev(Vec<Part>),
    Pre(Vec<Part>),
    Release,
    Post(Vec<Part>),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    release: Vec<u64>,
    stage: Stage,
    local: Option<Vec<Part>>,
}

/// A pack version such as `1.10.2`, ordered numerically per component
///
/// Trailing zero components are ignored when comparing (`1.2` == `1.2.0`). A
/// suffix after the numeric release marks a pre-release (`1.0.0-rc1`,
/// `1.0.0b2`) that sorts below the release itself, unless it is a `post` or
/// `dev` tag. A `+local` label sorts above the same version without one.
#[derive(Debug, Clone)]
pub struct PackVersion {
    raw: String,
    key: SortKey,
}

impl PackVersion {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim().trim_start_matches(['v', 'V']);
        let (public, local) = match trimmed.split_once('+') {
            Some((public, local)) => (public, Some(split_runs(local))),
            None => (trimmed, None),
        };

        let (mut release, suffix) = split_release(public);
        while release.last() == Some(&0) {
            release.pop();
        }

        let suffix = suffix.trim_start_matches(['.', '-', '_']).to_ascii_lowercase();
        let stage = if suffix.is_empty() {
            Stage::Release
        } else if suffix.starts_with("post") {
            Stage::Post(split_runs(&suffix))
        } else if suffix.starts_with("dev") {
            Stage::Dev(split_runs(&suffix))
        } else {
            Stage::Pre(split_runs(&suffix))
        };

        Self {
            raw: raw.to_string(),
            key: SortKey {
                release,
                stage,
                local,
            },
        }
    }

    /// The version exactly as it appeared in the key
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_prerelease(&self) -> bool {
        matches!(self.key.stage, Stage::Dev(_) | Stage::Pre(_))
    }
}

/// Leading dot-separated numbers and whatever follows them
fn split_release(version: &str) -> (Vec<u64>, &str) {
    let mut release = Vec::new();
    let mut rest = version;
    loop {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let Ok(number) = rest[..digits].parse::<u64>() else {
            break;
        };
        release.push(number);
        rest = &rest[digits..];
        match rest.strip_prefix('.') {
            Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => rest = next,
            _ => break,
        }
    }
    (release, rest)
}

/// `rc12.b` becomes `[rc, 12, b]`
fn split_runs(label: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let flush = |current: &mut String, parts: &mut Vec<Part>| {
        if current.is_empty() {
            return;
        }
        let part = current
            .parse::<u64>()
            .map_or_else(|_nan| Part::Text(current.to_ascii_lowercase()), Part::Number);
        parts.push(part);
        current.clear();
    };

    for c in label.chars() {
        if matches!(c, '.' | '-' | '_') {
            flush(&mut current, &mut parts);
            continue;
        }
        let switches_kind = current
            .chars()
            .last()
            .is_some_and(|last| last.is_ascii_digit() != c.is_ascii_digit());
        if switches_kind {
            flush(&mut current, &mut parts);
        }
        current.push(c);
    }
    flush(&mut current, &mut parts);
    parts
}

impl fmt::Display for PackVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for PackVersion {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PackVersion {}

impl PartialOrd for PackVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max(versions: &[&str]) -> String {
        versions
            .iter()
            .map(|v| PackVersion::parse(v))
            .max()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert_eq!(max(&["1.9.0", "1.10.0", "1.2.3"]), "1.10.0");
        assert!(PackVersion::parse("2.0.0") > PackVersion::parse("1.99.99"));
    }

    #[test]
    fn test_trailing_zeros_are_equal() {
        assert_eq!(PackVersion::parse("1.2"), PackVersion::parse("1.2.0"));
    }

    #[test]
    fn test_raw_string_preserved() {
        assert_eq!(PackVersion::parse("v1.0.1").as_str(), "v1.0.1");
        assert_eq!(PackVersion::parse("v1.0.1"), PackVersion::parse("1.0.1"));
    }

    #[test]
    fn test_prerelease_sorts_below_release() {
        assert!(PackVersion::parse("1.0.0") > PackVersion::parse("1.0.0-rc1"));
        assert!(PackVersion::parse("1.0.0") > PackVersion::parse("1.0.0b2"));
        assert!(PackVersion::parse("1.0.0-rc1") > PackVersion::parse("0.9.9"));
        assert_eq!(max(&["1.0.0-rc1", "1.0.0", "1.0.0-beta"]), "1.0.0");
        assert!(PackVersion::parse("1.0.0-rc1").is_prerelease());
        assert!(!PackVersion::parse("1.0.0").is_prerelease());
    }

    #[test]
    fn test_prerelease_tags_order() {
        assert!(PackVersion::parse("1.0.0-rc2") > PackVersion::parse("1.0.0-rc1"));
        assert!(PackVersion::parse("1.0.0-rc10") > PackVersion::parse("1.0.0-rc9"));
        assert!(PackVersion::parse("1.0.0-rc1") > PackVersion::parse("1.0.0-beta3"));
        assert!(PackVersion::parse("1.0.0-alpha") > PackVersion::parse("1.0.0.dev4"));
    }

    #[test]
    fn test_post_and_local_sort_above_release() {
        assert!(PackVersion::parse("1.0.0.post1") > PackVersion::parse("1.0.0"));
        assert!(PackVersion::parse("1.0.1") > PackVersion::parse("1.0.0.post1"));
        assert!(PackVersion::parse("1.0.0+build.7") > PackVersion::parse("1.0.0"));
    }
}
