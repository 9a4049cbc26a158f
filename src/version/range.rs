//! Version-spec range expressions
//!
//! Supports npm-style range specifications:
//! - `1.2.3` - exact match; `1.2`, `1` and `1.2.x`, `1.x`, `*` - wildcards
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1.0.0 - 2.0.0` - inclusive hyphen range
//! - `>=1.0.0 <2.0.0` - space-separated AND, `^1 || ^2` - OR
//!
//! Every form is lowered to plain bounds. Missing components widen the
//! range the way npm does: `~2` is `>=2.0.0 <3.0.0`, `^0` is `<1.0.0` and
//! `1.0 - 2.0` is `>=1.0.0 <2.1.0`.

use semver::{Prerelease, Version};

use crate::error::VersionError;
use crate::version::semver::{clean, parse_strict};

/// A parsed range expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    alternatives: Vec<Vec<Comparator>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Comparator {
    Exact(Version),
    Gte(Version),
    Gt(Version),
    Lte(Version),
    Lt(Version),
}

/// A version with some trailing components left out or written as `x`
#[derive(Debug, Clone, PartialEq, Eq)]
enum Partial {
    Any,
    Major(u64),
    Minor(u64, u64),
    Full(Version),
}

impl Range {
    pub fn parse(spec: &str) -> Result<Self, VersionError> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(VersionError::InvalidRange(spec.to_string()));
        }

        let alternatives = trimmed
            .split("||")
            .map(|alt| parse_conjunction(alt.trim()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| VersionError::InvalidRange(spec.to_string()))?;

        Ok(Self { alternatives })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|all| all.iter().all(|c| c.matches(version)))
    }
}

fn parse_conjunction(spec: &str) -> Option<Vec<Comparator>> {
    if spec.is_empty() {
        return None;
    }

    if let Some((from, to)) = spec.split_once(" - ") {
        let from = Partial::parse(from)?;
        let to = Partial::parse(to)?;
        let mut comparators = from.at_least();
        comparators.extend(to.at_most());
        return Some(comparators);
    }

    let mut comparators = Vec::new();
    for part in join_operators(spec) {
        comparators.extend(Comparator::parse(&part)?);
    }
    Some(comparators)
}

/// Split on whitespace while keeping `>= 1.2.3` together as one comparator.
fn join_operators(spec: &str) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in spec.split_whitespace() {
        if matches!(token, ">=" | ">" | "<=" | "<" | "=" | "^" | "~") {
            pending_op = Some(token);
            continue;
        }
        match pending_op.take() {
            Some(op) => parts.push(format!("{op}{token}")),
            None => parts.push(token.to_string()),
        }
    }
    if let Some(op) = pending_op {
        parts.push(op.to_string());
    }
    parts
}

/// `major.minor.patch-0`, the lowest version at or above that release
fn upper(major: u64, minor: u64, patch: u64) -> Version {
    let mut version = Version::new(major, minor, patch);
    version.pre = Prerelease::new("0").unwrap_or(Prerelease::EMPTY);
    version
}

impl Partial {
    fn parse(spec: &str) -> Option<Self> {
        let spec = clean(spec);
        if let Some(version) = parse_strict(spec) {
            return Some(Partial::Full(version));
        }

        let parts: Vec<&str> = spec.split('.').collect();
        if parts.len() > 3 {
            return None;
        }
        let mut numbers = Vec::new();
        let mut wildcard = false;
        for part in parts {
            if matches!(part, "*" | "x" | "X") {
                wildcard = true;
            } else if wildcard {
                return None;
            } else {
                numbers.push(part.parse::<u64>().ok()?);
            }
        }

        match numbers.as_slice() {
            [] => Some(Partial::Any),
            [major] => Some(Partial::Major(*major)),
            [major, minor] => Some(Partial::Minor(*major, *minor)),
            [major, minor, patch] => Some(Partial::Full(Version::new(*major, *minor, *patch))),
            _ => None,
        }
    }

    /// Missing components filled with zero
    fn floor(&self) -> Version {
        match self {
            Partial::Any => Version::new(0, 0, 0),
            Partial::Major(major) => Version::new(*major, 0, 0),
            Partial::Minor(major, minor) => Version::new(*major, *minor, 0),
            Partial::Full(version) => version.clone(),
        }
    }

    /// Exclusive end of the versions a partial stands for
    fn ceiling(&self) -> Option<Version> {
        match self {
            Partial::Any | Partial::Full(_) => None,
            Partial::Major(major) => Some(upper(major.saturating_add(1), 0, 0)),
            Partial::Minor(major, minor) => Some(upper(*major, minor.saturating_add(1), 0)),
        }
    }

    fn at_least(&self) -> Vec<Comparator> {
        match self {
            Partial::Any => Vec::new(),
            _ => vec![Comparator::Gte(self.floor())],
        }
    }

    fn at_most(&self) -> Vec<Comparator> {
        match (self, self.ceiling()) {
            (Partial::Full(version), _) => vec![Comparator::Lte(version.clone())],
            (_, Some(ceiling)) => vec![Comparator::Lt(ceiling)],
            (_, None) => Vec::new(),
        }
    }

    fn above(&self) -> Vec<Comparator> {
        match (self, self.ceiling()) {
            (Partial::Full(version), _) => vec![Comparator::Gt(version.clone())],
            (_, Some(ceiling)) => vec![Comparator::Gte(ceiling)],
            (_, None) => vec![Comparator::Lt(upper(0, 0, 0))],
        }
    }

    fn below(&self) -> Vec<Comparator> {
        match self {
            Partial::Full(version) => vec![Comparator::Lt(version.clone())],
            _ => {
                let floor = self.floor();
                vec![Comparator::Lt(upper(floor.major, floor.minor, floor.patch))]
            }
        }
    }

    fn exactly(&self) -> Vec<Comparator> {
        match self {
            Partial::Full(version) => vec![Comparator::Exact(version.clone())],
            _ => {
                let mut comparators = self.at_least();
                comparators.extend(self.at_most());
                comparators
            }
        }
    }

    /// `~`: patch-level changes, or minor-level when only a major is given
    fn tilde(&self) -> Vec<Comparator> {
        let ceiling = match self {
            Partial::Any => return Vec::new(),
            Partial::Major(major) => upper(major.saturating_add(1), 0, 0),
            Partial::Minor(major, minor) => upper(*major, minor.saturating_add(1), 0),
            Partial::Full(v) => upper(v.major, v.minor.saturating_add(1), 0),
        };
        vec![Comparator::Gte(self.floor()), Comparator::Lt(ceiling)]
    }

    /// `^`: changes that keep the left-most non-zero component
    fn caret(&self) -> Vec<Comparator> {
        let ceiling = match self {
            Partial::Any => return Vec::new(),
            Partial::Major(major) => upper(major.saturating_add(1), 0, 0),
            Partial::Minor(0, minor) => upper(0, minor.saturating_add(1), 0),
            Partial::Minor(major, _) => upper(major.saturating_add(1), 0, 0),
            Partial::Full(v) if v.major > 0 => upper(v.major.saturating_add(1), 0, 0),
            Partial::Full(v) if v.minor > 0 => upper(0, v.minor.saturating_add(1), 0),
            Partial::Full(v) => upper(0, 0, v.patch.saturating_add(1)),
        };
        vec![Comparator::Gte(self.floor()), Comparator::Lt(ceiling)]
    }
}

impl Comparator {
    fn parse(spec: &str) -> Option<Vec<Self>> {
        if let Some(rest) = spec.strip_prefix(">=") {
            Partial::parse(rest).map(|p| p.at_least())
        } else if let Some(rest) = spec.strip_prefix('>') {
            Partial::parse(rest).map(|p| p.above())
        } else if let Some(rest) = spec.strip_prefix("<=") {
            Partial::parse(rest).map(|p| p.at_most())
        } else if let Some(rest) = spec.strip_prefix('<') {
            Partial::parse(rest).map(|p| p.below())
        } else if let Some(rest) = spec.strip_prefix('^') {
            Partial::parse(rest).map(|p| p.caret())
        } else if let Some(rest) = spec.strip_prefix('~') {
            Partial::parse(rest).map(|p| p.tilde())
        } else {
            Partial::parse(spec).map(|p| p.exactly())
        }
    }

    fn matches(&self, version: &Version) -> bool {
        match self {
            Comparator::Exact(v) => version == v,
            Comparator::Gte(v) => version >= v,
            Comparator::Gt(v) => version > v,
            Comparator::Lte(v) => version <= v,
            Comparator::Lt(v) => version < v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[rstest]
    #[case("1.2.3", "1.2.3", true)]
    #[case("v1.2.3", "1.2.3", true)]
    #[case("=1.2.3", "1.2.3", true)]
    #[case("1.2.3", "1.2.4", false)]
    #[case("^1.2.3", "1.9.0", true)]
    #[case("^1.2.3", "2.0.0", false)]
    #[case("^1.2.3", "2.0.0-rc.1", false)]
    #[case("^0.2.3", "0.2.9", true)]
    #[case("^0.2.3", "0.3.0", false)]
    #[case("^0.0.3", "0.0.3", true)]
    #[case("^0.0.3", "0.0.4", false)]
    #[case("~1.2.3", "1.2.9", true)]
    #[case("~1.2.3", "1.3.0", false)]
    #[case(">=1.0.0", "1.0.0", true)]
    #[case(">= 1.0.0", "0.9.0", false)]
    #[case("<1.0.0", "0.9.9", true)]
    #[case("*", "0.0.1", true)]
    #[case("1.x", "1.9.9", true)]
    #[case("1.x", "2.0.0", false)]
    #[case("2.0.x", "2.0.5", true)]
    #[case("2.0.x", "2.1.0", false)]
    #[case("1.0.0 - 2.0.0", "2.0.0", true)]
    #[case("1.0.0 - 2.0.0", "2.0.1", false)]
    #[case(">=1.0.0 <1.5.0", "1.4.9", true)]
    #[case(">=1.0.0 <1.5.0", "1.5.0", false)]
    #[case("^1.0.0 || ^2.0.0", "2.5.0", true)]
    #[case("^1.0.0 || ^2.0.0", "3.0.0", false)]
    fn matches_returns_expected(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        let range = Range::parse(spec).unwrap();
        assert_eq!(range.matches(&v(version)), expected, "{spec} vs {version}");
    }

    #[rstest]
    #[case("2.0", "2.0.5", true)]
    #[case("2.0", "2.1.0", false)]
    #[case("2", "2.1.0", true)]
    #[case("2", "3.0.0", false)]
    #[case("2", "1.9.9", false)]
    #[case("=2.0", "2.0.1", true)]
    #[case("~2", "2.1.0", true)]
    #[case("~2", "3.0.0", false)]
    #[case("~2.0", "2.0.9", true)]
    #[case("~2.0", "2.1.0", false)]
    #[case("^0", "0.4.0", true)]
    #[case("^0", "1.0.0", false)]
    #[case("^1", "1.9.0", true)]
    #[case("^1.2", "1.9.0", true)]
    #[case("^1.2", "1.1.0", false)]
    #[case("^0.2", "0.2.7", true)]
    #[case("^0.2", "0.3.0", false)]
    #[case("^0.0", "0.0.9", true)]
    #[case("^0.0", "0.1.0", false)]
    #[case(">1.2", "1.2.9", false)]
    #[case(">1.2", "1.3.0", true)]
    #[case(">1", "2.0.0", true)]
    #[case("<=1.2", "1.2.9", true)]
    #[case("<=1.2", "1.3.0", false)]
    #[case("<1.2", "1.1.9", true)]
    #[case("<1.2", "1.2.0", false)]
    #[case("1.0 - 2.0", "2.0.5", true)]
    #[case("1.0 - 2.0", "2.1.0", false)]
    #[case("1 - 2", "2.9.9", true)]
    #[case("1 - 2", "3.0.0", false)]
    #[case("1.5 - 2.0.0", "1.4.9", false)]
    fn partial_versions_widen_like_npm(
        #[case] spec: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        let range = Range::parse(spec).unwrap();
        assert_eq!(range.matches(&v(version)), expected, "{spec} vs {version}");
    }

    #[rstest]
    #[case("2.0", "2.0.5")]
    #[case("2", "2.1.0")]
    #[case("~2", "2.1.0")]
    #[case("^0", "0.4.0")]
    #[case("1.0 - 2.0", "2.0.5")]
    fn highest_match_among_candidates(#[case] spec: &str, #[case] expected: &str) {
        let candidates = ["2.1.0", "2.0.5", "2.0.1", "0.4.0", "1.5.0"].map(v);
        let range = Range::parse(spec).unwrap();

        let best = candidates.iter().filter(|c| range.matches(c)).max();

        assert_eq!(best, Some(&v(expected)), "{spec}");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("not-a-range")]
    #[case("^1.0.0 ||")]
    #[case("1.x.3")]
    #[case("1.2.3.4")]
    fn parse_rejects_invalid_ranges(#[case] spec: &str) {
        assert!(matches!(
            Range::parse(spec),
            Err(VersionError::InvalidRange(_))
        ));
    }
}
