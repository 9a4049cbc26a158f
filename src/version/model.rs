//! Version representations and the rules for comparing them

use std::cmp::Ordering;
use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::VersionError;
use crate::version::range::Range;
use crate::version::semver::{clean, coerce, natural_cmp, parse_strict};

/// Length of a full commit hash
pub const COMMIT_HASH_LEN: usize = 40;

/// Minimum length of the short hash embedded in a channel label
pub const MIN_SHORT_HASH_LEN: usize = 6;

/// A resolved version in one of its supported forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Version {
    /// Semantic version (`1.2.3`, `v2.0.0-rc.1`)
    Semantic(SemanticVersion),
    /// Full commit hash
    Commit(CommitVersion),
    /// Rolling channel snapshot embedding a short commit hash
    Channel(ChannelVersion),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticVersion {
    main: String,
    app: Option<String>,
    prerelease: bool,
    strict: Option<semver::Version>,
    coerced: semver::Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitVersion {
    hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelVersion {
    label: String,
    short_hash: String,
}

impl Version {
    /// Build a version from an extracted string.
    ///
    /// A 40-character lowercase hex string is a commit; anything else must be
    /// a semantic version.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let trimmed = raw.trim();
        if is_commit_hash(trimmed) {
            return Version::commit(trimmed);
        }
        Version::semantic(trimmed)
    }

    pub fn semantic(raw: &str) -> Result<Self, VersionError> {
        Version::semantic_with(raw, None, None)
    }

    /// Build a semantic version with an optional secondary label and an
    /// optional prerelease override.
    pub fn semantic_with(
        raw: &str,
        app: Option<String>,
        prerelease: Option<bool>,
    ) -> Result<Self, VersionError> {
        let main = clean(raw);
        let strict = parse_strict(main);
        let coerced = match &strict {
            Some(v) => v.clone(),
            None => coerce(main).ok_or_else(|| VersionError::Parse(raw.to_string()))?,
        };
        let prerelease = prerelease.unwrap_or(!coerced.pre.is_empty());

        Ok(Version::Semantic(SemanticVersion {
            main: main.to_string(),
            app,
            prerelease,
            strict,
            coerced,
        }))
    }

    pub fn commit(hash: &str) -> Result<Self, VersionError> {
        if !is_commit_hash(hash) {
            return Err(VersionError::Parse(hash.to_string()));
        }
        Ok(Version::Commit(CommitVersion {
            hash: hash.to_string(),
        }))
    }

    /// Build a channel version from a snapshot label such as
    /// `nixos-24.05.1234.a1b2c3d`; the last `.`-separated segment is the
    /// short commit hash.
    pub fn channel(label: &str) -> Result<Self, VersionError> {
        let short_hash = label
            .rsplit_once('.')
            .map(|(_, hash)| hash)
            .filter(|hash| {
                hash.len() >= MIN_SHORT_HASH_LEN
                    && hash.len() < COMMIT_HASH_LEN
                    && hash.bytes().all(is_lower_hex)
            })
            .ok_or_else(|| VersionError::Parse(label.to_string()))?;

        Ok(Version::Channel(ChannelVersion {
            label: label.to_string(),
            short_hash: short_hash.to_string(),
        }))
    }

    /// Canonical display string
    pub fn main(&self) -> &str {
        match self {
            Version::Semantic(v) => &v.main,
            Version::Commit(v) => &v.hash,
            Version::Channel(v) => &v.label,
        }
    }

    /// Secondary display string, e.g. a Helm chart's appVersion
    pub fn app(&self) -> Option<&str> {
        match self {
            Version::Semantic(v) => v.app.as_deref(),
            Version::Commit(_) | Version::Channel(_) => None,
        }
    }

    pub fn is_prerelease(&self) -> bool {
        match self {
            Version::Semantic(v) => v.prerelease,
            Version::Commit(_) => false,
            Version::Channel(v) => v.label.contains("beta") || v.label.contains("pre"),
        }
    }

    /// Short commit hash embedded in a channel label
    pub fn short_hash(&self) -> Option<&str> {
        match self {
            Version::Channel(v) => Some(&v.short_hash),
            Version::Semantic(_) | Version::Commit(_) => None,
        }
    }

    /// Total order, ascending. Sort with `b.compare(a)` for newest first.
    pub fn compare(&self, other: &Version) -> Ordering {
        match (self, other) {
            (Version::Semantic(a), Version::Semantic(b)) => a.compare(b),
            (Version::Commit(a), Version::Commit(b)) => a.hash.cmp(&b.hash),
            (Version::Channel(a), Version::Channel(b)) => natural_cmp(&a.label, &b.label)
                .then_with(|| a.label.cmp(&b.label)),
            _ => self
                .rank()
                .cmp(&other.rank())
                .then_with(|| self.main().cmp(other.main())),
        }
    }

    /// Whether this version falls inside a version spec
    pub fn satisfies(&self, spec: &str) -> bool {
        match self {
            Version::Semantic(v) => Range::parse(spec)
                .map(|range| range.matches(v.effective()))
                .unwrap_or(false),
            Version::Commit(v) => v.hash == spec.trim(),
            Version::Channel(v) => v.label.starts_with(spec.trim()),
        }
    }

    /// Whether `other` is what this version stands for.
    ///
    /// Not symmetric: a channel is equivalent to any commit starting with its
    /// short hash, but a commit is never equivalent to a channel.
    pub fn equivalent(&self, other: &Version) -> bool {
        match (self, other) {
            (Version::Semantic(a), Version::Semantic(b)) => {
                a.main == b.main
                    || matches!((&a.strict, &b.strict), (Some(x), Some(y)) if x == y)
            }
            (Version::Commit(a), Version::Commit(b)) => a.hash == b.hash,
            (Version::Channel(a), Version::Channel(b)) => a.label == b.label,
            (Version::Channel(a), Version::Commit(b)) => b.hash.starts_with(&a.short_hash),
            (Version::Semantic(_), _) | (Version::Commit(_), _) | (Version::Channel(_), _) => {
                false
            }
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Version::Commit(_) => 0,
            Version::Channel(_) => 1,
            Version::Semantic(_) => 2,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Version::Semantic(_) => "semantic",
            Version::Commit(_) => "commit",
            Version::Channel(_) => "channel",
        }
    }
}

impl SemanticVersion {
    fn effective(&self) -> &semver::Version {
        self.strict.as_ref().unwrap_or(&self.coerced)
    }

    fn compare(&self, other: &SemanticVersion) -> Ordering {
        match (&self.strict, &other.strict) {
            (Some(a), Some(b)) => a.cmp(b).then_with(|| self.main.cmp(&other.main)),
            // Loose versions order by their coerced value, then by text.
            _ => self
                .coerced
                .cmp(&other.coerced)
                .then_with(|| self.main.cmp(&other.main)),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.app() {
            Some(app) => write!(f, "{} ({})", self.main(), app),
            None => f.write_str(self.main()),
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Version", 4)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("main", self.main())?;
        state.serialize_field("app", &self.app())?;
        state.serialize_field("prerelease", &self.is_prerelease())?;
        state.end()
    }
}

fn is_lower_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'a'..=b'f').contains(&b)
}

fn is_commit_hash(s: &str) -> bool {
    s.len() == COMMIT_HASH_LEN && s.bytes().all(is_lower_hex)
}
