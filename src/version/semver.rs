use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

static COERCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap());

/// Strip cosmetic decoration from a version string.
///
/// Removes surrounding whitespace and a leading `=` or `v`/`V`, the way
/// release tags are usually written (`v1.2.3`, `=1.2.3`).
pub fn clean(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('=').unwrap_or(trimmed).trim_start();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
}

/// Parse a cleaned version string strictly.
pub fn parse_strict(version: &str) -> Option<Version> {
    Version::parse(version).ok()
}

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros.
/// Does NOT strip 'v' prefix (use `clean` first if needed).
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Coerce an arbitrary string into a semver::Version.
///
/// Tries the partial-version padding first, then falls back to the first
/// `MAJOR[.MINOR[.PATCH]]` run found anywhere in the string
/// (`release-1.4` -> `1.4.0`).
pub fn coerce(version: &str) -> Option<Version> {
    if let Some(parsed) = parse_version(version) {
        return Some(parsed);
    }

    let caps = COERCE_REGEX.captures(version)?;
    let part = |i: usize| -> Option<u64> {
        caps.get(i)
            .map(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(Some(0))
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Digit-run aware string ordering.
///
/// Runs of ASCII digits compare numerically, everything else compares
/// byte-wise, so `snap-10.a` sorts after `snap-9.b`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.as_bytes();
    let mut right = b.as_bytes();

    loop {
        match (left.first(), right.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_len = left.iter().take_while(|c| c.is_ascii_digit()).count();
                let r_len = right.iter().take_while(|c| c.is_ascii_digit()).count();
                let l_digits = trim_zeros(&left[..l_len]);
                let r_digits = trim_zeros(&right[..r_len]);

                let ord = l_digits
                    .len()
                    .cmp(&r_digits.len())
                    .then_with(|| l_digits.cmp(r_digits));
                if ord != Ordering::Equal {
                    return ord;
                }
                left = &left[l_len..];
                right = &right[r_len..];
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(r);
                }
                left = &left[1..];
                right = &right[1..];
            }
        }
    }
}

fn trim_zeros(digits: &[u8]) -> &[u8] {
    let zeros = digits.iter().take_while(|c| **c == b'0').count();
    &digits[zeros..]
}
