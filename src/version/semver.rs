//! Version parsing and total ordering across release and pre-release parts

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::version::error::VersionParseError;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[vV]?(?P<release>\d+(?:\.\d+)*)(?:-(?P<pre>[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+(?P<meta>[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .expect("version pattern is valid")
});

/// A single dot-separated pre-release identifier.
///
/// Variant order matters: numeric identifiers always sort below alphanumeric ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Identifier {
    Numeric(u64),
    Alphanumeric(String),
}

impl Identifier {
    fn parse(raw: &str, original: &str) -> Result<Self, VersionParseError> {
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            raw.parse::<u64>()
                .map(Identifier::Numeric)
                .map_err(|_| VersionParseError::Overflow(original.to_string()))
        } else {
            Ok(Identifier::Alphanumeric(raw.to_string()))
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{}", n),
            Identifier::Alphanumeric(s) => f.write_str(s),
        }
    }
}

/// A parsed package version.
///
/// Equality and hashing follow the ordering: trailing zero release components
/// and build metadata are insignificant, so `1.0` equals `1.0.0+abc`.
#[derive(Debug, Clone)]
pub struct Version {
    release: Vec<u64>,
    pre: Vec<Identifier>,
    original: String,
}

impl Version {
    /// Parse a version string such as `1.2.3`, `1.0.0.4`, `v2.0.0-beta.1` or `1.0.0-rc.1+build.5`.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let captures = VERSION_PATTERN
            .captures(trimmed)
            .ok_or_else(|| VersionParseError::Invalid(trimmed.to_string()))?;

        let release = captures["release"]
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| VersionParseError::Overflow(trimmed.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let pre = match captures.name("pre") {
            Some(label) => label
                .as_str()
                .split('.')
                .map(|raw| Identifier::parse(raw, trimmed))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            release,
            pre,
            original: trimmed.to_string(),
        })
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn pre_release(&self) -> &[Identifier] {
        &self.pre
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Release components without trailing zeros, the canonical form used for hashing.
    fn significant_release(&self) -> &[u64] {
        let len = self
            .release
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |i| i + 1);
        &self.release[..len]
    }
}

fn compare_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let left = a.get(i).copied().unwrap_or(0);
            let right = b.get(i).copied().unwrap_or(0);
            left.cmp(&right)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_release(&self.release, &other.release).then_with(|| {
            match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_release().hash(state);
        self.pre.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}
