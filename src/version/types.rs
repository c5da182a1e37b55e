use crate::source::Source;
use crate::version::error::FeedError;
use crate::version::semver::Version;

/// A version as reported by a feed, with its listing state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedVersion {
    pub version: Version,
    pub listed: bool,
}

impl ListedVersion {
    pub fn listed(version: Version) -> Self {
        Self {
            version,
            listed: true,
        }
    }

    pub fn unlisted(version: Version) -> Self {
        Self {
            version,
            listed: false,
        }
    }
}

/// What to ask a feed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataQuery {
    /// Package identifier, matched case-insensitively by feeds
    pub package_id: String,
    pub include_prerelease: bool,
    pub include_unlisted: bool,
}

impl MetadataQuery {
    /// A query for listed versions only
    pub fn listed(package_id: &str, include_prerelease: bool) -> Self {
        Self {
            package_id: package_id.to_string(),
            include_prerelease,
            include_unlisted: false,
        }
    }

    /// Returns true if the version passes the prerelease and unlisted filters
    pub fn admits(&self, entry: &ListedVersion) -> bool {
        (self.include_unlisted || entry.listed)
            && (self.include_prerelease || !entry.version.is_prerelease())
    }
}

/// Result of querying one source
#[derive(Debug)]
pub enum FetchOutcome {
    Found(Version),
    /// The package is absent, or every version was filtered out
    NotFound,
    Failed(FeedError),
}

impl FetchOutcome {
    pub fn version(&self) -> Option<&Version> {
        match self {
            FetchOutcome::Found(version) => Some(version),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}

/// Outcome paired with the source it came from
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: Source,
    pub outcome: FetchOutcome,
}
