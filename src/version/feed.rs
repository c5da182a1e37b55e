//! Feed traits for fetching package metadata from a source

#[cfg(test)]
use mockall::automock;

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::FETCH_TIMEOUT_MS;
use crate::source::Source;
use crate::version::error::FeedError;
use crate::version::feeds::{LocalFolderFeed, NuGetV3Feed};
use crate::version::types::{ListedVersion, MetadataQuery};

/// A metadata channel opened against a single source
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait MetadataFeed: Send + Sync {
    /// Fetches every version of a package admitted by the query
    ///
    /// # Returns
    /// * `Ok(versions)` - Versions in no particular order; empty if the package is absent
    /// * `Err(FeedError)` - If the feed could not be queried
    async fn fetch_versions(
        &self,
        query: &MetadataQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<ListedVersion>, FeedError>;
}

/// Opens metadata channels for sources.
///
/// Every call returns a fresh channel owned by the caller; dropping it releases
/// whatever connection state it holds.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self, source: &Source) -> Result<Box<dyn MetadataFeed>, FeedError>;
}

/// Connector choosing the HTTP feed for `http(s)` sources and the folder feed otherwise
#[derive(Debug, Clone)]
pub struct DefaultFeedConnector {
    timeout: Duration,
}

impl DefaultFeedConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for DefaultFeedConnector {
    fn default() -> Self {
        Self::new(Duration::from_millis(FETCH_TIMEOUT_MS))
    }
}

#[async_trait::async_trait]
impl FeedConnector for DefaultFeedConnector {
    async fn connect(&self, source: &Source) -> Result<Box<dyn MetadataFeed>, FeedError> {
        if source.is_local() {
            debug!("Opening folder feed for {}", source);
            Ok(Box::new(LocalFolderFeed::new(source.uri())))
        } else {
            debug!("Opening HTTP feed for {}", source);
            Ok(Box::new(NuGetV3Feed::new(source, self.timeout)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::semver::Version;
    use tempfile::TempDir;

    #[tokio::test]
    async fn default_connector_opens_folder_feed_for_local_source() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("mypkg").join("1.2.0")).unwrap();
        let source = Source::new(root.path().to_string_lossy());

        let feed = DefaultFeedConnector::default().connect(&source).await.unwrap();
        let versions = feed
            .fetch_versions(
                &MetadataQuery::listed("MyPkg", false),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            versions,
            vec![ListedVersion::listed(Version::parse("1.2.0").unwrap())]
        );
    }

    #[tokio::test]
    async fn default_connector_opens_http_feed_for_remote_source() {
        let source = Source::new("https://api.nuget.org/v3/index.json");

        let result = DefaultFeedConnector::default().connect(&source).await;

        assert!(result.is_ok());
    }
}
