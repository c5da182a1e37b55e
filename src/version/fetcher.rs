//! Fetching the latest version visible at a single source

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::source::Source;
use crate::version::feed::FeedConnector;
use crate::version::types::{FetchOutcome, MetadataQuery};

/// Query one source for the highest version of a package.
///
/// Never fails: connection and feed errors are returned as
/// [`FetchOutcome::Failed`] so sibling fetches are unaffected. The feed
/// channel opened for this call is dropped before returning, on every path.
pub async fn fetch_latest_from_source(
    connector: &dyn FeedConnector,
    source: &Source,
    package_id: &str,
    include_prerelease: bool,
    cancel: &CancellationToken,
) -> FetchOutcome {
    let query = MetadataQuery::listed(package_id, include_prerelease);

    let feed = match connector.connect(source).await {
        Ok(feed) => feed,
        Err(e) => {
            warn!("Failed to open feed {}: {}", source, e);
            return FetchOutcome::Failed(e);
        }
    };

    let result = feed.fetch_versions(&query, cancel).await;
    drop(feed);

    match result {
        Ok(versions) => {
            let latest = versions
                .into_iter()
                .filter(|entry| query.admits(entry))
                .map(|entry| entry.version)
                .max();
            match latest {
                Some(version) => {
                    info!("Latest {} on {} is {}", package_id, source, version);
                    FetchOutcome::Found(version)
                }
                None => {
                    debug!("No matching versions of {} on {}", package_id, source);
                    FetchOutcome::NotFound
                }
            }
        }
        Err(e) => {
            warn!("Failed to fetch versions of {} from {}: {}", package_id, source, e);
            FetchOutcome::Failed(e)
        }
    }
}
