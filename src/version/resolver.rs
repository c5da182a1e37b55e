//! Latest version resolution across multiple sources
//!
//! Fans out one fetch per source through the bounded dispatcher, then reduces
//! the collected outcomes to a single version.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ResolverConfig;
use crate::source::Source;
use crate::version::dispatcher::dispatch;
use crate::version::error::ResolveError;
use crate::version::feed::{DefaultFeedConnector, FeedConnector};
use crate::version::fetcher::fetch_latest_from_source;
use crate::version::semver::Version;
use crate::version::types::{FetchOutcome, SourceOutcome};

/// Reduce per-source outcomes to the highest version found.
///
/// When no source found a version the error is
/// [`ResolveError::NoPrereleaseVersionsAvailable`] if prerelease versions were
/// requested and at least one source answered with nothing, and
/// [`ResolveError::PackageNotFound`] otherwise.
pub fn reduce_outcomes(
    package_id: &str,
    outcomes: &[SourceOutcome],
    include_prerelease: bool,
) -> Result<Version, ResolveError> {
    // Equal versions may be spelled differently ("1.0" vs "1.0.0"); break ties
    // on the text so the pick does not depend on completion order.
    let latest = outcomes
        .iter()
        .filter_map(|o| o.outcome.version())
        .max_by(|a, b| a.cmp(b).then_with(|| a.to_string().cmp(&b.to_string())));

    if let Some(version) = latest {
        return Ok(version.clone());
    }

    let failed_sources = outcomes.iter().filter(|o| o.outcome.is_failed()).count();
    let answered = outcomes.len() - failed_sources;
    if failed_sources > 0 {
        warn!(
            "{} of {} sources failed while resolving {}",
            failed_sources,
            outcomes.len(),
            package_id
        );
    }

    if include_prerelease && answered > 0 {
        Err(ResolveError::NoPrereleaseVersionsAvailable {
            package_id: package_id.to_string(),
        })
    } else {
        Err(ResolveError::PackageNotFound {
            package_id: package_id.to_string(),
            failed_sources,
        })
    }
}

/// Resolves the latest version of a package over a set of sources
pub struct LatestVersionResolver {
    connector: Arc<dyn FeedConnector>,
    config: ResolverConfig,
}

impl LatestVersionResolver {
    pub fn new(connector: Arc<dyn FeedConnector>, config: ResolverConfig) -> Self {
        Self { connector, config }
    }

    /// Resolver using the default feeds, configured by `config`
    pub fn from_config(config: ResolverConfig) -> Self {
        let connector = DefaultFeedConnector::new(Duration::from_millis(config.fetch_timeout_ms));
        Self::new(Arc::new(connector), config)
    }

    pub async fn resolve_latest_version(
        &self,
        sources: &[Source],
        package_id: &str,
        include_prerelease: bool,
    ) -> Result<Version, ResolveError> {
        self.resolve_latest_version_with_cancel(
            sources,
            package_id,
            include_prerelease,
            &CancellationToken::new(),
        )
        .await
    }

    /// Resolve, aborting every in-flight fetch if `cancel` fires
    pub async fn resolve_latest_version_with_cancel(
        &self,
        sources: &[Source],
        package_id: &str,
        include_prerelease: bool,
        cancel: &CancellationToken,
    ) -> Result<Version, ResolveError> {
        let outcomes = self
            .collect_outcomes(sources, package_id, include_prerelease, cancel)
            .await?;
        let latest = reduce_outcomes(package_id, &outcomes, include_prerelease)?;
        info!(
            "Resolved {} to {} across {} sources",
            package_id,
            latest,
            sources.len()
        );
        Ok(latest)
    }

    /// Query every source and return one outcome per source
    pub async fn collect_outcomes(
        &self,
        sources: &[Source],
        package_id: &str,
        include_prerelease: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<SourceOutcome>, ResolveError> {
        let limit = self.config.effective_parallelism(sources.len());
        let package_id: Arc<str> = Arc::from(package_id);

        dispatch(sources.to_vec(), limit, cancel, |source, token| {
            let connector = Arc::clone(&self.connector);
            let package_id = Arc::clone(&package_id);
            async move {
                fetch_latest_from_source(
                    connector.as_ref(),
                    &source,
                    &package_id,
                    include_prerelease,
                    &token,
                )
                .await
            }
        })
        .await
    }
}

impl Default for LatestVersionResolver {
    fn default() -> Self {
        Self::from_config(ResolverConfig::default())
    }
}

/// Resolve the latest version of `package_id` using the default feeds and settings
pub async fn resolve_latest_version(
    sources: &[Source],
    package_id: &str,
    include_prerelease: bool,
) -> Result<Version, ResolveError> {
    LatestVersionResolver::default()
        .resolve_latest_version(sources, package_id, include_prerelease)
        .await
}
