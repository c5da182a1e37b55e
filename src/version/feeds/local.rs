//! Local folder feed
//!
//! Reads the hierarchical layout `{root}/{package id}/{version}/`.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::version::error::FeedError;
use crate::version::feed::MetadataFeed;
use crate::version::semver::Version;
use crate::version::types::{ListedVersion, MetadataQuery};

pub struct LocalFolderFeed {
    root: PathBuf,
}

impl LocalFolderFeed {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the package directory, matching the id case-insensitively
    async fn find_package_dir(&self, package_id: &str) -> Result<Option<PathBuf>, FeedError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if name.to_string_lossy().eq_ignore_ascii_case(package_id)
                && entry.file_type().await?.is_dir()
            {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    async fn read_versions(dir: &Path) -> Result<Vec<ListedVersion>, FeedError> {
        let mut versions = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match Version::parse(&name) {
                Ok(version) => versions.push(ListedVersion::listed(version)),
                Err(e) => debug!("Skipping {:?}: {}", entry.path(), e),
            }
        }
        Ok(versions)
    }
}

#[async_trait::async_trait]
impl MetadataFeed for LocalFolderFeed {
    async fn fetch_versions(
        &self,
        query: &MetadataQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<ListedVersion>, FeedError> {
        if cancel.is_cancelled() {
            return Err(FeedError::Cancelled);
        }

        let Some(package_dir) = self.find_package_dir(&query.package_id).await? else {
            debug!(
                "Package {} not found under {:?}",
                query.package_id, self.root
            );
            return Ok(Vec::new());
        };

        let mut versions: Vec<ListedVersion> = Self::read_versions(&package_dir)
            .await?
            .into_iter()
            .filter(|entry| query.admits(entry))
            .collect();
        versions.sort_by(|a, b| a.version.cmp(&b.version));

        Ok(versions)
    }
}
