//! NuGet v3 HTTP feed implementation
//!
//! Resolves the registration resource from the service index and reads every
//! catalog entry of the package's registration pages.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::source::{Credentials, Source};
use crate::version::error::FeedError;
use crate::version::feed::MetadataFeed;
use crate::version::semver::Version;
use crate::version::types::{ListedVersion, MetadataQuery};

const USER_AGENT: &str = "latest-version";

/// Registration resource types, most preferred first
const REGISTRATION_TYPES: &[&str] = &[
    "RegistrationsBaseUrl/3.6.0",
    "RegistrationsBaseUrl/3.4.0",
    "RegistrationsBaseUrl",
];

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    resource_type: ResourceType,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResourceType {
    One(String),
    Many(Vec<String>),
}

impl ResourceType {
    fn is(&self, expected: &str) -> bool {
        match self {
            ResourceType::One(t) => t == expected,
            ResourceType::Many(types) => types.iter().any(|t| t == expected),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistrationIndex {
    #[serde(default)]
    items: Vec<RegistrationPage>,
}

/// A registration page; `items` is absent when the page must be fetched separately
#[derive(Debug, Deserialize)]
struct RegistrationPage {
    #[serde(rename = "@id")]
    id: String,
    items: Option<Vec<RegistrationLeaf>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationLeaf {
    catalog_entry: CatalogEntry,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    version: String,
    #[serde(default = "listed_by_default")]
    listed: bool,
}

fn listed_by_default() -> bool {
    true
}

/// Metadata channel for a NuGet v3 feed
pub struct NuGetV3Feed {
    client: Client,
    index_url: String,
    credentials: Option<Credentials>,
}

impl NuGetV3Feed {
    pub fn new(source: &Source, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            index_url: source.uri().to_string(),
            credentials: source.credentials().cloned(),
        })
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
            None => request,
        }
    }

    async fn send(&self, url: &str, cancel: &CancellationToken) -> Result<Response, FeedError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FeedError::Cancelled),
            response = self.request(url).send() => Ok(response?),
        }
    }

    /// GET a JSON document; `Ok(None)` on 404
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, FeedError> {
        debug!("Fetching {}", url);
        let response = self.send(url, cancel).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            warn!("Feed returned status {}: {}", status, url);
            return Err(FeedError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FeedError::Cancelled),
            body = response.json::<T>() => body,
        };

        body.map(Some).map_err(|e| {
            warn!("Failed to parse feed response from {}: {}", url, e);
            FeedError::InvalidResponse(e.to_string())
        })
    }

    async fn registration_base_url(&self, cancel: &CancellationToken) -> Result<String, FeedError> {
        let index: ServiceIndex = self
            .get_json(&self.index_url, cancel)
            .await?
            .ok_or_else(|| {
                FeedError::InvalidResponse(format!("Service index not found: {}", self.index_url))
            })?;

        REGISTRATION_TYPES
            .iter()
            .find_map(|expected| {
                index
                    .resources
                    .iter()
                    .find(|resource| resource.resource_type.is(expected))
            })
            .map(|resource| resource.id.clone())
            .ok_or_else(|| {
                FeedError::Unsupported(format!(
                    "{} does not expose a registration resource",
                    self.index_url
                ))
            })
    }

    async fn catalog_entries(
        &self,
        package_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CatalogEntry>, FeedError> {
        let base = self.registration_base_url(cancel).await?;
        let url = format!(
            "{}/{}/index.json",
            base.trim_end_matches('/'),
            package_id.to_lowercase()
        );

        let Some(index) = self.get_json::<RegistrationIndex>(&url, cancel).await? else {
            debug!("Package {} not found at {}", package_id, self.index_url);
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for page in index.items {
            let leaves = match page.items {
                Some(leaves) => leaves,
                None => self
                    .get_json::<RegistrationPage>(&page.id, cancel)
                    .await?
                    .and_then(|page| page.items)
                    .ok_or_else(|| {
                        FeedError::InvalidResponse(format!(
                            "Registration page {} is empty",
                            page.id
                        ))
                    })?,
            };
            entries.extend(leaves.into_iter().map(|leaf| leaf.catalog_entry));
        }

        Ok(entries)
    }
}

#[async_trait::async_trait]
impl MetadataFeed for NuGetV3Feed {
    async fn fetch_versions(
        &self,
        query: &MetadataQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<ListedVersion>, FeedError> {
        let entries = self.catalog_entries(&query.package_id, cancel).await?;

        let mut versions: Vec<ListedVersion> = entries
            .into_iter()
            .filter_map(|entry| match Version::parse(&entry.version) {
                Ok(version) => Some(ListedVersion {
                    version,
                    listed: entry.listed,
                }),
                Err(e) => {
                    warn!("Skipping unparseable version '{}': {}", entry.version, e);
                    None
                }
            })
            .filter(|entry| query.admits(entry))
            .collect();
        versions.sort_by(|a, b| a.version.cmp(&b.version));

        Ok(versions)
    }
}
