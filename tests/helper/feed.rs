//! Feed test utilities

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use latest_version::config::ResolverConfig;
use latest_version::source::Source;
use latest_version::version::error::FeedError;
use latest_version::version::feed::{FeedConnector, MetadataFeed};
use latest_version::version::semver::Version;
use latest_version::version::types::{ListedVersion, MetadataQuery};
use latest_version::LatestVersionResolver;

/// What a scripted source does when queried
#[derive(Debug, Clone)]
enum Script {
    Versions(Vec<ListedVersion>),
    Fail(String),
}

/// Counters shared by every feed a [`ScriptedConnector`] hands out
#[derive(Debug, Default)]
pub struct FeedStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    running: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FeedStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// In-memory connector serving scripted versions per source URI
pub struct ScriptedConnector {
    scripts: HashMap<String, Script>,
    delay: Duration,
    stats: Arc<FeedStats>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            delay: Duration::ZERO,
            stats: Arc::new(FeedStats::default()),
        }
    }

    pub fn with_versions(mut self, uri: &str, versions: Vec<&str>) -> Self {
        let listed = versions
            .into_iter()
            .map(|v| ListedVersion::listed(Version::parse(v).unwrap()))
            .collect();
        self.scripts.insert(uri.to_string(), Script::Versions(listed));
        self
    }

    pub fn with_unlisted(mut self, uri: &str, version: &str) -> Self {
        let entry = ListedVersion::unlisted(Version::parse(version).unwrap());
        match self.scripts.get_mut(uri) {
            Some(Script::Versions(versions)) => versions.push(entry),
            _ => {
                self.scripts
                    .insert(uri.to_string(), Script::Versions(vec![entry]));
            }
        }
        self
    }

    pub fn with_failure(mut self, uri: &str, message: &str) -> Self {
        self.scripts
            .insert(uri.to_string(), Script::Fail(message.to_string()));
        self
    }

    /// Every query sleeps this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stats(&self) -> Arc<FeedStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl FeedConnector for ScriptedConnector {
    async fn connect(&self, source: &Source) -> Result<Box<dyn MetadataFeed>, FeedError> {
        let Some(script) = self.scripts.get(source.uri()).cloned() else {
            return Err(FeedError::Unsupported(format!(
                "No scripted feed for {}",
                source.uri()
            )));
        };
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedFeed {
            script,
            delay: self.delay,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct ScriptedFeed {
    script: Script,
    delay: Duration,
    stats: Arc<FeedStats>,
}

impl Drop for ScriptedFeed {
    fn drop(&mut self) {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetadataFeed for ScriptedFeed {
    async fn fetch_versions(
        &self,
        query: &MetadataQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<ListedVersion>, FeedError> {
        let now = self.stats.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);

        let slept = tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        };
        self.stats.running.fetch_sub(1, Ordering::SeqCst);
        if !slept {
            return Err(FeedError::Cancelled);
        }

        match &self.script {
            Script::Versions(versions) => Ok(versions
                .iter()
                .filter(|entry| query.admits(entry))
                .cloned()
                .collect()),
            Script::Fail(message) => Err(FeedError::InvalidResponse(message.clone())),
        }
    }
}

/// Create a resolver over the given connector
pub fn create_test_resolver(
    connector: ScriptedConnector,
    max_parallelism: usize,
) -> LatestVersionResolver {
    LatestVersionResolver::new(
        Arc::new(connector),
        ResolverConfig {
            max_parallelism,
            ..ResolverConfig::default()
        },
    )
}

/// Write a NuGet.Config with the given `(name, uri)` sources into `dir`
pub fn write_config(dir: &Path, file_name: &str, sources: &[(&str, &str)]) -> PathBuf {
    let entries: String = sources
        .iter()
        .map(|(name, uri)| format!("    <add key=\"{}\" value=\"{}\" />\n", name, uri))
        .collect();
    let content = format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n",
            "<configuration>\n  <packageSources>\n{}  </packageSources>\n</configuration>\n",
        ),
        entries
    );
    let path = dir.join(file_name);
    std::fs::write(&path, content).unwrap();
    path
}
