//! Reconciles caller-requested sources with configured ones

use std::path::PathBuf;

use tracing::debug;

use crate::source::Source;
use crate::source::settings::{SourceProvider, XmlSettingsLoader};
use crate::version::error::ConfigError;

/// Evaluate requested sources against the sources configured in `config_paths`.
///
/// See [`evaluate_sources_with`].
pub fn evaluate_sources(
    requested: &[Source],
    config_paths: &[PathBuf],
) -> Result<Vec<Source>, ConfigError> {
    evaluate_sources_with(&XmlSettingsLoader, requested, config_paths)
}

/// Evaluate requested sources using the given provider.
///
/// Returns a list with the same length and order as `requested`. Each requested
/// source is swapped for the configured source with the same URI (bringing its
/// name and credentials along); sources without a match pass through unchanged.
/// Only a failure to load the configuration is an error.
pub fn evaluate_sources_with<P: SourceProvider + ?Sized>(
    provider: &P,
    requested: &[Source],
    config_paths: &[PathBuf],
) -> Result<Vec<Source>, ConfigError> {
    let configured = provider.load_sources(config_paths)?;

    Ok(requested
        .iter()
        .map(|source| {
            match configured.iter().find(|candidate| candidate.same_feed(source)) {
                Some(matched) => {
                    debug!("Using configured source {} for {}", matched, source.uri());
                    matched.clone()
                }
                None => source.clone(),
            }
        })
        .collect())
}
