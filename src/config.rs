use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::version::error::ConfigError;

// =============================================================================
// Time-related constants
// =============================================================================

/// Timeout for a single feed request in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// File names
// =============================================================================

/// Name of the source configuration file looked up in default locations
pub const CONFIG_FILE_NAME: &str = "NuGet.Config";

/// Name of the default log file
pub const LOG_FILE_NAME: &str = "latest-version.log";

const APP_DIR_NAME: &str = "latest-version";

/// Resolver configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Upper bound on concurrently queried sources
    pub max_parallelism: usize,
    /// Per-request feed timeout in milliseconds
    pub fetch_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_parallelism: default_parallelism(),
            fetch_timeout_ms: FETCH_TIMEOUT_MS,
        }
    }
}

impl ResolverConfig {
    /// Load settings from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Number of fetches to run at once for `source_count` sources
    pub fn effective_parallelism(&self, source_count: usize) -> usize {
        self.max_parallelism.min(source_count).max(1)
    }
}

/// Number of available processing units
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

/// Default log file, written under [`state_dir`]
pub fn log_path() -> PathBuf {
    state_dir().join(LOG_FILE_NAME)
}

/// Per-user directory for files the tool writes.
///
/// `$XDG_STATE_HOME/latest-version` when set, then the platform's local data
/// directory, then the system temp directory.
pub fn state_dir() -> PathBuf {
    state_dir_from(
        std::env::var_os("XDG_STATE_HOME").map(PathBuf::from),
        dirs::data_local_dir(),
    )
}

fn state_dir_from(xdg_state_home: Option<PathBuf>, local_data: Option<PathBuf>) -> PathBuf {
    xdg_state_home
        .filter(|dir| dir.is_absolute())
        .or(local_data)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

/// Existing source config files, least specific first.
///
/// Looks for the user-level file under the platform config directory, then
/// for `NuGet.Config` in the working directory.
pub fn default_config_paths() -> Vec<PathBuf> {
    default_config_paths_with(dirs::config_dir(), std::env::current_dir().ok())
}

fn default_config_paths_with(
    config_dir: Option<PathBuf>,
    work_dir: Option<PathBuf>,
) -> Vec<PathBuf> {
    let user = config_dir.map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    let local = work_dir.map(|dir| dir.join(CONFIG_FILE_NAME));

    [user, local]
        .into_iter()
        .flatten()
        .filter(|path| path.is_file())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn resolver_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<ResolverConfig>(json!({
            "maxParallelism": 2
        }))
        .unwrap();

        assert_eq!(result.max_parallelism, 2);
        assert_eq!(result.fetch_timeout_ms, FETCH_TIMEOUT_MS);
    }

    #[test]
    fn resolver_config_from_json_file_parses_all_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "maxParallelism": 3, "fetchTimeoutMs": 500 }"#).unwrap();

        let result = ResolverConfig::from_json_file(&path).unwrap();

        assert_eq!(
            result,
            ResolverConfig {
                max_parallelism: 3,
                fetch_timeout_ms: 500,
            }
        );
    }

    #[test]
    fn resolver_config_from_json_file_reports_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ maxParallelism: }").unwrap();

        let result = ResolverConfig::from_json_file(&path);

        assert!(matches!(result, Err(ConfigError::Settings { .. })));
    }

    #[test]
    fn effective_parallelism_is_capped_by_source_count_and_never_zero() {
        let config = ResolverConfig {
            max_parallelism: 4,
            fetch_timeout_ms: FETCH_TIMEOUT_MS,
        };

        assert_eq!(config.effective_parallelism(10), 4);
        assert_eq!(config.effective_parallelism(2), 2);
        assert_eq!(config.effective_parallelism(0), 1);
    }

    #[rstest]
    #[case(Some("/var/state"), Some("/home/u/.local/share"), "/var/state/latest-version")]
    #[case(None, Some("/home/u/.local/share"), "/home/u/.local/share/latest-version")]
    #[case(Some("relative/state"), Some("/srv/data"), "/srv/data/latest-version")]
    fn state_dir_from_prefers_absolute_xdg_state_home(
        #[case] xdg_state_home: Option<&str>,
        #[case] local_data: Option<&str>,
        #[case] expected: &str,
    ) {
        let dir = state_dir_from(
            xdg_state_home.map(PathBuf::from),
            local_data.map(PathBuf::from),
        );

        assert_eq!(dir, PathBuf::from(expected));
    }

    #[test]
    fn state_dir_from_falls_back_to_temp_dir() {
        assert_eq!(
            state_dir_from(None, None),
            std::env::temp_dir().join(APP_DIR_NAME)
        );
    }

    #[test]
    fn default_config_paths_with_returns_existing_files_user_first() {
        let config_dir = TempDir::new().unwrap();
        let work_dir = TempDir::new().unwrap();
        let user_file = config_dir.path().join(APP_DIR_NAME).join(CONFIG_FILE_NAME);
        std::fs::create_dir_all(user_file.parent().unwrap()).unwrap();
        std::fs::write(&user_file, "<configuration />").unwrap();
        let local_file = work_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&local_file, "<configuration />").unwrap();

        let paths = default_config_paths_with(
            Some(config_dir.path().to_path_buf()),
            Some(work_dir.path().to_path_buf()),
        );

        assert_eq!(paths, vec![user_file, local_file]);
    }

    #[test]
    fn default_config_paths_with_skips_missing_files() {
        let work_dir = TempDir::new().unwrap();

        let paths = default_config_paths_with(None, Some(work_dir.path().to_path_buf()));

        assert!(paths.is_empty());
    }
}
