//! Resolve the latest version of a package across multiple package feeds.

pub mod config;
pub mod logging;
pub mod source;
pub mod version;

pub use source::Source;
pub use source::evaluator::evaluate_sources;
pub use version::error::ResolveError;
pub use version::resolver::{LatestVersionResolver, resolve_latest_version};
pub use version::semver::Version;
