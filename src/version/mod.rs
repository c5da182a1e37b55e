//! Version resolution layer
//!
//! Fetches package versions from every configured source concurrently and
//! reduces them to a single latest version.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Dispatcher  │────▶│   Fetcher   │────▶│    Feed     │
//! │  (bounded)  │     │ (per source)│     │ (nuget,dir) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐     ┌─────────────┐
//! │  Resolver   │────▶│   Semver    │
//! │  (reduce)   │     │ (ordering)  │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`dispatcher`]: Runs per-source fetches under a parallelism ceiling
//! - [`error`]: Error types for feeds, configuration and resolution
//! - [`feed`]: Feed traits and the default connector
//! - [`feeds`]: Concrete feeds (NuGet v3 HTTP, local folder)
//! - [`fetcher`]: Fetches the latest version from a single source
//! - [`resolver`]: Reduces outcomes and exposes the resolution entry points
//! - [`semver`]: Version parsing and ordering
//! - [`types`]: Fetch queries and outcomes

pub mod dispatcher;
pub mod error;
pub mod feed;
pub mod feeds;
pub mod fetcher;
pub mod resolver;
pub mod semver;
pub mod types;
