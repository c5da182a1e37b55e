//! Feed implementations for fetching package versions

pub mod local;
pub mod nuget;

pub use local::LocalFolderFeed;
pub use nuget::NuGetV3Feed;
