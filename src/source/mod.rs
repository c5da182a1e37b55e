//! Package sources and their configuration
//!
//! - [`settings`]: Loads configured sources from layered config files
//! - [`evaluator`]: Enriches caller-requested sources with configured ones

pub mod evaluator;
pub mod settings;

use std::fmt;

/// Credentials used to authenticate against a feed
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A package feed endpoint.
///
/// Two sources are the same feed when their URIs match exactly; the name and
/// credentials play no part in that identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    name: String,
    uri: String,
    credentials: Option<Credentials>,
}

impl Source {
    /// Creates a source whose name is its URI
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            name: uri.clone(),
            uri,
            credentials: None,
        }
    }

    pub fn named(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(self, credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns true when the URI points at a local folder rather than an HTTP feed
    pub fn is_local(&self) -> bool {
        let lower = self.uri.to_ascii_lowercase();
        !(lower.starts_with("http://") || lower.starts_with("https://"))
    }

    /// Returns true if both sources refer to the same feed
    pub fn same_feed(&self, other: &Source) -> bool {
        self.uri == other.uri
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == self.uri {
            f.write_str(&self.uri)
        } else {
            write!(f, "{} ({})", self.name, self.uri)
        }
    }
}
