//! Loading configured package sources from layered XML config files
//!
//! The format follows NuGet.Config:
//!
//! ```xml
//! <configuration>
//!   <packageSources>
//!     <clear />
//!     <add key="Contoso" value="https://contoso.org/v3/index.json" />
//!   </packageSources>
//!   <packageSourceCredentials>
//!     <Contoso>
//!       <add key="Username" value="user@contoso.com" />
//!       <add key="ClearTextPassword" value="secret" />
//!     </Contoso>
//!   </packageSourceCredentials>
//! </configuration>
//! ```

#[cfg(test)]
use mockall::automock;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::source::{Credentials, Source};
use crate::version::error::ConfigError;

static ENCODED_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_x([0-9A-Fa-f]{4})_").expect("encoded char pattern is valid"));

/// Trait for loading the canonical list of configured sources
#[cfg_attr(test, automock)]
pub trait SourceProvider: Send + Sync {
    /// Loads and merges sources from the given config files.
    ///
    /// Files are applied in order, later files overriding earlier ones.
    /// The result is deduplicated by URI.
    fn load_sources(&self, config_paths: &[PathBuf]) -> Result<Vec<Source>, ConfigError>;
}

/// Source provider reading NuGet.Config-style XML files
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlSettingsLoader;

impl SourceProvider for XmlSettingsLoader {
    fn load_sources(&self, config_paths: &[PathBuf]) -> Result<Vec<Source>, ConfigError> {
        let mut layers = Vec::with_capacity(config_paths.len());
        for path in config_paths {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            layers.push(parse_config(&content, path)?);
        }

        let sources = merge_layers(layers);
        debug!(
            "Loaded {} configured sources from {} config files",
            sources.len(),
            config_paths.len()
        );
        Ok(sources)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceEntry {
    Clear,
    Add { name: String, uri: String },
}

#[derive(Debug, Default)]
struct CredentialEntry {
    username: Option<String>,
    password: Option<String>,
    clear_text_password: Option<String>,
}

impl CredentialEntry {
    fn into_credentials(self, source_name: &str) -> Option<Credentials> {
        let password = self.clear_text_password.or(self.password);
        match (self.username, password) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => {
                warn!(
                    "Ignoring incomplete credentials for source '{}'",
                    source_name
                );
                None
            }
        }
    }
}

/// Sources and credentials declared by a single config file
#[derive(Debug, Default)]
struct ConfigLayer {
    sources: Vec<SourceEntry>,
    credentials: HashMap<String, CredentialEntry>,
}

/// Decode XML-encoded element names (`_x0020_` is a space)
fn decode_element_name(name: &str) -> String {
    ENCODED_CHAR
        .replace_all(name, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn key_value(element: &BytesStart, path: &Path) -> Result<(String, String), ConfigError> {
    let mut key = None;
    let mut value = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let text = attr
            .unescape_value()
            .map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .into_owned();
        match attr.key.as_ref() {
            b"key" => key = Some(text),
            b"value" => value = Some(text),
            _ => {}
        }
    }

    match (key, value) {
        (Some(key), Some(value)) => Ok((key, value)),
        _ => Err(ConfigError::Parse {
            path: path.to_path_buf(),
            message: "<add> element requires both 'key' and 'value' attributes".to_string(),
        }),
    }
}

fn handle_element(
    stack: &[String],
    element: &BytesStart,
    layer: &mut ConfigLayer,
    path: &Path,
) -> Result<(), ConfigError> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let parents: Vec<&str> = stack.iter().map(String::as_str).collect();

    match (parents.as_slice(), name.as_str()) {
        (["configuration", "packageSources"], "add") => {
            let (name, uri) = key_value(element, path)?;
            layer.sources.push(SourceEntry::Add { name, uri });
        }
        (["configuration", "packageSources"], "clear") => {
            layer.sources.push(SourceEntry::Clear);
        }
        (["configuration", "packageSourceCredentials", source_name], "add") => {
            let (key, value) = key_value(element, path)?;
            let entry = layer
                .credentials
                .entry(decode_element_name(source_name))
                .or_default();
            match key.as_str() {
                "Username" => entry.username = Some(value),
                "Password" => entry.password = Some(value),
                "ClearTextPassword" => entry.clear_text_password = Some(value),
                other => debug!("Ignoring credential setting '{}'", other),
            }
        }
        _ => {}
    }

    Ok(())
}

fn parse_config(content: &str, path: &Path) -> Result<ConfigLayer, ConfigError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut layer = ConfigLayer::default();
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                handle_element(&stack, &element, &mut layer, path)?;
                stack.push(String::from_utf8_lossy(element.name().as_ref()).into_owned());
            }
            Ok(Event::Empty(element)) => {
                handle_element(&stack, &element, &mut layer, path)?;
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: format!("at byte {}: {}", reader.buffer_position(), e),
                });
            }
        }
    }

    Ok(layer)
}

/// Merge layers in order into a URI-deduplicated source list.
///
/// A later declaration of a known URI replaces the earlier one in place.
fn merge_layers(layers: Vec<ConfigLayer>) -> Vec<Source> {
    let mut by_uri: IndexMap<String, String> = IndexMap::new();
    let mut credentials: HashMap<String, CredentialEntry> = HashMap::new();

    for layer in layers {
        for entry in layer.sources {
            match entry {
                SourceEntry::Clear => by_uri.clear(),
                SourceEntry::Add { name, uri } => {
                    by_uri.insert(uri, name);
                }
            }
        }
        credentials.extend(layer.credentials);
    }

    let credentials: HashMap<String, Credentials> = credentials
        .into_iter()
        .filter_map(|(name, entry)| entry.into_credentials(&name).map(|creds| (name, creds)))
        .collect();

    by_uri
        .into_iter()
        .map(|(uri, name)| {
            let creds = credentials.get(&name).cloned();
            let source = Source::named(name, uri);
            match creds {
                Some(creds) => source.with_credentials(creds),
                None => source,
            }
        })
        .collect()
}
