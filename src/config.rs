use crate::form::COPY_FEEDBACK_DELAY;
use crate::source::{BundledSource, DictionarySource, DirectorySource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("dictionary directory {0} does not exist")]
    MissingDirectory(PathBuf),
    #[error("dictionary base url {0:?} must start with http:// or https://")]
    InvalidBaseUrl(String),
    #[error("HTTP dictionaries need the `http` feature")]
    HttpDisabled,
    #[error("could not build HTTP client: {0}")]
    Client(String),
}

/// Where dictionary entries are read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceConfig {
    #[default]
    Bundled,
    Directory(PathBuf),
    Http(String),
}

impl SourceConfig {
    pub fn open(&self) -> Result<Arc<dyn DictionarySource>, ConfigError> {
        match self {
            SourceConfig::Bundled => Ok(Arc::new(BundledSource)),
            SourceConfig::Directory(path) => {
                if !path.is_dir() {
                    return Err(ConfigError::MissingDirectory(path.clone()));
                }
                Ok(Arc::new(DirectorySource::new(path.clone())))
            }
            SourceConfig::Http(base_url) => open_http(base_url),
        }
    }
}

#[cfg(feature = "http")]
fn open_http(base_url: &str) -> Result<Arc<dyn DictionarySource>, ConfigError> {
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(base_url.to_string()));
    }
    let source = crate::source::HttpSource::new(base_url)
        .map_err(|err| ConfigError::Client(err.to_string()))?;
    Ok(Arc::new(source))
}

#[cfg(not(feature = "http"))]
fn open_http(_base_url: &str) -> Result<Arc<dyn DictionarySource>, ConfigError> {
    Err(ConfigError::HttpDisabled)
}

#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Origin share links are built against.
    pub origin: String,
    pub source: SourceConfig,
    pub feedback_delay: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            source: SourceConfig::default(),
            feedback_delay: COPY_FEEDBACK_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = SourceConfig::Directory(dir.path().join("absent"));
        assert!(matches!(
            config.open(),
            Err(ConfigError::MissingDirectory(_))
        ));
        assert!(SourceConfig::Directory(dir.path().to_path_buf()).open().is_ok());
    }

    #[cfg(feature = "http")]
    #[test]
    fn http_base_url_needs_a_scheme() {
        let config = SourceConfig::Http("abbreve.example/server/db".to_string());
        assert!(matches!(config.open(), Err(ConfigError::InvalidBaseUrl(_))));
    }
}
