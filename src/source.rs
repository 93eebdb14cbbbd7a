//! Dictionary backends addressed by the `<term>.json` resource convention.
//!
//! A read resolves to `Ok(Some(entry))`, `Ok(None)` when the resource is
//! absent, or a [`FetchError`] for everything else. Callers never see finer
//! grained failure kinds than that two-way split.

use crate::BundledDictionary;
use crate::form::Entry;
use crate::term::Term;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dictionary responded with status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("malformed dictionary entry: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait DictionarySource: Send + Sync {
    async fn fetch(&self, term: &Term) -> Result<Option<Entry>, FetchError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// The dictionary compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledSource;

#[async_trait]
impl DictionarySource for BundledSource {
    async fn fetch(&self, term: &Term) -> Result<Option<Entry>, FetchError> {
        Ok(BundledDictionary::entry(term.as_str()).map(|entry| entry.to_entry()))
    }

    fn describe(&self) -> String {
        format!("bundled ({} terms)", BundledDictionary::len())
    }
}

/// A directory of `<term>.json` files on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, term: &Term) -> PathBuf {
        self.root.join(term.resource_name())
    }
}

#[async_trait]
impl DictionarySource for DirectorySource {
    async fn fetch(&self, term: &Term) -> Result<Option<Entry>, FetchError> {
        let path = self.path_for(term);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(FetchError::Io { path, source }),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

#[cfg(feature = "http")]
pub use http::HttpSource;

#[cfg(feature = "http")]
mod http {
    use super::{DictionarySource, FetchError};
    use crate::form::Entry;
    use crate::term::Term;
    use async_trait::async_trait;
    use reqwest::{Client, StatusCode};
    use std::time::Duration;

    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Static JSON resources served under an HTTP base path, e.g.
    /// `https://abbreve.example/server/db`.
    #[derive(Debug, Clone)]
    pub struct HttpSource {
        client: Client,
        base_url: String,
    }

    impl HttpSource {
        pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
            let client = Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .map_err(|err| FetchError::Transport(err.to_string()))?;
            Ok(Self::with_client(client, base_url))
        }

        pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
            let base_url = base_url.into().trim_end_matches('/').to_string();
            Self { client, base_url }
        }

        pub fn url_for(&self, term: &Term) -> String {
            format!("{}/{}", self.base_url, term.resource_name())
        }
    }

    #[async_trait]
    impl DictionarySource for HttpSource {
        async fn fetch(&self, term: &Term) -> Result<Option<Entry>, FetchError> {
            let response = self
                .client
                .get(self.url_for(term))
                .send()
                .await
                .map_err(|err| FetchError::Transport(err.to_string()))?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            let body = response
                .bytes()
                .await
                .map_err(|err| FetchError::Transport(err.to_string()))?;
            Ok(Some(serde_json::from_slice(&body)?))
        }

        fn describe(&self) -> String {
            format!("http {}", self.base_url)
        }
    }
}
