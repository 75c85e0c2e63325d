use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{instrument, trace};
use url::Url;

use crate::state::ReqwestClient;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    ParseUrl(#[from] url::ParseError),
    #[error("blob storage responded with status code: {0}")]
    Status(StatusCode),
}

#[async_trait]
pub trait BlobStore: Send + Sync + Debug {
    /// Stores `data` under `key` and returns the public url of the object.
    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<Url, BlobError>;
}

#[derive(Clone)]
pub struct HttpBlobStore {
    client: ReqwestClient,
    endpoint: Url,
    public_base: Url,
    api_key: Option<String>,
}

impl Debug for HttpBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBlobStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("public_base", &self.public_base.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpBlobStore {
    pub fn new(
        client: ReqwestClient,
        endpoint: Url,
        public_base: Url,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: with_trailing_slash(endpoint),
            public_base: with_trailing_slash(public_base),
            api_key,
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<Url, BlobError> {
        let target = self.endpoint.join(key)?;
        let mut request = self
            .client
            .put(target)
            .header(CONTENT_TYPE, content_type)
            .body(data);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BlobError::Status(status));
        }
        trace!("stored blob");
        Ok(self.public_base.join(key)?)
    }
}

/// Keeps uploads in memory, for tests and local runs.
#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    public_base: Url,
    objects: Arc<RwLock<HashMap<String, (String, Bytes)>>>,
}

impl MemoryBlobStore {
    pub fn new(public_base: Url) -> Self {
        Self {
            public_base: with_trailing_slash(public_base),
            objects: Arc::default(),
        }
    }

    /// Content type and bytes stored under `key`.
    pub fn get(&self, key: &str) -> Option<(String, Bytes)> {
        self.objects
            .read()
            .expect("RWLock should never be poisoned")
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<Url, BlobError> {
        let url = self.public_base.join(key)?;
        self.objects
            .write()
            .expect("RWLock should never be poisoned")
            .insert(key.to_owned(), (content_type.to_owned(), data));
        Ok(url)
    }
}
