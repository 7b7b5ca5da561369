//! Remote object store over plain HTTP: `GET`/`PUT {base_url}/{bucket}/{key}`.
//!
//! Authenticates with an optional bearer token from `TRENDCAST_STORE_TOKEN`.

use super::store::ArtifactStore;
use super::ArtifactError;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Environment variable holding the store bearer token.
pub const STORE_TOKEN_ENV: &str = "TRENDCAST_STORE_TOKEN";

pub struct HttpObjectStore {
    client: reqwest::blocking::Client,
    base_url: String,
    bucket: String,
    token: Option<SecretString>,
}

impl HttpObjectStore {
    pub fn new(
        base_url: &str,
        bucket: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ArtifactError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArtifactError::Http(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
            token,
        })
    }

    pub fn from_env(base_url: &str, bucket: &str, timeout: Duration) -> Result<Self, ArtifactError> {
        let token = std::env::var(STORE_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(|t| SecretString::new(t.into()));
        Self::new(base_url, bucket, token, timeout)
    }

    pub fn object_url(&self, key: &str) -> String {
        if self.bucket.is_empty() {
            format!("{}/{}", self.base_url, key)
        } else {
            format!("{}/{}/{}", self.base_url, self.bucket, key)
        }
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }
}

impl ArtifactStore for HttpObjectStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, ArtifactError> {
        let url = self.object_url(key);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .map_err(|e| ArtifactError::Http(format!("GET {url}: {e}")))?;

        match response.status() {
            s if s.is_success() => response
                .bytes()
                .map(|b| b.to_vec())
                .map_err(|e| ArtifactError::Http(format!("GET {url}: body: {e}"))),
            StatusCode::NOT_FOUND => Err(ArtifactError::NotFound(key.to_string())),
            s => Err(ArtifactError::Http(format!("GET {url}: HTTP {}", s.as_u16()))),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let url = self.object_url(key);
        let response = self
            .authorize(self.client.put(&url))
            .body(bytes.to_vec())
            .send()
            .map_err(|e| ArtifactError::Http(format!("PUT {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArtifactError::Http(format!("PUT {url}: HTTP {}", status.as_u16())));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        if self.bucket.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, self.bucket)
        }
    }
}
