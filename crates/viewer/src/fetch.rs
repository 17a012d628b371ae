//! Network boundary for remote documents and tables.

use std::collections::HashMap;

use parking_lot::RwLock;
use reqwest::Url;
use runtime::BoxFuture;

#[derive(Debug)]
pub struct FetchError {
    pub location: String,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fetch {} failed: {}", self.location, self.message)
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl FetchError {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        location: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

pub trait Fetcher: Send + Sync {
    fn fetch_text<'a>(&'a self, location: &'a str) -> BoxFuture<'a, Result<String, FetchError>>;
}

/// HTTP(S) fetcher. Relative locations resolve against an optional base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Option<Url>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base: None,
        }
    }

    pub fn with_base(mut self, base: &str) -> Result<Self, FetchError> {
        let base = Url::parse(base)
            .map_err(|e| FetchError::with_source(base, "invalid base url", e))?;
        self.base = Some(base);
        Ok(self)
    }

    pub fn resolve(&self, location: &str) -> Result<Url, FetchError> {
        let resolved = match &self.base {
            Some(base) => base.join(location),
            None => Url::parse(location),
        };
        resolved.map_err(|e| FetchError::with_source(location, "invalid location", e))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text<'a>(&'a self, location: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            let url = self.resolve(location)?;
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::with_source(location, "request failed", e))?;
            let response = response
                .error_for_status()
                .map_err(|e| FetchError::with_source(location, "bad status", e))?;
            response
                .text()
                .await
                .map_err(|e| FetchError::with_source(location, "body read failed", e))
        })
    }
}

/// Serves text registered up front, for bundled assets and offline hosts.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    resources: RwLock<HashMap<String, String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location: impl Into<String>, text: impl Into<String>) {
        self.resources.write().insert(location.into(), text.into());
    }

    pub fn remove(&self, location: &str) -> Option<String> {
        self.resources.write().remove(location)
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch_text<'a>(&'a self, location: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
        let found = self.resources.read().get(location).cloned();
        Box::pin(async move { found.ok_or_else(|| FetchError::new(location, "not found")) })
    }
}

#[cfg(test)]
mod tests {
    use super::{Fetcher, HttpFetcher, MemoryFetcher};

    #[tokio::test]
    async fn memory_fetcher_serves_registered_text() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("countries.csv", "code,latitude,longitude,name\n");
        assert_eq!(
            fetcher.fetch_text("countries.csv").await.unwrap(),
            "code,latitude,longitude,name\n"
        );

        fetcher.remove("countries.csv");
        let err = fetcher.fetch_text("countries.csv").await.unwrap_err();
        assert_eq!(err.location, "countries.csv");
    }

    #[test]
    fn http_fetcher_resolves_relative_locations() {
        let fetcher = HttpFetcher::new()
            .with_base("https://example.com/app/")
            .unwrap();
        assert_eq!(
            fetcher.resolve("data/borders.geojson").unwrap().as_str(),
            "https://example.com/app/data/borders.geojson"
        );
        assert!(HttpFetcher::new().resolve("relative.csv").is_err());
    }
}
