//! HTTP range source backed by the genome browser REST API.
//!
//! Exon queries are POSTed as JSON to `gene/exons/viewport` and
//! `gene/exons/range` under the configured base URL. Responses carry the
//! usual `{status, message, payload}` envelope.
//!
//! Identical queries are answered from a short-lived cache; failures are
//! returned as [`Error::RangeFetch`] without retrying.

use super::{ExonQuery, RangeSource};
use crate::types::{ApiResponse, Block, RangeQuery, ViewportQuery};
use crate::{Error, Result};
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const VIEWPORT_PATH: &str = "gene/exons/viewport";
const RANGE_PATH: &str = "gene/exons/range";
const CACHE_CAPACITY: u64 = 256;

pub struct HttpRangeSource {
    client: Client,
    base_url: Url,
    cache: Cache<ExonQuery, Arc<Vec<Block>>>,
}

impl HttpRangeSource {
    /// Create a new HttpRangeSource.
    ///
    /// # Arguments
    ///
    /// * `base_url` - REST API root (e.g., "https://ngb.example.com/catgenome/restapi")
    /// * `timeout` - Per-request timeout
    /// * `cache_ttl` - How long an identical query is served from cache
    pub fn new(base_url: &str, timeout: Duration, cache_ttl: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to create HTTP client: {}", e)))?;

        // Url::join replaces the last segment unless the base ends with '/'
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| Error::InvalidInput(format!("invalid server URL {}: {}", base_url, e)))?;

        let cache = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(CACHE_CAPACITY)
            .build();

        Ok(Self {
            client,
            base_url,
            cache,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Internal(format!("failed to build URL for {}: {}", path, e)))
    }

    async fn post_exons<Q: Serialize + Sync>(&self, path: &str, query: &Q) -> Result<Vec<Block>> {
        let url = self.endpoint(path)?;
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url.clone())
            .json(query)
            .send()
            .await
            .map_err(|e| Error::RangeFetch(format!("POST {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::RangeFetch(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let body = response
            .json::<ApiResponse<Vec<Block>>>()
            .await
            .map_err(|e| Error::RangeFetch(format!("failed to parse exon response: {}", e)))?;

        if !body.is_ok() {
            return Err(Error::RangeFetch(
                body.message
                    .unwrap_or_else(|| "server reported an error".to_string()),
            ));
        }

        Ok(body.payload.unwrap_or_default())
    }

    async fn fetch_cached(&self, query: ExonQuery) -> Result<Vec<Block>> {
        if let Some(blocks) = self.cache.get(&query).await {
            tracing::debug!("exon cache hit for {:?}", query);
            return Ok(blocks.as_ref().clone());
        }

        let blocks = match &query {
            ExonQuery::Viewport(q) => self.post_exons(VIEWPORT_PATH, q).await?,
            ExonQuery::Range(q) => self.post_exons(RANGE_PATH, q).await?,
        };

        self.cache.insert(query, Arc::new(blocks.clone())).await;
        Ok(blocks)
    }
}

#[async_trait]
impl RangeSource for HttpRangeSource {
    async fn exons_by_viewport(&self, query: &ViewportQuery) -> Result<Vec<Block>> {
        self.fetch_cached(ExonQuery::Viewport(query.clone())).await
    }

    async fn exons_by_range(&self, query: &RangeQuery) -> Result<Vec<Block>> {
        self.fetch_cached(ExonQuery::Range(query.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base_url: &str) -> HttpRangeSource {
        HttpRangeSource::new(base_url, Duration::from_secs(5), Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let source = source("https://ngb.example.com/catgenome/restapi");
        assert_eq!(
            source.endpoint(VIEWPORT_PATH).unwrap().as_str(),
            "https://ngb.example.com/catgenome/restapi/gene/exons/viewport"
        );
    }

    #[test]
    fn test_endpoint_with_trailing_slash() {
        let source = source("http://localhost:8080/restapi/");
        assert_eq!(
            source.endpoint(RANGE_PATH).unwrap().as_str(),
            "http://localhost:8080/restapi/gene/exons/range"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpRangeSource::new("not a url", Duration::from_secs(1), Duration::from_secs(1));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_fetch_failure() {
        let source = HttpRangeSource::new(
            "http://127.0.0.1:9",
            Duration::from_millis(500),
            Duration::from_secs(1),
        )
        .unwrap();
        let query = RangeQuery {
            chromosome_id: 1,
            id: 1,
            project_id: None,
            intron_length: 0,
            start_index: 1,
            end_index: 10,
        };
        let err = source.exons_by_range(&query).await.unwrap_err();
        assert!(err.is_fetch_failure());
    }
}
