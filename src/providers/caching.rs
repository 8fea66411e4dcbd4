use crate::core::cache::Cache;
use crate::core::financials::{CompanyFinancials, FinancialsProvider};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Serves financials from a cache while they are younger than `ttl`.
///
/// Only successful fetches are cached.
pub struct CachingFinancialsProvider<T: FinancialsProvider> {
    inner: T,
    namespace: String,
    cache: Arc<dyn Cache<String, CompanyFinancials>>,
    ttl: Duration,
}

impl<T: FinancialsProvider> CachingFinancialsProvider<T> {
    pub fn new(
        inner: T,
        namespace: &str,
        cache: Arc<dyn Cache<String, CompanyFinancials>>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner,
            namespace: namespace.to_string(),
            cache,
            ttl,
        }
    }

    fn key(&self, ticker: &str) -> String {
        format!("{}_{}", self.namespace, ticker.to_uppercase())
    }
}

#[async_trait]
impl<T: FinancialsProvider> FinancialsProvider for CachingFinancialsProvider<T> {
    async fn fetch_financials(&self, ticker: &str) -> Result<CompanyFinancials> {
        let key = self.key(ticker);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Using cached data for {}", ticker);
            return Ok(cached);
        }

        let financials = self.inner.fetch_financials(ticker).await?;
        self.cache
            .put(key, financials.clone(), Some(self.ttl))
            .await;
        Ok(financials)
    }
}
