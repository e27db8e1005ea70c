//! Rate-limited candidate source wrapper
//!
//! Allows one request (fetch or hydrate) per period to the wrapped source,
//! shared by every caller of the wrapper. A zero period disables throttling.

use crate::types::{CandidateRaw, CandidateSource, FetchError, SearchQuery};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::time::Duration;

/// [`CandidateSource`] that spaces out requests to `inner`
pub struct ThrottledSource<S> {
    inner: S,
    /// One request per period, no burst
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl<S: CandidateSource> ThrottledSource<S> {
    pub fn new(inner: S, min_interval: Duration) -> Self {
        let rate_limiter = Quota::with_period(min_interval).map(RateLimiter::direct);
        Self { inner, rate_limiter }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn wait(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }
}

#[async_trait]
impl<S: CandidateSource> CandidateSource for ThrottledSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, query: &SearchQuery, limit: usize) -> Result<Vec<CandidateRaw>, FetchError> {
        self.wait().await;
        self.inner.fetch(query, limit).await
    }

    async fn hydrate(&self, candidate: CandidateRaw) -> Result<CandidateRaw, FetchError> {
        self.wait().await;
        self.inner.hydrate(candidate).await
    }
}
