//! Rate-limited HTTP client wrapper.
//!
//! Wraps any `HttpClient` with a direct `governor` quota so a burst of
//! extractions cannot hammer the upstream.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::traits::http::{HttpClient, HttpRequest, HttpResponse};

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(nonzero!(1u32))
}

/// An `HttpClient` that waits for a permit before every request.
pub struct RateLimitedClient<C: HttpClient> {
    inner: C,
    limiter: Arc<DirectRateLimiter>,
}

impl<C: HttpClient> RateLimitedClient<C> {
    /// Allow at most `requests_per_second` (zero is treated as one).
    pub fn new(client: C, requests_per_second: u32) -> Self {
        Self::with_quota(client, Quota::per_second(non_zero(requests_per_second)))
    }

    /// Create with a custom quota.
    pub fn with_quota(client: C, quota: Quota) -> Self {
        Self {
            inner: client,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Sustained `requests_per_second` with bursts of up to `burst`.
    pub fn with_burst(client: C, requests_per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(non_zero(requests_per_second)).allow_burst(non_zero(burst));
        Self::with_quota(client, quota)
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for RateLimitedClient<C> {
    async fn send(&self, request: HttpRequest) -> FetchResult<HttpResponse> {
        self.limiter.until_ready().await;
        self.inner.send(request).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Builder for [`RateLimitedClient`].
pub struct RateLimitedClientBuilder<C: HttpClient> {
    client: C,
    requests_per_second: u32,
    burst: Option<u32>,
}

impl<C: HttpClient> RateLimitedClientBuilder<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            requests_per_second: 1,
            burst: None,
        }
    }

    pub fn requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps;
        self
    }

    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = Some(burst);
        self
    }

    pub fn build(self) -> RateLimitedClient<C> {
        match self.burst {
            Some(burst) => {
                RateLimitedClient::with_burst(self.client, self.requests_per_second, burst)
            }
            None => RateLimitedClient::new(self.client, self.requests_per_second),
        }
    }
}
