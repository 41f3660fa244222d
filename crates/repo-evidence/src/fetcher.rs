//! Throttled, strictly sequential HTTP fetching.
//!
//! Requests are never issued concurrently. A fixed pause separates
//! consecutive requests so bulk reads stay under the host's abuse-detection
//! threshold. Batch fetches never abort: each failed slot carries its error.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::FetchError;

/// A single GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        FetchRequest {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Run `op` over `items` one at a time, pausing `delay` before every call.
///
/// The output has exactly one slot per input, in input order.
pub async fn run_sequential<'a, I, T, E, F, Fut>(
    items: &'a [I],
    delay: Duration,
    mut op: F,
) -> Vec<Result<T, E>>
where
    F: FnMut(&'a I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut slots = Vec::with_capacity(items.len());
    for item in items {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        slots.push(op(item).await);
    }
    slots
}

/// HTTP GET primitive; batches run sequentially with a fixed pause.
#[derive(Debug, Clone)]
pub struct RateLimitedFetcher {
    client: reqwest::Client,
}

impl RateLimitedFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        RateLimitedFetcher { client }
    }

    /// Issue one GET and return the body as text.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let response = self.send(request).await?;
        Ok(response.text().await?)
    }

    /// Issue one GET and decode the body as JSON.
    pub async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        request: &FetchRequest,
    ) -> Result<T, FetchError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Fetch every request sequentially, pausing `delay` before each one.
    /// Failures stay in their slot.
    pub async fn fetch_many(
        &self,
        requests: &[FetchRequest],
        delay: Duration,
    ) -> Vec<Result<String, FetchError>> {
        run_sequential(requests, delay, |req| self.fetch(req)).await
    }

    async fn send(&self, request: &FetchRequest) -> Result<reqwest::Response, FetchError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!(url = %request.url, "GET");
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url = %request.url, status = status.as_u16(), "fetch failed");
            return Err(FetchError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}
