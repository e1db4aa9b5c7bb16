use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::RETRY_AFTER;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{IngestError, Result};

// ─── RateLimitedClient ────────────────────────────────────────────────────────

/// HTTP client that spaces requests, bounds each one with a timeout and
/// retries transport failures with exponential backoff.
pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    max_retries: u32,
    timeout: Duration,
}

impl RateLimitedClient {
    pub fn new(
        min_interval: Duration,
        max_retries: u32,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
            max_retries,
            timeout,
        })
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            match self.client.get(url).send().await {
                Ok(r) if r.status() == 429 => {
                    let wait = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    // A wait longer than the request timeout is treated as a failed lookup.
                    if attempt >= self.max_retries || Duration::from_secs(wait) > self.timeout {
                        return Err(IngestError::RateLimit(url.to_string(), wait));
                    }
                    sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Ok(r) if !r.status().is_success() => {
                    return Err(IngestError::ResolverUnavailable(format!(
                        "HTTP {} from {url}",
                        r.status().as_u16()
                    )));
                }
                Ok(r) => return r.text().await.map_err(IngestError::Http),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(IngestError::Http(e));
                    }
                    let backoff = 2u64.pow(attempt);
                    tracing::debug!(url, attempt, "request failed, retrying in {backoff}s: {e}");
                    sleep(Duration::from_secs(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }
}
