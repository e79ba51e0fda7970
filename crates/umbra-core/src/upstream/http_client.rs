use bytes::Bytes;
use reqwest::{Client, ClientBuilder, Method};
use std::{sync::Arc, time::Duration};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::upstream::UpstreamError;

/// Longest error body kept in [`UpstreamError::HttpError`].
const MAX_ERROR_BODY: usize = 256;

/// Limits for the shared HTTP client.
///
/// Waiting for a slot is bounded: `permit_wait` normally, `permit_wait_when_scarce` once fewer
/// than `scarce_below` slots are left. Each call is a single attempt; moving on to another
/// endpoint is the fallback executor's job.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// In-flight request cap shared by every endpoint and the relay.
    pub concurrent_limit: usize,
    pub permit_wait: Duration,
    pub permit_wait_when_scarce: Duration,
    pub scarce_below: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 1000,
            permit_wait: Duration::from_millis(500),
            permit_wait_when_scarce: Duration::from_millis(200),
            scarce_below: 100,
        }
    }
}

/// reqwest client behind a semaphore, shared by RPC endpoints and the relay client.
///
/// There is no `Default` impl since building the underlying client can fail.
pub struct HttpClient {
    client: Client,
    slots: Arc<Semaphore>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// # Errors
    ///
    /// Fails if reqwest cannot build its client (TLS backend initialisation).
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// # Errors
    ///
    /// See [`HttpClient::new`].
    pub fn with_concurrency_limit(concurrent_limit: usize) -> Result<Self, UpstreamError> {
        Self::with_config(HttpClientConfig { concurrent_limit, ..HttpClientConfig::default() })
    }

    /// # Errors
    ///
    /// See [`HttpClient::new`].
    pub fn with_config(config: HttpClientConfig) -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(concat!("umbra/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(45))
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(100)
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "cannot build http client");
                UpstreamError::ConnectionFailed(format!("http client setup: {e}"))
            })?;

        let slots = Arc::new(Semaphore::new(config.concurrent_limit));
        Ok(Self { client, slots, config })
    }

    /// POSTs a JSON body and returns the raw response body.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Timeout`] when no slot frees up in time or the request times out
    /// - [`UpstreamError::ConcurrencyLimit`] when the slot pool is closed
    /// - [`UpstreamError::HttpError`] for a non-2xx status
    /// - [`UpstreamError::ConnectionFailed`] for anything else on the wire
    pub async fn post_json(
        &self,
        url: &str,
        body: Bytes,
        timeout: Duration,
    ) -> Result<Bytes, UpstreamError> {
        let (status, body) = self.send(Method::POST, url, Some(body), timeout).await?;
        success_body(status, body)
    }

    /// POSTs a JSON body and returns whatever status and body the server answered with.
    ///
    /// Only a failure to get an answer at all is an error; a 4xx or 5xx is handed back.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::post_json`], except that no [`UpstreamError::HttpError`] is
    /// produced.
    pub async fn post_json_passthrough(
        &self,
        url: &str,
        body: Bytes,
        timeout: Duration,
    ) -> Result<(u16, Bytes), UpstreamError> {
        self.send(Method::POST, url, Some(body), timeout).await
    }

    /// GETs `url` and returns the raw response body.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::post_json`].
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<Bytes, UpstreamError> {
        let (status, body) = self.send(Method::GET, url, None, timeout).await?;
        success_body(status, body)
    }

    async fn acquire(&self, url: &str) -> Result<OwnedSemaphorePermit, UpstreamError> {
        let free = self.slots.available_permits();
        let wait = if free < self.config.scarce_below {
            self.config.permit_wait_when_scarce
        } else {
            self.config.permit_wait
        };

        match tokio::time::timeout(wait, Arc::clone(&self.slots).acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(UpstreamError::ConcurrencyLimit(url.to_string())),
            Err(_elapsed) => {
                tracing::warn!(url, free, wait_ms = wait.as_millis() as u64, "no http slot free");
                Err(UpstreamError::Timeout)
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
        timeout: Duration,
    ) -> Result<(u16, Bytes), UpstreamError> {
        // held until the body has been read
        let _slot = self.acquire(url).await?;

        let mut request = self.client.request(method, url).timeout(timeout);
        if let Some(body) = body {
            request = request.header("content-type", "application/json").body(body);
        }

        let response = request.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| transport_error(&e))?;
        Ok((status, body))
    }

    #[cfg(test)]
    fn free_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

fn success_body(status: u16, body: Bytes) -> Result<Bytes, UpstreamError> {
    if (200..300).contains(&status) {
        return Ok(body);
    }
    let text = String::from_utf8_lossy(&body).into_owned();
    Err(UpstreamError::HttpError(status, truncate_body(text)))
}

/// Maps a reqwest failure without echoing hosts or addresses back to callers.
fn transport_error(error: &reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        return UpstreamError::Timeout;
    }
    let reason = if error.is_connect() {
        "connection refused or unreachable"
    } else if error.is_body() || error.is_decode() {
        "unreadable response body"
    } else if error.is_redirect() {
        "unexpected redirect"
    } else {
        "request failed"
    };
    UpstreamError::ConnectionFailed(reason.to_string())
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("... (truncated)");
    }
    body
}
