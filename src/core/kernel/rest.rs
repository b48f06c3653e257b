use crate::core::errors::ExchangeError;
use crate::core::kernel::envelope::{decode_response, peek_code, ApiResponse, RATE_LIMIT_CODE};
use crate::core::kernel::pagination::{PaginationPage, PaginationParam};
use crate::core::kernel::request::RequestDescriptor;
use crate::core::kernel::retry::{
    now_millis, BackoffGate, RetryConfig, RetryPolicy, DEFAULT_RATE_LIMIT_BACKOFF,
};
use crate::core::kernel::signer::Signer;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, trace, warn};

const RETRY_AFTER: &str = "retry-after";
const RATE_LIMIT_RESET: &str = "gw-ratelimit-reset";

/// Status and body of a completed HTTP exchange, before envelope decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// REST client trait for executing exchange requests
///
/// Implementations only have to move bytes: `execute` sends one logical call
/// (retrying it when its policy allows) and hands back the raw response.
/// Envelope decoding and pagination are layered on top by the provided methods.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Send a request and return the raw HTTP response
    ///
    /// # Arguments
    /// * `request` - Method, path, parameters and visibility of the call
    ///
    /// # Returns
    /// The status and body of the final attempt
    async fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse, ExchangeError>;

    /// Send a request and decode a successful envelope
    async fn call(&self, request: &RequestDescriptor) -> Result<ApiResponse, ExchangeError> {
        let response = self.execute(request).await?;
        decode_response(response.status, &response.body)
    }

    /// Fetch one page of a paginated endpoint
    ///
    /// The descriptor is left untouched; `currentPage` and `pageSize` are
    /// added to a copy of its parameters.
    async fn call_paginated(
        &self,
        request: &RequestDescriptor,
        param: &PaginationParam,
    ) -> Result<PaginationPage, ExchangeError> {
        let mut request = request.clone();
        param.read_param(request.params_mut());
        self.call(&request).await?.read_pagination_data()
    }

    /// Like `call`, but gives up with `TimeoutError` once `deadline` passes,
    /// including any time spent waiting between retries.
    async fn call_with_deadline(
        &self,
        request: &RequestDescriptor,
        deadline: Instant,
    ) -> Result<ApiResponse, ExchangeError> {
        tokio::time::timeout_at(deadline, self.call(request))
            .await
            .map_err(|_| {
                ExchangeError::TimeoutError(format!(
                    "Deadline exceeded for {} {}",
                    request.method(),
                    request.path()
                ))
            })?
    }
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API, without a trailing slash
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// User agent string to include in requests
    pub user_agent: String,
    /// Retry behavior for idempotent requests
    pub retry: RetryConfig,
}

impl RestClientConfig {
    /// Create a new configuration
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the API
    /// * `exchange_name` - Name of the exchange
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            exchange_name,
            timeout: Duration::from_secs(30),
            user_agent: concat!("kucoin-rest/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
    backoff: Option<Arc<BackoffGate>>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
            backoff: None,
        }
    }

    /// Set the signer for private requests
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Share a rate-limit backoff signal with other clients
    pub fn with_backoff_gate(mut self, gate: Arc<BackoffGate>) -> Self {
        self.backoff = Some(gate);
        self
    }

    /// Build the REST client
    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ExchangeError::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: self.signer,
            backoff: self.backoff,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
    backoff: Option<Arc<BackoffGate>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_signer", &self.signer.is_some())
            .field("has_backoff_gate", &self.backoff.is_some())
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    pub fn backoff_gate(&self) -> Option<&Arc<BackoffGate>> {
        self.backoff.as_ref()
    }

    /// Wait out an active backoff window before an idempotent attempt.
    /// Mutating requests are never delayed, only logged.
    async fn respect_backoff(&self, policy: RetryPolicy) {
        let Some(remaining) = self.backoff.as_ref().and_then(|gate| gate.remaining()) else {
            return;
        };

        match policy {
            RetryPolicy::Idempotent => {
                let remaining = remaining.min(self.config.retry.max_delay);
                debug!(
                    exchange = %self.config.exchange_name,
                    remaining_ms = remaining.as_millis() as u64,
                    "Waiting for rate-limit backoff"
                );
                tokio::time::sleep(remaining).await;
            }
            RetryPolicy::None => {
                warn!(
                    exchange = %self.config.exchange_name,
                    remaining_ms = remaining.as_millis() as u64,
                    "Sending mutating request during rate-limit backoff"
                );
            }
        }
    }

    /// One attempt: sign with a fresh timestamp, send, read the body.
    async fn send_once(&self, request: &RequestDescriptor) -> Result<RawResponse, ExchangeError> {
        let prepared = request.prepare(self.signer.as_deref(), now_millis())?;
        let url = format!("{}{}", self.config.base_url, prepared.request_uri());
        debug!(
            method = %prepared.method(),
            request_uri = %prepared.request_uri(),
            signed = prepared.signed_headers().is_some(),
            "Sending request"
        );

        let mut builder = self.client.request(prepared.method().clone(), &url);
        if let Some(headers) = prepared.signed_headers() {
            for (name, value) in headers.pairs() {
                builder = builder.header(name, value);
            }
        }
        if !prepared.body().is_empty() {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(prepared.body().to_string());
        }

        let response = builder.send().await?;
        let status = response.status();
        let hint = retry_after_hint(response.headers());
        let body = response.bytes().await?.to_vec();

        trace!(status = status.as_u16(), "Response body: {}", String::from_utf8_lossy(&body));

        if status == StatusCode::TOO_MANY_REQUESTS
            || peek_code(&body).as_deref() == Some(RATE_LIMIT_CODE)
        {
            if let Some(gate) = &self.backoff {
                gate.record(hint.unwrap_or(DEFAULT_RATE_LIMIT_BACKOFF));
            }
            return Err(ExchangeError::RateLimited { retry_after: hint });
        }

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(
        skip(self, request),
        fields(exchange = %self.config.exchange_name, method = %request.method(), path = %request.path())
    )]
    async fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse, ExchangeError> {
        let policy = RetryPolicy::for_method(request.method());
        let mut delays = self.config.retry.delays(policy);
        let mut attempt: u32 = 1;

        loop {
            self.respect_backoff(policy).await;

            let err = match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() => err,
                Err(err) => return Err(err),
            };

            let Some(delay) = delays.next() else {
                return Err(err);
            };
            let delay = err
                .retry_after()
                .map_or(delay, |hint| delay.max(hint.min(self.config.retry.max_delay)));

            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Server backoff hint on a throttled response: `Retry-After` in seconds,
/// else `gw-ratelimit-reset` in milliseconds.
pub fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
    };

    read(RETRY_AFTER)
        .map(Duration::from_secs)
        .or_else(|| read(RATE_LIMIT_RESET).map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::request::Params;
    use reqwest::header::HeaderValue;
    use std::sync::Mutex;

    /// Serves canned responses and records the parameters it was called with.
    struct CannedRest {
        responses: Mutex<Vec<RawResponse>>,
        seen: Mutex<Vec<Params>>,
        delay: Duration,
    }

    impl CannedRest {
        fn new(bodies: &[&str]) -> Self {
            Self {
                responses: Mutex::new(
                    bodies
                        .iter()
                        .rev()
                        .map(|b| RawResponse {
                            status: 200,
                            body: b.as_bytes().to_vec(),
                        })
                        .collect(),
                ),
                seen: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl RestClient for CannedRest {
        async fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse, ExchangeError> {
            self.seen.lock().unwrap().push(request.params().clone());
            tokio::time::sleep(self.delay).await;
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ExchangeError::TransportError("no response queued".to_string()))
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = RestClientConfig::new("https://api.kucoin.com/".to_string(), "kucoin".to_string());
        assert_eq!(config.base_url, "https://api.kucoin.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.user_agent.starts_with("kucoin-rest/"));

        let config = config.with_max_retries(0).with_timeout(Duration::from_secs(5));
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_without_signer() {
        let config = RestClientConfig::new("http://127.0.0.1:1".to_string(), "kucoin".to_string());
        let rest = RestClientBuilder::new(config).build().unwrap();
        assert!(!rest.has_signer());
        assert!(rest.backoff_gate().is_none());
    }

    #[test]
    fn test_retry_after_hint() {
        let mut headers = HeaderMap::new();
        assert!(retry_after_hint(&headers).is_none());

        headers.insert(RATE_LIMIT_RESET, HeaderValue::from_static("1500"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_millis(1500)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_secs(2)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_millis(1500)));
    }

    #[tokio::test]
    async fn test_call_decodes_envelope() {
        let rest = CannedRest::new(&[r#"{"code":"200000","data":1700000000000}"#]);
        let response = rest.call(&RequestDescriptor::get("/api/v1/timestamp").public()).await.unwrap();
        assert_eq!(response.read_data::<u64>().unwrap(), 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_call_paginated_adds_page_params_to_a_copy() {
        let rest = CannedRest::new(&[
            r#"{"code":"200000","data":{"currentPage":2,"pageSize":10,"totalNum":15,"totalPage":2,"items":[{"id":"x"}]}}"#,
        ]);
        let request = RequestDescriptor::get("/api/v1/fills")
            .with_params(Params::new().with("symbol", "BTC-USDT"));

        let page = rest
            .call_paginated(&request, &PaginationParam::new(2, 10))
            .await
            .unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.len(), 1);

        let seen = rest.seen.lock().unwrap();
        assert_eq!(seen[0].get("currentPage"), Some("2"));
        assert_eq!(seen[0].get("pageSize"), Some("10"));
        assert!(request.params().get("currentPage").is_none());
    }

    #[tokio::test]
    async fn test_call_with_deadline_times_out() {
        let mut rest = CannedRest::new(&[r#"{"code":"200000","data":null}"#]);
        rest.delay = Duration::from_millis(200);

        let deadline = Instant::now() + Duration::from_millis(20);
        let err = rest
            .call_with_deadline(&RequestDescriptor::get("/api/v1/accounts"), deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::TimeoutError(msg) if msg.contains("/api/v1/accounts")));
    }
}
