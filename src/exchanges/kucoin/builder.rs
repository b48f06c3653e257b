use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{
    ApiKeyVersion, BackoffGate, KucoinSigner, ReqwestRest, RestClientBuilder, RestClientConfig,
    RetryConfig,
};
use crate::exchanges::kucoin::rest::KucoinRest;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builder for creating KuCoin REST clients
///
/// Without credentials the client can only reach public endpoints; private
/// calls then fail with `ConfigurationError` before anything is sent.
pub struct KucoinBuilder {
    config: ExchangeConfig,
    rest_timeout: Duration,
    retry: RetryConfig,
    backoff: Option<Arc<BackoffGate>>,
}

impl Default for KucoinBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KucoinBuilder {
    pub fn new() -> Self {
        Self {
            config: ExchangeConfig::read_only(),
            rest_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            backoff: None,
        }
    }

    /// Set the exchange configuration
    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set API credentials, keeping sandbox, key version and base URL
    pub fn with_credentials(mut self, api_key: String, secret_key: String, passphrase: String) -> Self {
        let mut config = ExchangeConfig::new(api_key, secret_key, passphrase)
            .sandbox(self.config.sandbox)
            .key_version(self.config.key_version);
        config.base_url = self.config.base_url.take();
        self.config = config;
        self
    }

    pub fn with_key_version(mut self, key_version: ApiKeyVersion) -> Self {
        self.config.key_version = key_version;
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Override the REST host, e.g. for a local mock server
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.config.base_url = Some(base_url);
        self
    }

    pub fn with_rest_timeout(mut self, timeout: Duration) -> Self {
        self.rest_timeout = timeout;
        self
    }

    pub fn with_rest_max_retries(mut self, retries: u32) -> Self {
        self.retry.max_retries = retries;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Share one backoff signal between several clients. Each client gets
    /// its own gate otherwise.
    pub fn with_backoff_gate(mut self, gate: Arc<BackoffGate>) -> Self {
        self.backoff = Some(gate);
        self
    }

    /// Build the REST client
    pub fn build(self) -> Result<KucoinRest<ReqwestRest>, ExchangeError> {
        let Self {
            config,
            rest_timeout,
            retry,
            backoff,
        } = self;

        let rest_config = RestClientConfig::new(config.rest_base_url(), "kucoin".to_string())
            .with_timeout(rest_timeout)
            .with_retry(retry);

        let gate = backoff.unwrap_or_else(|| Arc::new(BackoffGate::new()));
        let mut rest_builder = RestClientBuilder::new(rest_config).with_backoff_gate(gate);

        if config.has_credentials() {
            let signer = Arc::new(KucoinSigner::new(config.credentials()?));
            rest_builder = rest_builder.with_signer(signer);
        } else if has_partial_credentials(&config) {
            // Surfaces which field is missing
            config.credentials()?;
        }

        let rest = rest_builder.build()?;
        debug!(
            base_url = %rest.config().base_url,
            authenticated = rest.has_signer(),
            "Built KuCoin REST client"
        );

        Ok(KucoinRest::new(rest))
    }
}

fn has_partial_credentials(config: &ExchangeConfig) -> bool {
    !config.api_key.expose_secret().is_empty()
        || !config.secret_key.expose_secret().is_empty()
        || !config.passphrase.expose_secret().is_empty()
}

/// Build a client from `KUCOIN_*` environment variables
pub fn build_from_env() -> Result<KucoinRest<ReqwestRest>, ExchangeError> {
    let config = ExchangeConfig::from_env("KUCOIN")?;
    KucoinBuilder::new().with_config(config).build()
}
