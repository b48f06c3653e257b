/// Transport kernel for the KuCoin REST API
///
/// Every request flows through the same pipeline:
///
/// 1. `RequestDescriptor` fixes method, path and parameters, and `prepare`
///    turns it into the exact query string and body that are sent.
/// 2. `Signer` signs `timestamp + method + request_uri + body` and yields the
///    `KC-API-*` headers for private endpoints.
/// 3. `RestClient::execute` sends the request, retrying idempotent calls on
///    transport failures and throttling under a `RetryConfig`.
/// 4. The envelope decoder turns `{code, msg, data}` into either data or a
///    typed `ExchangeError`.
/// 5. `Paginator` walks page-numbered results until the last page.
///
/// # Example
/// ```rust,no_run
/// use kucoin_rest::core::config::ExchangeConfig;
/// use kucoin_rest::core::kernel::*;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExchangeConfig::from_env("KUCOIN")?;
/// let signer = Arc::new(KucoinSigner::new(config.credentials()?));
/// let rest = RestClientBuilder::new(RestClientConfig::new(
///     config.rest_base_url(),
///     "kucoin".to_string(),
/// ))
/// .with_signer(signer)
/// .build()?;
///
/// let request = RequestDescriptor::get("/api/v1/accounts")
///     .with_params(Params::new().with("currency", "BTC"));
/// let accounts: serde_json::Value = rest.call(&request).await?.read_data()?;
/// # Ok(())
/// # }
/// ```
pub mod envelope;
pub mod pagination;
pub mod request;
pub mod rest;
pub mod retry;
pub mod signer;

pub use envelope::{decode, decode_response, ApiErrorKind, ApiResponse, SUCCESS_CODE};
pub use pagination::{Page, PaginationPage, PaginationParam, Paginator, DEFAULT_PAGE_SIZE};
pub use request::{Params, PreparedRequest, RequestDescriptor};
pub use rest::{RawResponse, ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use retry::{BackoffGate, RetryConfig, RetryPolicy};
pub use signer::{ApiKeyVersion, Credentials, KucoinSigner, SignedHeaders, Signer};
