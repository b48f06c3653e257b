//! Request construction: ordered parameters, per-call descriptors and the
//! transport-ready form whose bytes are exactly the bytes that were signed.

use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{SignedHeaders, Signer};
use reqwest::Method;
use std::collections::BTreeMap;

/// Ordered parameter set. Keys are kept sorted so the query string and JSON
/// body come out identical for the same logical parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add the parameter only when a non-empty value is supplied.
    pub fn with_opt(mut self, key: impl Into<String>, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.insert(key, value);
        }
        self
    }

    /// Add a timestamp-like parameter only when it is positive.
    pub fn with_opt_i64(mut self, key: impl Into<String>, value: Option<i64>) -> Self {
        if let Some(value) = value.filter(|v| *v > 0) {
            self.insert(key, value.to_string());
        }
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Form-urlencoded query string, sorted by key. Empty for no parameters.
    pub fn to_query_string(&self) -> Result<String, ExchangeError> {
        serde_urlencoded::to_string(&self.0).map_err(|e| {
            ExchangeError::ConfigurationError(format!("Failed to encode query parameters: {}", e))
        })
    }

    /// Compact JSON object with sorted keys. `{}` for no parameters.
    pub fn to_json_body(&self) -> Result<String, ExchangeError> {
        serde_json::to_string(&self.0).map_err(|e| {
            ExchangeError::ConfigurationError(format!("Failed to serialize request body: {}", e))
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A single logical API call: method, path, parameters and whether the
/// endpoint is private. Built fresh for every call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    params: Params,
    private: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Params::new(),
            private: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn public(mut self) -> Self {
        self.private = false;
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Only GET is safe to replay.
    pub fn is_idempotent(&self) -> bool {
        self.method == Method::GET
    }

    fn carries_query(&self) -> bool {
        self.method == Method::GET || self.method == Method::DELETE
    }

    /// Build the transport-ready request for the given timestamp, signing it
    /// when the endpoint is private.
    pub fn prepare(
        &self,
        signer: Option<&dyn Signer>,
        timestamp: u64,
    ) -> Result<PreparedRequest, ExchangeError> {
        let (query_string, body) = if self.carries_query() {
            (self.params.to_query_string()?, String::new())
        } else {
            (String::new(), self.params.to_json_body()?)
        };

        let request_uri = if query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, query_string)
        };

        let signed_headers = if self.private {
            let signer = signer.ok_or_else(|| {
                ExchangeError::ConfigurationError(
                    "Authentication required but no signer provided".to_string(),
                )
            })?;
            Some(signer.sign_request(self.method.as_str(), &request_uri, &body, timestamp)?)
        } else {
            None
        };

        Ok(PreparedRequest {
            method: self.method.clone(),
            request_uri,
            body,
            signed_headers,
        })
    }
}

/// Transport-ready request. `request_uri` and `body` are sent verbatim.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: Method,
    request_uri: String,
    body: String,
    signed_headers: Option<SignedHeaders>,
}

impl PreparedRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn request_uri(&self) -> &str {
        &self.request_uri
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn signed_headers(&self) -> Option<&SignedHeaders> {
        self.signed_headers.as_ref()
    }
}
