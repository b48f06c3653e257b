use crate::core::config::ConfigError;
use crate::core::errors::ExchangeError;
use base64::engine::general_purpose;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_API_KEY: &str = "KC-API-KEY";
pub const HEADER_SIGN: &str = "KC-API-SIGN";
pub const HEADER_TIMESTAMP: &str = "KC-API-TIMESTAMP";
pub const HEADER_PASSPHRASE: &str = "KC-API-PASSPHRASE";
pub const HEADER_KEY_VERSION: &str = "KC-API-KEY-VERSION";

/// Signer trait for request authentication
///
/// Implementations turn a canonical request (method, request URI including the
/// query string, body string and a millisecond timestamp) into the headers the
/// exchange expects on private endpoints.
pub trait Signer: Send + Sync {
    /// Sign a request
    ///
    /// # Arguments
    /// * `method` - HTTP method in upper case (GET, POST, DELETE)
    /// * `request_uri` - Path plus `?query` when a query string is present
    /// * `body` - Serialized request body, empty when there is none
    /// * `timestamp` - Request timestamp in milliseconds since the epoch
    fn sign_request(
        &self,
        method: &str,
        request_uri: &str,
        body: &str,
        timestamp: u64,
    ) -> Result<SignedHeaders, ExchangeError>;
}

/// API key version, which decides how the passphrase header is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApiKeyVersion {
    /// Passphrase sent in plaintext.
    #[serde(rename = "1")]
    V1,
    /// Passphrase signed with the API secret.
    #[default]
    #[serde(rename = "2")]
    V2,
}

impl ApiKeyVersion {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V2 => "2",
        }
    }
}

impl fmt::Display for ApiKeyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiKeyVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Self::V1),
            "2" => Ok(Self::V2),
            other => Err(ConfigError::InvalidConfiguration(format!(
                "Unsupported API key version: {}",
                other
            ))),
        }
    }
}

/// Immutable credential set owned by a client instance.
#[derive(Debug, Clone)]
pub struct Credentials {
    api_key: Secret<String>,
    api_secret: Secret<String>,
    passphrase: Secret<String>,
    key_version: ApiKeyVersion,
}

impl Credentials {
    /// Create a credential set. Every field must be non-empty.
    pub fn new(
        api_key: String,
        api_secret: String,
        passphrase: String,
        key_version: ApiKeyVersion,
    ) -> Result<Self, ExchangeError> {
        let credentials = Self {
            api_key: Secret::new(api_key),
            api_secret: Secret::new(api_secret),
            passphrase: Secret::new(passphrase),
            key_version,
        };
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn key_version(&self) -> ApiKeyVersion {
        self.key_version
    }

    fn validate(&self) -> Result<(), ExchangeError> {
        let missing = [
            ("API key", self.api_key.expose_secret()),
            ("API secret", self.api_secret.expose_secret()),
            ("passphrase", self.passphrase.expose_secret()),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExchangeError::ConfigurationError(format!(
                "Private endpoint requires credentials, missing: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Authentication headers for a single request. Bound to its timestamp, so
/// never reuse them for another request.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub timestamp: String,
    pub signature: String,
    pub api_key: String,
    pub passphrase: String,
    pub key_version: ApiKeyVersion,
}

impl SignedHeaders {
    /// Header name/value pairs in the order they are attached.
    pub fn pairs(&self) -> [(&'static str, &str); 5] {
        [
            (HEADER_API_KEY, self.api_key.as_str()),
            (HEADER_SIGN, self.signature.as_str()),
            (HEADER_TIMESTAMP, self.timestamp.as_str()),
            (HEADER_PASSPHRASE, self.passphrase.as_str()),
            (HEADER_KEY_VERSION, self.key_version.as_str()),
        ]
    }
}

impl fmt::Debug for SignedHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedHeaders")
            .field("timestamp", &self.timestamp)
            .field("signature", &self.signature)
            .field("api_key", &"[REDACTED]")
            .field("passphrase", &"[REDACTED]")
            .field("key_version", &self.key_version)
            .finish()
    }
}

/// HMAC-SHA256 signer producing base64 signatures over
/// `timestamp + method + request_uri + body`.
pub struct KucoinSigner {
    credentials: Credentials,
}

impl KucoinSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// The string the signature is computed over.
    pub fn prehash(timestamp: u64, method: &str, request_uri: &str, body: &str) -> String {
        format!("{}{}{}{}", timestamp, method, request_uri, body)
    }

    fn hmac_base64(&self, payload: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::ConfigurationError(format!("Invalid secret key: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn passphrase_header(&self) -> Result<String, ExchangeError> {
        let passphrase = self.credentials.passphrase.expose_secret();
        match self.credentials.key_version {
            ApiKeyVersion::V1 => Ok(passphrase.clone()),
            ApiKeyVersion::V2 => self.hmac_base64(passphrase),
        }
    }
}

impl Signer for KucoinSigner {
    fn sign_request(
        &self,
        method: &str,
        request_uri: &str,
        body: &str,
        timestamp: u64,
    ) -> Result<SignedHeaders, ExchangeError> {
        self.credentials.validate()?;

        let prehash = Self::prehash(timestamp, method, request_uri, body);
        let signature = self.hmac_base64(&prehash)?;

        Ok(SignedHeaders {
            timestamp: timestamp.to_string(),
            signature,
            api_key: self.credentials.api_key.expose_secret().clone(),
            passphrase: self.passphrase_header()?,
            key_version: self.credentials.key_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: u64 = 1_700_000_000_000;

    fn signer(version: ApiKeyVersion) -> KucoinSigner {
        let credentials = Credentials::new(
            "test-key".to_string(),
            "test-secret".to_string(),
            "test-passphrase".to_string(),
            version,
        )
        .unwrap();
        KucoinSigner::new(credentials)
    }

    #[test]
    fn test_known_signature_for_get() {
        let headers = signer(ApiKeyVersion::V2)
            .sign_request("GET", "/api/v1/accounts?currency=BTC", "", TS)
            .unwrap();
        assert_eq!(headers.signature, "rmk5il4X3BItLjm5rzR6leT0wyLHykVG7QjNelcdibM=");
        assert_eq!(headers.timestamp, "1700000000000");
        assert_eq!(headers.api_key, "test-key");
    }

    #[test]
    fn test_known_signature_for_post_body() {
        let headers = signer(ApiKeyVersion::V2)
            .sign_request(
                "POST",
                "/api/v1/accounts",
                r#"{"currency":"BTC","type":"trade"}"#,
                TS,
            )
            .unwrap();
        assert_eq!(headers.signature, "VmDV4ahJO7OgLPohpOt4cDmGx2tAZjSwuA/go1Ei3wE=");
    }

    #[test]
    fn test_signature_is_deterministic() {
        let s = signer(ApiKeyVersion::V2);
        let first = s.sign_request("GET", "/api/v1/fills?pageSize=10", "", TS).unwrap();
        let second = s.sign_request("GET", "/api/v1/fills?pageSize=10", "", TS).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_signature_changes_with_any_input() {
        let s = signer(ApiKeyVersion::V2);
        let base = s.sign_request("GET", "/api/v1/fills?pageSize=10", "", TS).unwrap();

        let other_value = s.sign_request("GET", "/api/v1/fills?pageSize=11", "", TS).unwrap();
        let other_ts = s.sign_request("GET", "/api/v1/fills?pageSize=10", "", TS + 1).unwrap();
        let other_method = s.sign_request("DELETE", "/api/v1/fills?pageSize=10", "", TS).unwrap();

        assert_ne!(base.signature, other_value.signature);
        assert_ne!(base.signature, other_ts.signature);
        assert_ne!(base.signature, other_method.signature);
    }

    #[test]
    fn test_passphrase_v1_is_plaintext() {
        let headers = signer(ApiKeyVersion::V1)
            .sign_request("GET", "/api/v1/accounts", "", TS)
            .unwrap();
        assert_eq!(headers.passphrase, "test-passphrase");
        assert_eq!(headers.key_version, ApiKeyVersion::V1);
    }

    #[test]
    fn test_passphrase_v2_is_signed() {
        let headers = signer(ApiKeyVersion::V2)
            .sign_request("GET", "/api/v1/accounts", "", TS)
            .unwrap();
        assert_eq!(headers.passphrase, "UbgWiL7WdjQOVBl1OLuMgUbTl9VlKFsjFbLedtCDPrY=");
        assert_eq!(headers.pairs()[4], (HEADER_KEY_VERSION, "2"));
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let result = Credentials::new(
            "key".to_string(),
            String::new(),
            "phrase".to_string(),
            ApiKeyVersion::V2,
        );
        match result {
            Err(ExchangeError::ConfigurationError(msg)) => assert!(msg.contains("API secret")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let headers = signer(ApiKeyVersion::V1)
            .sign_request("GET", "/api/v1/accounts", "", TS)
            .unwrap();
        let debug = format!("{:?}", headers);
        assert!(!debug.contains("test-passphrase"));
        assert!(!debug.contains("test-key"));
    }

    #[test]
    fn test_key_version_parsing() {
        assert_eq!("1".parse::<ApiKeyVersion>().unwrap(), ApiKeyVersion::V1);
        assert_eq!(" 2 ".parse::<ApiKeyVersion>().unwrap(), ApiKeyVersion::V2);
        assert!("3".parse::<ApiKeyVersion>().is_err());
    }
}
