use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{ApiKeyVersion, Credentials};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

/// Production REST host.
pub const PRODUCTION_BASE_URL: &str = "https://api.kucoin.com";
/// Sandbox REST host.
pub const SANDBOX_BASE_URL: &str = "https://openapi-sandbox.kucoin.com";

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub passphrase: Secret<String>,
    pub key_version: ApiKeyVersion,
    pub sandbox: bool,
    pub base_url: Option<String>,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 6)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("passphrase", "[REDACTED]")?;
        state.serialize_field("key_version", &self.key_version)?;
        state.serialize_field("sandbox", &self.sandbox)?;
        state.serialize_field("base_url", &self.base_url)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ExchangeConfigHelper {
            api_key: String,
            secret_key: String,
            #[serde(default)]
            passphrase: String,
            #[serde(default)]
            key_version: ApiKeyVersion,
            #[serde(default)]
            sandbox: bool,
            base_url: Option<String>,
        }

        let helper = ExchangeConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
            passphrase: Secret::new(helper.passphrase),
            key_version: helper.key_version,
            sandbox: helper.sandbox,
            base_url: helper.base_url,
        })
    }
}

impl ExchangeConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String, passphrase: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            passphrase: Secret::new(passphrase),
            key_version: ApiKeyVersion::default(),
            sandbox: false,
            base_url: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_API_KEY` (e.g., `KUCOIN_API_KEY`)
    /// - `{PREFIX}_SECRET_KEY`
    /// - `{PREFIX}_PASSPHRASE`
    /// - `{PREFIX}_API_KEY_VERSION` (optional, `1` or `2`, defaults to `2`)
    /// - `{PREFIX}_SANDBOX` (optional, defaults to false)
    /// - `{PREFIX}_BASE_URL` (optional)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let api_key = required_var(&format!("{}_API_KEY", prefix))?;
        let secret_key = required_var(&format!("{}_SECRET_KEY", prefix))?;
        let passphrase = required_var(&format!("{}_PASSPHRASE", prefix))?;

        let key_version = match env::var(format!("{}_API_KEY_VERSION", prefix)) {
            Ok(raw) => raw.parse::<ApiKeyVersion>()?,
            Err(_) => ApiKeyVersion::default(),
        };

        let sandbox = env::var(format!("{}_SANDBOX", prefix))
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let base_url = env::var(format!("{}_BASE_URL", prefix)).ok();

        Ok(Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            passphrase: Secret::new(passphrase),
            key_version,
            sandbox,
            base_url,
        })
    }

    /// Create configuration from a .env file (if present) and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            // A missing file falls back to the process environment
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Configuration without credentials, usable for public endpoints only
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new(), String::new())
    }

    /// Check if this configuration has a complete credential set for private endpoints
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
            && !self.secret_key.expose_secret().is_empty()
            && !self.passphrase.expose_secret().is_empty()
    }

    #[must_use]
    pub const fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    #[must_use]
    pub const fn key_version(mut self, key_version: ApiKeyVersion) -> Self {
        self.key_version = key_version;
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub fn with_passphrase(mut self, passphrase: String) -> Self {
        self.passphrase = Secret::new(passphrase);
        self
    }

    /// REST host to use: explicit override first, then sandbox or production.
    pub fn rest_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            if self.sandbox {
                SANDBOX_BASE_URL.to_string()
            } else {
                PRODUCTION_BASE_URL.to_string()
            }
        })
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Build signing credentials. Fails when any field is empty.
    pub fn credentials(&self) -> Result<Credentials, ExchangeError> {
        Credentials::new(
            self.api_key.expose_secret().clone(),
            self.secret_key.expose_secret().clone(),
            self.passphrase.expose_secret().clone(),
            self.key_version,
        )
    }
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnvironmentVariable(name.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_selection() {
        let config = ExchangeConfig::read_only();
        assert_eq!(config.rest_base_url(), PRODUCTION_BASE_URL);

        let config = config.sandbox(true);
        assert_eq!(config.rest_base_url(), SANDBOX_BASE_URL);

        let config = config.base_url("http://127.0.0.1:9000".to_string());
        assert_eq!(config.rest_base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_has_credentials_requires_passphrase() {
        let config = ExchangeConfig::new("key".to_string(), "secret".to_string(), String::new());
        assert!(!config.has_credentials());
        assert!(matches!(
            config.credentials(),
            Err(ExchangeError::ConfigurationError(_))
        ));

        let config = config.with_passphrase("phrase".to_string());
        assert!(config.has_credentials());
        assert!(config.credentials().is_ok());
    }

    #[test]
    fn test_serialize_redacts_secrets() {
        let config = ExchangeConfig::new(
            "my-key".to_string(),
            "my-secret".to_string(),
            "my-phrase".to_string(),
        );
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("my-key"));
        assert!(!json.contains("my-secret"));
        assert!(!json.contains("my-phrase"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: ExchangeConfig =
            serde_json::from_str(r#"{"api_key":"k","secret_key":"s","base_url":null}"#).unwrap();
        assert_eq!(config.key_version, ApiKeyVersion::V2);
        assert!(!config.sandbox);
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_from_env_missing_variable() {
        let err = ExchangeConfig::from_env("KUCOIN_REST_TEST_UNSET").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvironmentVariable(name) if name == "KUCOIN_REST_TEST_UNSET_API_KEY"));
    }
}
