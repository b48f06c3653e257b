//! The `{code, data, msg}` envelope wrapped around every REST response.

use crate::core::errors::ExchangeError;
use crate::core::kernel::pagination::PaginationPage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

/// `code` of every successful response.
pub const SUCCESS_CODE: &str = "200000";
/// `code` returned when a request is throttled.
pub const RATE_LIMIT_CODE: &str = "429000";

/// Broad category of an exchange rejection, derived from its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Authentication,
    InvalidParameter,
    InsufficientBalance,
    NotFound,
    RateLimited,
    Server,
    Other,
}

impl ApiErrorKind {
    /// Classify an envelope code, or an HTTP status used as a code when the
    /// body carried no envelope.
    pub fn from_code(code: &str) -> Self {
        match code {
            "400001" | "400002" | "400003" | "400004" | "400005" | "400006" | "400007"
            | "401" | "403" => Self::Authentication,
            "400100" | "400" => Self::InvalidParameter,
            "200004" => Self::InsufficientBalance,
            "404000" | "404" => Self::NotFound,
            RATE_LIMIT_CODE | "429" => Self::RateLimited,
            "500000" => Self::Server,
            c if c.len() == 3 && c.starts_with('5') => Self::Server,
            _ => Self::Other,
        }
    }
}

/// Decoded response envelope. `data` stays raw until the caller picks a shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(deserialize_with = "code_as_string")]
    pub code: String,
    #[serde(default, alias = "message", deserialize_with = "null_as_empty_string")]
    pub msg: String,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

impl ApiResponse {
    /// Parse an envelope without checking its code.
    pub fn from_slice(body: &[u8]) -> Result<Self, ExchangeError> {
        serde_json::from_slice(body).map_err(|e| {
            ExchangeError::decode(format!("Failed to parse response envelope: {}", e), body)
        })
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Turn a non-success envelope into `ApiError`, keeping code and message.
    pub fn ensure_success(self) -> Result<Self, ExchangeError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ExchangeError::ApiError {
                code: self.code,
                message: self.msg,
            })
        }
    }

    /// Raw `data` payload, `null` when absent.
    pub fn raw_data(&self) -> &str {
        self.data.as_deref().map_or("null", RawValue::get)
    }

    /// Decode `data` into the caller's shape.
    pub fn read_data<T: DeserializeOwned>(&self) -> Result<T, ExchangeError> {
        let raw = self.raw_data();
        serde_json::from_str(raw).map_err(|e| {
            ExchangeError::decode(format!("Failed to decode response data: {}", e), raw.as_bytes())
        })
    }

    /// Decode `data` as a paginated result.
    pub fn read_pagination_data(&self) -> Result<PaginationPage, ExchangeError> {
        self.read_data()
    }
}

/// Decode a raw HTTP response into a successful envelope.
///
/// A body that is not an envelope is reported as `ApiError` with the HTTP
/// status as code when the status is not 2xx, and as `DecodeError` otherwise.
pub fn decode_response(status: u16, body: &[u8]) -> Result<ApiResponse, ExchangeError> {
    match serde_json::from_slice::<ApiResponse>(body) {
        Ok(envelope) => envelope.ensure_success(),
        Err(_) if !(200..300).contains(&status) => Err(ExchangeError::ApiError {
            code: status.to_string(),
            message: String::from_utf8_lossy(body).into_owned(),
        }),
        Err(e) => Err(ExchangeError::decode(
            format!("Failed to parse response envelope: {}", e),
            body,
        )),
    }
}

/// Decode a raw HTTP response straight into `T`.
pub fn decode<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, ExchangeError> {
    decode_response(status, body)?.read_data()
}

/// Envelope code of `body`, if it parses as an envelope at all.
pub fn peek_code(body: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct CodeOnly {
        #[serde(deserialize_with = "code_as_string")]
        code: String,
    }

    serde_json::from_slice::<CodeOnly>(body).ok().map(|c| c.code)
}

fn code_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCode {
        Text(String),
        Number(i64),
    }

    Ok(match RawCode::deserialize(deserializer)? {
        RawCode::Text(code) => code,
        RawCode::Number(code) => code.to_string(),
    })
}

fn null_as_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
