use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypesError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Amount cannot be represented exactly: {0}")]
    InexactAmount(String),
}

/// Exact decimal amount (balances, sizes, fees), carried as a JSON string so no
/// precision is lost on the wire.
///
/// Decoding rejects any string that would not survive a round trip, such as
/// more significant digits than a `Decimal` holds or `-0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(
    #[serde(
        serialize_with = "rust_decimal::serde::str::serialize",
        deserialize_with = "deserialize_exact"
    )]
    pub Decimal,
);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, TypesError> {
        Decimal::from_str_exact(s.trim())
            .map(Self)
            .map_err(|e| TypesError::InvalidAmount(format!("{}: {}", s, e)))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn parse_wire_text(text: &str) -> Result<Decimal, TypesError> {
    let value = Amount::from_str(text)?.0;
    if value.to_string() != text {
        return Err(TypesError::InexactAmount(text.to_string()));
    }
    Ok(value)
}

fn deserialize_exact<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_wire_text(&text).map_err(serde::de::Error::custom)
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}
