pub mod core;
pub mod exchanges;

pub use crate::core::{config::ExchangeConfig, errors::ExchangeError, types::Amount};
pub use crate::exchanges::kucoin::{KucoinBuilder, KucoinRest};
