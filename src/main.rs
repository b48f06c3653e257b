use anyhow::Context;
use kucoin_rest::core::kernel::PaginationParam;
use kucoin_rest::exchanges::kucoin::FillsFilter;
use kucoin_rest::{ExchangeConfig, KucoinBuilder};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Falls back to public endpoints only when no credentials are set
    let config = load_config().unwrap_or_else(|e| {
        warn!("No credentials loaded ({}), using public endpoints only", e);
        ExchangeConfig::read_only()
    });
    let authenticated = config.has_credentials();

    let kucoin = KucoinBuilder::new()
        .with_config(config)
        .build()
        .context("building KuCoin client")?;

    let server_time = kucoin.server_time().await.context("fetching server time")?;
    info!(server_time, "Server time");

    if !authenticated {
        return Ok(());
    }

    let accounts = kucoin.accounts(None, None).await.context("fetching accounts")?;
    for account in accounts.iter().filter(|a| !a.balance.is_zero()) {
        println!(
            "{:<8} {:<6} balance={} available={} holds={}",
            account.currency, account.account_type, account.balance, account.available, account.holds
        );
    }

    let fills = kucoin
        .fills(&FillsFilter::default(), &PaginationParam::new(1, 10))
        .await
        .context("fetching fills")?;
    println!("{} fills in total, showing {}", fills.total_num, fills.items.len());
    for fill in &fills.items {
        println!("{} {} {} @ {}", fill.symbol, fill.side, fill.size, fill.price);
    }

    Ok(())
}

#[cfg(feature = "env-file")]
fn load_config() -> Result<ExchangeConfig, kucoin_rest::core::config::ConfigError> {
    ExchangeConfig::from_env_file("KUCOIN")
}

#[cfg(not(feature = "env-file"))]
fn load_config() -> Result<ExchangeConfig, kucoin_rest::core::config::ConfigError> {
    ExchangeConfig::from_env("KUCOIN")
}
