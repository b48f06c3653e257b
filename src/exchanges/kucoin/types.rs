use crate::core::kernel::Params;
use crate::core::types::Amount;
use serde::{Deserialize, Serialize};

/// Account balance
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountModel {
    pub id: String,
    pub currency: String,
    #[serde(rename = "type")]
    pub account_type: String, // main, trade, margin
    pub balance: Amount,
    pub available: Amount,
    pub holds: Amount,
}

/// Result of creating an account
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResultModel {
    pub id: String,
}

/// Ledger entry: one change to an account balance
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountHistoryModel {
    pub currency: String,
    pub amount: Amount,
    pub fee: Amount,
    pub balance: Amount,
    pub biz_type: String,
    pub direction: String, // in, out
    pub created_at: i64,
    #[serde(default)]
    pub context: serde_json::Value, // shape depends on biz_type
}

/// Funds held for an active order or a pending withdrawal
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountHoldModel {
    pub currency: String,
    pub hold_amount: Amount,
    pub biz_type: String,
    pub order_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Result of an inner transfer
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InnerTransferResultModel {
    pub order_id: String,
}

/// Executed trade
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FillModel {
    pub symbol: String,
    pub trade_id: String,
    pub order_id: String,
    #[serde(default)]
    pub counter_order_id: Option<String>,
    pub side: String, // buy, sell
    #[serde(default)]
    pub liquidity: Option<String>, // taker, maker
    #[serde(default)]
    pub force_taker: bool,
    pub price: Amount,
    pub size: Amount,
    pub funds: Amount,
    pub fee: Amount,
    pub fee_rate: Amount,
    pub fee_currency: String,
    #[serde(default)]
    pub stop: Option<String>,
    #[serde(rename = "type")]
    pub order_type: String, // limit, market, limit_stop, market_stop
    pub created_at: i64,
    #[serde(default)]
    pub trade_type: Option<String>,
}

/// Withdrawal record
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalModel {
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub memo: Option<String>,
    pub currency: String,
    pub amount: Amount,
    pub fee: Amount,
    #[serde(default)]
    pub wallet_tx_id: Option<String>,
    #[serde(default)]
    pub is_inner: bool,
    pub status: String, // PROCESSING, WALLET_PROCESSING, SUCCESS, FAILURE
    #[serde(default)]
    pub remark: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Withdrawal limits for one currency
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalQuotasModel {
    pub currency: String,
    pub available_amount: Amount,
    pub remain_amount: Amount,
    pub withdraw_min_size: Amount,
    #[serde(rename = "limitBTCAmount")]
    pub limit_btc_amount: Amount,
    pub inner_withdraw_min_fee: Amount,
    #[serde(default, rename = "usedBTCAmount")]
    pub used_btc_amount: Option<Amount>,
    #[serde(default)]
    pub is_withdraw_enabled: bool,
    pub withdraw_min_fee: Amount,
    pub precision: u32,
}

/// Result of a withdrawal request
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplyWithdrawalResultModel {
    pub withdrawal_id: String,
}

/// Result of a withdrawal cancellation
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CancelWithdrawalResultModel {
    #[serde(default)]
    pub cancelled_withdraw_ids: Vec<String>,
}

/// Optional filters for the fills endpoint
#[derive(Debug, Clone, Default)]
pub struct FillsFilter {
    pub order_id: Option<String>,
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    pub trade_type: Option<String>,
    pub start_at: Option<i64>,
    pub end_at: Option<i64>,
}

impl FillsFilter {
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn side(mut self, side: impl Into<String>) -> Self {
        self.side = Some(side.into());
        self
    }

    /// Keep the same range for every page of one walk.
    pub fn time_range(mut self, start_at: i64, end_at: i64) -> Self {
        self.start_at = Some(start_at);
        self.end_at = Some(end_at);
        self
    }

    pub fn to_params(&self) -> Params {
        Params::new()
            .with_opt("orderId", self.order_id.as_deref())
            .with_opt("symbol", self.symbol.as_deref())
            .with_opt("side", self.side.as_deref())
            .with_opt("type", self.order_type.as_deref())
            .with_opt("tradeType", self.trade_type.as_deref())
            .with_opt_i64("startAt", self.start_at)
            .with_opt_i64("endAt", self.end_at)
    }
}

/// Optional fields of a withdrawal request
#[derive(Debug, Clone, Default)]
pub struct WithdrawalOptions {
    pub memo: Option<String>,
    pub is_inner: Option<bool>,
    pub remark: Option<String>,
    pub chain: Option<String>,
}

impl WithdrawalOptions {
    pub fn to_params(&self) -> Params {
        let mut params = Params::new()
            .with_opt("memo", self.memo.as_deref())
            .with_opt("remark", self.remark.as_deref())
            .with_opt("chain", self.chain.as_deref());
        if let Some(is_inner) = self.is_inner {
            params.insert("isInner", is_inner.to_string());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_decodes_type_and_amounts() {
        let account: AccountModel = serde_json::from_str(
            r#"{"id":"5bd6e9286d99522a52e458de","currency":"BTC","type":"main",
                "balance":"10.5","available":"10.49999999","holds":"0.00000001"}"#,
        )
        .unwrap();
        assert_eq!(account.account_type, "main");
        assert_eq!(account.balance.to_string(), "10.5");
        assert_eq!(account.holds.to_string(), "0.00000001");

        let json = serde_json::to_string(&account).unwrap();
        assert!(json.contains(r#""type":"main""#));
        assert!(json.contains(r#""holds":"0.00000001""#));
    }

    #[test]
    fn test_ledger_keeps_context() {
        let entry: AccountHistoryModel = serde_json::from_str(
            r#"{"currency":"KCS","amount":"0.0998","fee":"0","balance":"1994.040596",
                "bizType":"withdraw","direction":"in","createdAt":1540296039000,
                "context":{"orderId":"5bc7f080b39c5c03286eef8a"}}"#,
        )
        .unwrap();
        assert_eq!(entry.context["orderId"], "5bc7f080b39c5c03286eef8a");
    }

    #[test]
    fn test_fill_decodes() {
        let fill: FillModel = serde_json::from_str(
            r#"{"symbol":"BTC-USDT","tradeId":"5c35c02709e4f67d5266954e","orderId":"5c35c02703aa673ceec2a168",
                "counterOrderId":"5c1ab46003aa676e487fa8e3","side":"buy","liquidity":"taker","forceTaker":true,
                "price":"0.083","size":"0.8424304","funds":"0.0699217232","fee":"0","feeRate":"0",
                "feeCurrency":"USDT","stop":"","type":"limit","createdAt":1547026472000,"tradeType":"TRADE"}"#,
        )
        .unwrap();
        assert_eq!(fill.order_type, "limit");
        assert_eq!(fill.funds.to_string(), "0.0699217232");
        assert!(fill.force_taker);
    }

    #[test]
    fn test_quotas_decode_btc_fields() {
        let quotas: WithdrawalQuotasModel = serde_json::from_str(
            r#"{"currency":"KCS","availableAmount":"2.9719999","remainAmount":"2.9719999",
                "withdrawMinSize":"1.4","limitBTCAmount":"2","innerWithdrawMinFee":"0",
                "usedBTCAmount":"0","isWithdrawEnabled":true,"withdrawMinFee":"0.4","precision":8}"#,
        )
        .unwrap();
        assert_eq!(quotas.limit_btc_amount.to_string(), "2");
        assert_eq!(quotas.precision, 8);
        assert!(quotas.is_withdraw_enabled);
    }

    #[test]
    fn test_fills_filter_params() {
        let params = FillsFilter::default()
            .symbol("BTC-USDT")
            .side("")
            .time_range(1_700_000_000_000, 0)
            .to_params();
        assert_eq!(
            params.to_query_string().unwrap(),
            "startAt=1700000000000&symbol=BTC-USDT"
        );
    }

    #[test]
    fn test_withdrawal_options_params() {
        let params = WithdrawalOptions {
            memo: Some("tag".to_string()),
            is_inner: Some(false),
            ..Default::default()
        }
        .to_params();
        assert_eq!(params.to_json_body().unwrap(), r#"{"isInner":"false","memo":"tag"}"#);
    }
}
