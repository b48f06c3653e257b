use crate::core::errors::ExchangeError;
use crate::core::kernel::{
    Page, PaginationParam, Paginator, Params, RequestDescriptor, RestClient,
};
use crate::exchanges::kucoin::types::{
    AccountHistoryModel, AccountHoldModel, AccountModel, ApplyWithdrawalResultModel,
    CancelWithdrawalResultModel, CreateAccountResultModel, FillModel, FillsFilter,
    InnerTransferResultModel, WithdrawalModel, WithdrawalOptions, WithdrawalQuotasModel,
};
use serde::de::DeserializeOwned;
use tracing::instrument;

/// KuCoin account, fill and withdrawal endpoints
#[derive(Debug, Clone)]
pub struct KucoinRest<R: RestClient> {
    rest_client: R,
}

impl<R: RestClient> KucoinRest<R> {
    pub fn new(rest_client: R) -> Self {
        Self { rest_client }
    }

    /// Underlying transport, for endpoints without a wrapper here.
    pub fn rest_client(&self) -> &R {
        &self.rest_client
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T, ExchangeError> {
        self.rest_client.call(&request).await?.read_data()
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
        pagination: &PaginationParam,
    ) -> Result<Page<T>, ExchangeError> {
        self.rest_client
            .call_paginated(&request, pagination)
            .await?
            .into_typed()
    }

    /// Server time in milliseconds
    pub async fn server_time(&self) -> Result<i64, ExchangeError> {
        self.fetch(RequestDescriptor::get("/api/v1/timestamp").public())
            .await
    }

    /// List accounts, optionally filtered by currency and account type
    #[instrument(skip(self))]
    pub async fn accounts(
        &self,
        currency: Option<&str>,
        account_type: Option<&str>,
    ) -> Result<Vec<AccountModel>, ExchangeError> {
        let params = Params::new()
            .with_opt("currency", currency)
            .with_opt("type", account_type);
        self.fetch(RequestDescriptor::get("/api/v1/accounts").with_params(params))
            .await
    }

    pub async fn account(&self, account_id: &str) -> Result<AccountModel, ExchangeError> {
        self.fetch(RequestDescriptor::get(format!("/api/v1/accounts/{}", account_id)))
            .await
    }

    /// Create an account of `account_type` (main, trade) for `currency`
    #[instrument(skip(self))]
    pub async fn create_account(
        &self,
        account_type: &str,
        currency: &str,
    ) -> Result<CreateAccountResultModel, ExchangeError> {
        let params = Params::new()
            .with("currency", currency)
            .with("type", account_type);
        self.fetch(RequestDescriptor::post("/api/v1/accounts").with_params(params))
            .await
    }

    /// Ledger entries of an account, latest first. Zero or negative bounds are omitted.
    pub async fn account_ledgers(
        &self,
        account_id: &str,
        start_at: i64,
        end_at: i64,
        pagination: &PaginationParam,
    ) -> Result<Page<AccountHistoryModel>, ExchangeError> {
        let params = Params::new()
            .with_opt_i64("startAt", Some(start_at))
            .with_opt_i64("endAt", Some(end_at));
        let request = RequestDescriptor::get(format!("/api/v1/accounts/{}/ledgers", account_id))
            .with_params(params);
        self.fetch_page(request, pagination).await
    }

    pub async fn account_holds(
        &self,
        account_id: &str,
        pagination: &PaginationParam,
    ) -> Result<Page<AccountHoldModel>, ExchangeError> {
        let request = RequestDescriptor::get(format!("/api/v1/accounts/{}/holds", account_id));
        self.fetch_page(request, pagination).await
    }

    /// Move funds between two accounts of the same user.
    ///
    /// Never retried automatically. Reuse `client_oid` when resubmitting so
    /// the exchange can reject a duplicate.
    #[instrument(skip(self, amount))]
    pub async fn inner_transfer(
        &self,
        client_oid: &str,
        pay_account_id: &str,
        rec_account_id: &str,
        amount: &str,
    ) -> Result<InnerTransferResultModel, ExchangeError> {
        let params = Params::new()
            .with("clientOid", client_oid)
            .with("payAccountId", pay_account_id)
            .with("recAccountId", rec_account_id)
            .with("amount", amount);
        self.fetch(RequestDescriptor::post("/api/v1/accounts/inner-transfer").with_params(params))
            .await
    }

    pub async fn fills(
        &self,
        filter: &FillsFilter,
        pagination: &PaginationParam,
    ) -> Result<Page<FillModel>, ExchangeError> {
        let request = RequestDescriptor::get("/api/v1/fills").with_params(filter.to_params());
        self.fetch_page(request, pagination).await
    }

    /// Cursor over every page of fills matching `filter`
    pub fn fills_paginator(&self, filter: &FillsFilter, start: PaginationParam) -> Paginator<'_, R> {
        let request = RequestDescriptor::get("/api/v1/fills").with_params(filter.to_params());
        Paginator::new(&self.rest_client, request, start)
    }

    pub async fn withdrawals(
        &self,
        currency: Option<&str>,
        status: Option<&str>,
        start_at: i64,
        end_at: i64,
        pagination: &PaginationParam,
    ) -> Result<Page<WithdrawalModel>, ExchangeError> {
        let params = Params::new()
            .with_opt("currency", currency)
            .with_opt("status", status)
            .with_opt_i64("startAt", Some(start_at))
            .with_opt_i64("endAt", Some(end_at));
        let request = RequestDescriptor::get("/api/v1/withdrawals").with_params(params);
        self.fetch_page(request, pagination).await
    }

    pub async fn withdrawal_quotas(&self, currency: &str) -> Result<WithdrawalQuotasModel, ExchangeError> {
        let params = Params::new().with("currency", currency);
        self.fetch(RequestDescriptor::get("/api/v1/withdrawals/quotas").with_params(params))
            .await
    }

    /// Request a withdrawal. Never retried automatically.
    #[instrument(skip(self, amount, options))]
    pub async fn apply_withdrawal(
        &self,
        currency: &str,
        address: &str,
        amount: &str,
        options: &WithdrawalOptions,
    ) -> Result<ApplyWithdrawalResultModel, ExchangeError> {
        let mut params = options.to_params();
        params.insert("currency", currency);
        params.insert("address", address);
        params.insert("amount", amount);
        self.fetch(RequestDescriptor::post("/api/v1/withdrawals").with_params(params))
            .await
    }

    #[instrument(skip(self))]
    pub async fn cancel_withdrawal(
        &self,
        withdrawal_id: &str,
    ) -> Result<CancelWithdrawalResultModel, ExchangeError> {
        self.fetch(RequestDescriptor::delete(format!("/api/v1/withdrawals/{}", withdrawal_id)))
            .await
    }
}
