pub mod builder;
pub mod rest;
pub mod types;

pub use builder::{build_from_env, KucoinBuilder};
pub use rest::KucoinRest;
pub use types::{
    AccountHistoryModel, AccountHoldModel, AccountModel, ApplyWithdrawalResultModel,
    CancelWithdrawalResultModel, CreateAccountResultModel, FillModel, FillsFilter,
    InnerTransferResultModel, WithdrawalModel, WithdrawalOptions, WithdrawalQuotasModel,
};
