//! Checking accounts: storage, balance updates and the account list endpoint.

mod core;
mod list_endpoint;

pub use self::core::{
    Account, AccountId, NewAccount, apply_balance_delta, create_account, create_account_table,
    get_account, get_accounts_for_user, get_balance, get_owned_account,
};
pub use list_endpoint::get_accounts_endpoint;
