//! Transaction management.
//!
//! This module contains everything related to the rows that record money moving on an account:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing and querying transactions
//! - The filtered history endpoint

mod core;
mod list_endpoint;
mod query;

pub use self::core::{
    Transaction, TransactionKind, create_transaction, create_transaction_table,
    get_account_transactions, get_transaction, map_transaction_row,
};
pub use list_endpoint::get_transactions_endpoint;
pub use query::{SortField, SortOrder, TransactionFilter, TransactionHistoryItem, query_transactions};
