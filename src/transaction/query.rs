//! The filtered, sorted and paginated transaction history of a user.

use rusqlite::{Connection, ToSql};
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    account::AccountId,
    auth::UserID,
    transaction::{Transaction, TransactionKind, map_transaction_row},
};

/// The number of transactions returned when no limit is given.
pub const DEFAULT_LIMIT: u32 = 10;
/// The largest page of transactions a client may ask for.
pub const MAX_LIMIT: u32 = 200;

/// The column the history is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    /// Sort by transaction date.
    #[default]
    Date,
    /// Sort by signed amount.
    Amount,
    /// Sort by description.
    Description,
    /// Sort by category.
    Category,
}

impl SortField {
    /// Parse a sort field, unknown names fall back to [SortField::Date].
    pub fn from_query_value(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "amount" => SortField::Amount,
            "description" => SortField::Description,
            "category" => SortField::Category,
            _ => SortField::Date,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SortField::Date => "t.date",
            SortField::Amount => "t.amount",
            SortField::Description => "t.description",
            SortField::Category => "t.category",
        }
    }
}

/// The order to sort transactions in a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    #[default]
    Descending,
}

impl SortOrder {
    /// Parse a sort order, anything but "asc" is descending.
    pub fn from_query_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Which transactions to return and in what order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFilter {
    /// Only transactions on this account.
    pub account_id: Option<AccountId>,
    /// Only transactions whose description or category contains this text.
    pub search: Option<String>,
    /// Only debits or only credits.
    pub kind: Option<TransactionKind>,
    /// Only transactions on or after this date.
    pub date_from: Option<Date>,
    /// Only transactions on or before this date.
    pub date_to: Option<Date>,
    /// The column to sort by.
    pub sort: SortField,
    /// The sort direction.
    pub order: SortOrder,
    /// The maximum number of transactions, clamped to `1..=MAX_LIMIT`.
    pub limit: u32,
    /// The number of transactions to skip.
    pub offset: u32,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            account_id: None,
            search: None,
            kind: None,
            date_from: None,
            date_to: None,
            sort: SortField::default(),
            order: SortOrder::default(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// A transaction in the history together with the name of its account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionHistoryItem {
    /// The transaction.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// The name of the account the transaction is on.
    pub account_name: String,
}

/// Get the transactions across all accounts of `user_id` that match `filter`.
///
/// Rows with equal sort keys are returned newest first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn query_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<TransactionHistoryItem>, Error> {
    let user_id = user_id.as_i64();
    let mut clauses = vec!["a.user_id = ?".to_owned()];
    let mut params: Vec<&dyn ToSql> = vec![&user_id];

    if let Some(account_id) = &filter.account_id {
        clauses.push("t.account_id = ?".to_owned());
        params.push(account_id);
    }

    if let Some(kind) = &filter.kind {
        clauses.push("t.kind = ?".to_owned());
        params.push(kind);
    }

    let pattern = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|search| !search.is_empty())
        .map(|search| format!("%{search}%"));
    if let Some(pattern) = &pattern {
        clauses.push("(t.description LIKE ? OR t.category LIKE ?)".to_owned());
        params.push(pattern);
        params.push(pattern);
    }

    if let Some(date_from) = &filter.date_from {
        clauses.push("t.date >= ?".to_owned());
        params.push(date_from);
    }

    if let Some(date_to) = &filter.date_to {
        clauses.push("t.date <= ?".to_owned());
        params.push(date_to);
    }

    let limit = filter.limit.clamp(1, MAX_LIMIT);
    params.push(&limit);
    params.push(&filter.offset);

    let query = format!(
        "SELECT t.id, t.account_id, t.piggy_id, t.date, t.description, t.category, t.kind, t.amount, a.name \
         FROM \"transaction\" t \
         JOIN account a ON a.id = t.account_id \
         WHERE {} \
         ORDER BY {} {}, t.id DESC \
         LIMIT ? OFFSET ?",
        clauses.join(" AND "),
        filter.sort.column(),
        filter.order.keyword(),
    );

    connection
        .prepare(&query)?
        .query_map(params.as_slice(), |row| {
            Ok(TransactionHistoryItem {
                transaction: map_transaction_row(row)?,
                account_name: row.get(8)?,
            })
        })?
        .map(|item_result| item_result.map_err(Error::SqlError))
        .collect()
}
