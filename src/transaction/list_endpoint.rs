//! The transaction history endpoint.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{
    Error,
    app_state::DbState,
    auth::UserID,
    db::lock_connection,
    time_format::parse_date,
    transaction::{
        SortField, SortOrder, TransactionFilter, TransactionHistoryItem, TransactionKind,
        query::{DEFAULT_LIMIT, MAX_LIMIT},
        query_transactions,
    },
};

/// The raw query parameters of the history endpoint.
///
/// Every field is optional text so that lenient fields (`type`, `sort`,
/// `order`, `limit`, `offset`) can fall back to their defaults instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    /// An account ID, must be an integer.
    pub account_id: Option<String>,
    /// Free text matched against description and category.
    pub q: Option<String>,
    /// "DEBIT" or "CREDIT".
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// An inclusive ISO date, must be valid.
    pub date_from: Option<String>,
    /// An inclusive ISO date, must be valid.
    pub date_to: Option<String>,
    /// One of "date", "amount", "description" or "category".
    pub sort: Option<String>,
    /// "asc" or "desc".
    pub order: Option<String>,
    /// The page size.
    pub limit: Option<String>,
    /// The number of rows to skip.
    pub offset: Option<String>,
}

impl TryFrom<TransactionsQuery> for TransactionFilter {
    type Error = Error;

    fn try_from(query: TransactionsQuery) -> Result<Self, Self::Error> {
        let account_id = match non_empty(query.account_id.as_deref()) {
            Some(raw) => Some(raw.parse().map_err(|_| {
                Error::Validation(format!("\"{raw}\" is not a valid account id"))
            })?),
            None => None,
        };

        let date_from = non_empty(query.date_from.as_deref())
            .map(parse_date)
            .transpose()?;
        let date_to = non_empty(query.date_to.as_deref())
            .map(parse_date)
            .transpose()?;

        Ok(TransactionFilter {
            account_id,
            search: non_empty(query.q.as_deref()).map(str::to_owned),
            kind: non_empty(query.kind.as_deref())
                .and_then(|raw| raw.parse::<TransactionKind>().ok()),
            date_from,
            date_to,
            sort: query
                .sort
                .as_deref()
                .map(SortField::from_query_value)
                .unwrap_or_default(),
            order: query
                .order
                .as_deref()
                .map(SortOrder::from_query_value)
                .unwrap_or_default(),
            limit: parse_clamped(query.limit.as_deref(), 1, MAX_LIMIT).unwrap_or(DEFAULT_LIMIT),
            offset: parse_clamped(query.offset.as_deref(), 0, u32::MAX).unwrap_or(0),
        })
    }
}

/// Parse an integer query value and clamp it to `min..=max`.
///
/// Out of range values, including negative ones, are clamped rather than
/// rejected. Returns `None` if `raw` is missing or not an integer.
fn parse_clamped(raw: Option<&str>, min: u32, max: u32) -> Option<u32> {
    let value = raw?.trim().parse::<i64>().ok()?;
    let clamped = value.clamp(i64::from(min), i64::from(max));

    u32::try_from(clamped).ok()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Handle `GET` requests for the transaction history of the current user.
pub async fn get_transactions_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<TransactionHistoryItem>>, Error> {
    let filter = TransactionFilter::try_from(query)?;
    let connection = lock_connection(&state.db_connection)?;

    query_transactions(user_id, &filter, &connection).map(Json)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        Error,
        transaction::{
            TransactionKind,
            list_endpoint::TransactionsQuery,
            query::{DEFAULT_LIMIT, SortField, SortOrder, TransactionFilter},
        },
    };

    #[test]
    fn empty_query_uses_defaults() {
        let filter = TransactionFilter::try_from(TransactionsQuery::default()).unwrap();

        assert_eq!(filter, TransactionFilter::default());
        assert_eq!(filter.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn lenient_fields_fall_back_to_defaults() {
        let filter = TransactionFilter::try_from(TransactionsQuery {
            kind: Some("REFUND".to_owned()),
            sort: Some("colour".to_owned()),
            order: Some("up".to_owned()),
            limit: Some("lots".to_owned()),
            offset: Some("-3".to_owned()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(filter, TransactionFilter::default());
    }

    #[test]
    fn parses_every_field() {
        let filter = TransactionFilter::try_from(TransactionsQuery {
            account_id: Some("3".to_owned()),
            q: Some(" pizza ".to_owned()),
            kind: Some("credit".to_owned()),
            date_from: Some("2025-01-01".to_owned()),
            date_to: Some("2025-01-31".to_owned()),
            sort: Some("amount".to_owned()),
            order: Some("asc".to_owned()),
            limit: Some("25".to_owned()),
            offset: Some("5".to_owned()),
        })
        .unwrap();

        assert_eq!(
            filter,
            TransactionFilter {
                account_id: Some(3),
                search: Some("pizza".to_owned()),
                kind: Some(TransactionKind::Credit),
                date_from: Some(date!(2025 - 01 - 01)),
                date_to: Some(date!(2025 - 01 - 31)),
                sort: SortField::Amount,
                order: SortOrder::Ascending,
                limit: 25,
                offset: 5,
            }
        );
    }

    #[test]
    fn out_of_range_paging_is_clamped() {
        let filter = TransactionFilter::try_from(TransactionsQuery {
            limit: Some("-5".to_owned()),
            offset: Some("-3".to_owned()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(filter.limit, 1);
        assert_eq!(filter.offset, 0);

        let filter = TransactionFilter::try_from(TransactionsQuery {
            limit: Some("5000".to_owned()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(filter.limit, 200);
    }

    #[test]
    fn malformed_date_is_rejected() {
        let result = TransactionFilter::try_from(TransactionsQuery {
            date_from: Some("yesterday".to_owned()),
            ..Default::default()
        });

        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
