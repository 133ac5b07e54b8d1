//! The report summary endpoint.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    Error,
    app_state::DbState,
    auth::UserID,
    db::lock_connection,
    report::{
        ReportSummary, report_summary,
        summary::{DEFAULT_MONTHS, MAX_MONTHS},
    },
};

/// The query parameters of the report summary.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// The length of the period, clamped to `1..=12`. Non-numeric values use three months.
    pub months: Option<String>,
}

impl ReportQuery {
    fn months(&self) -> u32 {
        self.months
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|months| months.clamp(1, i64::from(MAX_MONTHS)))
            .and_then(|months| u32::try_from(months).ok())
            .unwrap_or(DEFAULT_MONTHS)
    }
}

/// Handle `GET` requests for the income and spending report of the current user.
pub async fn get_report_summary_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportSummary>, Error> {
    let today = OffsetDateTime::now_utc().date();
    let connection = lock_connection(&state.db_connection)?;

    report_summary(user_id, query.months(), today, &connection).map(Json)
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension,
        extract::{Query, State},
    };

    use crate::{
        report::endpoint::{ReportQuery, get_report_summary_endpoint},
        test_utils::{get_test_state, seed_bank},
    };

    fn months(raw: Option<&str>) -> u32 {
        ReportQuery {
            months: raw.map(str::to_owned),
        }
        .months()
    }

    #[test]
    fn months_fall_back_and_clamp() {
        assert_eq!(months(None), 3);
        assert_eq!(months(Some("six")), 3);
        assert_eq!(months(Some("6")), 6);
        assert_eq!(months(Some("-2")), 1);
        assert_eq!(months(Some("99")), 12);
    }

    #[tokio::test]
    async fn returns_the_report_of_the_current_user() {
        let state = get_test_state();
        let bank = seed_bank(&state);

        let report = get_report_summary_endpoint(
            State(state),
            Extension(bank.bob.id),
            Query(ReportQuery::default()),
        )
        .await
        .unwrap()
        .0;

        assert_eq!(report.months, 3);
        assert_eq!(report.totals.net_liquid.to_string(), "50.00");
    }
}
