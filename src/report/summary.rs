//! Income and spending figures over recent months, and a financial wellness score.
//!
//! Movements between an account and a piggy bank are savings, not income or
//! spending, so rows linked to a piggy bank are left out of every series.

use rusqlite::Connection;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use time::{Date, Duration};

use crate::{
    Error,
    auth::UserID,
    money::{Cents, amount_format, from_cents},
    time_format::date_format,
};

/// The report period used when none is given, in months.
pub const DEFAULT_MONTHS: u32 = 3;
/// The longest report period, in months.
pub const MAX_MONTHS: u32 = 12;

/// A month is counted as 30 days when computing the start of the period.
const DAYS_PER_MONTH: i64 = 30;
/// Liquid money covering this many months of spending gets the full runway score.
const TARGET_RUNWAY_MONTHS: f64 = 6.0;

/// Income and spending of one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotals {
    /// The month as "YYYY-MM".
    pub month: String,
    /// The money credited to the user's accounts.
    #[serde(serialize_with = "amount_format::serialize")]
    pub income: Decimal,
    /// The money debited from the user's accounts, as a positive amount.
    #[serde(serialize_with = "amount_format::serialize")]
    pub expenses: Decimal,
}

/// The money spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpend {
    /// The transaction category.
    pub category: String,
    /// The total spent, always positive.
    #[serde(serialize_with = "amount_format::serialize")]
    pub amount: Decimal,
}

/// Totals over the whole report period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotals {
    /// The sum of the monthly income.
    #[serde(serialize_with = "amount_format::serialize")]
    pub income: Decimal,
    /// The sum of the monthly expenses.
    #[serde(serialize_with = "amount_format::serialize")]
    pub expenses: Decimal,
    /// The income per month.
    #[serde(serialize_with = "amount_format::serialize")]
    pub avg_income: Decimal,
    /// The expenses per month.
    #[serde(serialize_with = "amount_format::serialize")]
    pub avg_expenses: Decimal,
    /// The current balance of all accounts plus all active piggy banks.
    #[serde(serialize_with = "amount_format::serialize")]
    pub net_liquid: Decimal,
    /// How many months of average spending `net_liquid` covers, to one decimal place.
    pub runway_months: f64,
}

/// The parts of the wellness score, each from 0 to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreComponents {
    /// The share of income that was not spent.
    pub savings_rate: u8,
    /// The runway relative to six months.
    pub runway_norm: u8,
    /// How steady the monthly expenses are.
    pub stability: u8,
}

/// The report of a user's finances over the last few months.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    /// The first day included in the report.
    #[serde(serialize_with = "date_format::serialize")]
    pub since: Date,
    /// The length of the period in months.
    pub months: u32,
    /// Income and expenses per month, oldest first. Months without transactions are omitted.
    pub monthly: Vec<MonthlyTotals>,
    /// Spending per category, largest first.
    pub categories: Vec<CategorySpend>,
    /// Totals over the period.
    pub totals: PeriodTotals,
    /// The financial wellness score from 0 to 100.
    pub score: u8,
    /// The weighted parts of [ReportSummary::score].
    pub components: ScoreComponents,
}

/// Summarize the transactions of `user_id` over the `months` before `today`.
///
/// `months` is clamped to `1..=MAX_MONTHS`.
///
/// The score weighs the savings rate at 45%, the runway at 35% and the
/// stability of monthly expenses at 20%.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the queries fail.
pub fn report_summary(
    user_id: UserID,
    months: u32,
    today: Date,
    connection: &Connection,
) -> Result<ReportSummary, Error> {
    let months = months.clamp(1, MAX_MONTHS);
    let since = today.saturating_sub(Duration::days(i64::from(months) * DAYS_PER_MONTH));
    let user = user_id.as_i64();

    let monthly: Vec<(String, Cents, Cents)> = connection
        .prepare(
            "SELECT strftime('%Y-%m', t.date) AS month,
                    SUM(CASE WHEN t.kind = 'CREDIT' THEN t.amount ELSE 0 END),
                    SUM(CASE WHEN t.kind = 'DEBIT' THEN -t.amount ELSE 0 END)
             FROM \"transaction\" t
             JOIN account a ON a.id = t.account_id
             WHERE a.user_id = ?1 AND t.date >= ?2 AND t.piggy_id IS NULL
             GROUP BY month
             ORDER BY month",
        )?
        .query_map((user, since), |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<_, _>>()?;

    let categories = connection
        .prepare(
            "SELECT t.category, SUM(-t.amount) AS spent
             FROM \"transaction\" t
             JOIN account a ON a.id = t.account_id
             WHERE a.user_id = ?1 AND t.date >= ?2 AND t.kind = 'DEBIT' AND t.piggy_id IS NULL
             GROUP BY t.category
             HAVING spent > 0
             ORDER BY spent DESC, t.category ASC",
        )?
        .query_map((user, since), |row| {
            Ok(CategorySpend {
                category: row.get(0)?,
                amount: from_cents(row.get(1)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let account_total: Cents = connection.query_row(
        "SELECT COALESCE(SUM(balance), 0) FROM account WHERE user_id = ?1",
        [user],
        |row| row.get(0),
    )?;
    let piggy_total: Cents = connection.query_row(
        "SELECT COALESCE(SUM(current_amount), 0) FROM piggy_bank
         WHERE user_id = ?1 AND status != 'DELETED'",
        [user],
        |row| row.get(0),
    )?;

    let income: Cents = monthly.iter().map(|(_, income, _)| income).sum();
    let expenses: Cents = monthly.iter().map(|(_, _, expenses)| expenses).sum();
    let net_liquid = account_total + piggy_total;

    // A period without any transactions still spreads over the requested months.
    let month_count = if monthly.is_empty() {
        months
    } else {
        u32::try_from(monthly.len()).unwrap_or(months)
    };
    let avg_income = average(income, month_count);
    let avg_expenses = average(expenses, month_count);

    let savings_rate = if income > 0 {
        ((income - expenses) as f64 / income as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let avg_expenses_cents = average_cents(expenses, month_count);
    let runway_months = if avg_expenses_cents > 0.0 {
        net_liquid as f64 / avg_expenses_cents
    } else {
        TARGET_RUNWAY_MONTHS
    };
    let runway_norm = (runway_months / TARGET_RUNWAY_MONTHS).clamp(0.0, 1.0);

    let monthly_expenses: Vec<f64> = if monthly.is_empty() {
        vec![avg_expenses_cents]
    } else {
        monthly
            .iter()
            .map(|(_, _, expenses)| *expenses as f64)
            .collect()
    };
    let stability = expense_stability(&monthly_expenses);

    let score = percent(savings_rate * 0.45 + runway_norm * 0.35 + stability * 0.20);

    tracing::debug!("computed a {months} month report for user {user_id}, score {score}");

    Ok(ReportSummary {
        since,
        months,
        monthly: monthly
            .into_iter()
            .map(|(month, income, expenses)| MonthlyTotals {
                month,
                income: from_cents(income),
                expenses: from_cents(expenses),
            })
            .collect(),
        categories,
        totals: PeriodTotals {
            income: from_cents(income),
            expenses: from_cents(expenses),
            avg_income,
            avg_expenses,
            net_liquid: from_cents(net_liquid),
            runway_months: (runway_months * 10.0).round() / 10.0,
        },
        score,
        components: ScoreComponents {
            savings_rate: percent(savings_rate),
            runway_norm: percent(runway_norm),
            stability: percent(stability),
        },
    })
}

/// `total` cents spread over `months`, rounded to the cent.
fn average(total: Cents, months: u32) -> Decimal {
    (from_cents(total) / Decimal::from(months.max(1)))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn average_cents(total: Cents, months: u32) -> f64 {
    total as f64 / f64::from(months.max(1))
}

/// One minus the coefficient of variation of `values`, clamped to `0..=1`.
///
/// Fewer than two values, or a mean of zero, count as perfectly stable.
fn expense_stability(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 1.0;
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    if mean <= 0.0 {
        return 1.0;
    }

    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (count - 1.0);

    (1.0 - variance.sqrt() / mean).clamp(0.0, 1.0)
}

/// A ratio in `0..=1` as a whole percentage.
fn percent(ratio: f64) -> u8 {
    (ratio.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        NewPiggyTransfer, PiggyDirection, create_piggy_bank, post_piggy_transfer,
        report::summary::{CategorySpend, expense_stability, report_summary},
        test_utils::{TestBank, create_test_bank, get_test_connection},
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn record(
        conn: &Connection,
        bank: &TestBank,
        kind: TransactionKind,
        cents: i64,
        date: time::Date,
        category: &str,
    ) {
        create_transaction(
            Transaction::build(bank.alice_account, kind, cents, date, "test").category(category),
            conn,
        )
        .unwrap();
    }

    #[test]
    fn empty_history_has_a_neutral_score() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);

        let report = report_summary(bank.alice.id, 3, date!(2025 - 06 - 30), &conn).unwrap();

        assert_eq!(report.since, date!(2025 - 04 - 01));
        assert!(report.monthly.is_empty());
        assert!(report.categories.is_empty());
        assert_eq!(report.totals.net_liquid, d("100.00"));
        assert_eq!(report.totals.avg_expenses, d("0.00"));
        assert_eq!(report.totals.runway_months, 6.0);
        assert_eq!(report.components.savings_rate, 0);
        assert_eq!(report.components.runway_norm, 100);
        assert_eq!(report.components.stability, 100);
        assert_eq!(report.score, 55);
    }

    #[test]
    fn groups_income_and_expenses_by_month() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let today = date!(2025 - 06 - 30);
        record(&conn, &bank, TransactionKind::Credit, 100_000, date!(2025 - 05 - 01), "Salary");
        record(&conn, &bank, TransactionKind::Debit, 30_000, date!(2025 - 05 - 10), "Rent");
        record(&conn, &bank, TransactionKind::Debit, 5_000, date!(2025 - 05 - 12), "Food");
        record(&conn, &bank, TransactionKind::Credit, 100_000, date!(2025 - 06 - 01), "Salary");
        record(&conn, &bank, TransactionKind::Debit, 30_000, date!(2025 - 06 - 10), "Rent");
        record(&conn, &bank, TransactionKind::Debit, 5_000, date!(2025 - 06 - 12), "Food");
        // Before the period.
        record(&conn, &bank, TransactionKind::Debit, 99_900, date!(2025 - 01 - 02), "Car");

        let report = report_summary(bank.alice.id, 3, today, &conn).unwrap();

        let months: Vec<_> = report.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2025-05", "2025-06"]);
        assert_eq!(report.monthly[0].income, d("1000.00"));
        assert_eq!(report.monthly[0].expenses, d("350.00"));
        assert_eq!(
            report.categories,
            vec![
                CategorySpend {
                    category: "Rent".to_owned(),
                    amount: d("600.00"),
                },
                CategorySpend {
                    category: "Food".to_owned(),
                    amount: d("100.00"),
                },
            ]
        );
        assert_eq!(report.totals.income, d("2000.00"));
        assert_eq!(report.totals.expenses, d("700.00"));
        assert_eq!(report.totals.avg_income, d("1000.00"));
        assert_eq!(report.totals.avg_expenses, d("350.00"));
        // 1300 / 2000 saved, 100.00 liquid over 350.00 a month, equal months.
        assert_eq!(report.components.savings_rate, 65);
        assert_eq!(report.totals.runway_months, 0.3);
        assert_eq!(report.components.runway_norm, 5);
        assert_eq!(report.components.stability, 100);
        assert_eq!(report.score, 51);
    }

    #[test]
    fn piggy_movements_are_not_spending() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let piggy = create_piggy_bank(bank.alice.id, "Holiday", None, &conn).unwrap();
        post_piggy_transfer(
            NewPiggyTransfer {
                owner: bank.alice.id,
                piggy_id: piggy.id,
                account_id: bank.alice_account,
                amount: d("40.00"),
                direction: PiggyDirection::ToPiggy,
                date: date!(2025 - 06 - 15),
                note: None,
            },
            &conn,
        )
        .unwrap();

        let report = report_summary(bank.alice.id, 1, date!(2025 - 06 - 30), &conn).unwrap();

        assert!(report.monthly.is_empty());
        assert!(report.categories.is_empty());
        assert_eq!(report.totals.net_liquid, d("100.00"));
    }

    #[test]
    fn other_users_are_not_included() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        record(&conn, &bank, TransactionKind::Debit, 1_000, date!(2025 - 06 - 10), "Food");

        let report = report_summary(bank.bob.id, 3, date!(2025 - 06 - 30), &conn).unwrap();

        assert!(report.monthly.is_empty());
        assert_eq!(report.totals.net_liquid, d("50.00"));
    }

    #[test]
    fn months_are_clamped() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let today = date!(2025 - 06 - 30);

        assert_eq!(report_summary(bank.alice.id, 0, today, &conn).unwrap().months, 1);
        assert_eq!(report_summary(bank.alice.id, 40, today, &conn).unwrap().months, 12);
    }

    #[test]
    fn uneven_expenses_lower_stability() {
        assert_eq!(expense_stability(&[100.0, 100.0, 100.0]), 1.0);
        assert_eq!(expense_stability(&[0.0, 0.0]), 1.0);
        assert_eq!(expense_stability(&[500.0]), 1.0);

        let uneven = expense_stability(&[100.0, 300.0]);
        assert!(uneven > 0.0 && uneven < 1.0, "{uneven}");
        assert_eq!(expense_stability(&[0.0, 1000.0]), 0.0);
    }
}
