//! The piggy bank endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    account::AccountId,
    app_state::DbState,
    auth::UserID,
    db::lock_connection,
    json_body,
    money::AmountInput,
    piggy::{
        NewPiggyTransfer, PiggyBank, PiggyDirection, PiggyId, PiggyTransfer, create_piggy_bank,
        delete_piggy_bank, get_piggy_banks, post_piggy_transfer,
    },
    time_format::parse_date,
};

/// Handle `GET` requests for the active piggy banks of the current user.
pub async fn get_piggy_banks_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<PiggyBank>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_piggy_banks(user_id, &connection).map(Json)
}

/// The body of a request to open a piggy bank.
#[derive(Debug, Default, Deserialize)]
pub struct PiggyBankForm {
    /// What the user is saving for.
    pub name: Option<String>,
    /// An optional savings goal.
    pub target_amount: Option<AmountInput>,
}

/// Handle `POST` requests that open a new piggy bank.
pub async fn create_piggy_bank_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<PiggyBankForm>, JsonRejection>,
) -> Result<Json<PiggyBank>, Error> {
    let form = json_body(payload)?;
    let target_amount = form
        .target_amount
        .as_ref()
        .map(AmountInput::parse)
        .transpose()?;

    let connection = lock_connection(&state.db_connection)?;

    create_piggy_bank(
        user_id,
        form.name.as_deref().unwrap_or_default(),
        target_amount,
        &connection,
    )
    .map(Json)
}

/// The body of a request to move money between an account and a piggy bank.
#[derive(Debug, Deserialize)]
pub struct PiggyTransferForm {
    /// The piggy bank.
    pub piggy_id: PiggyId,
    /// The account.
    pub account_id: AccountId,
    /// The amount to move.
    pub amount: AmountInput,
    /// Which way the money moves.
    pub direction: PiggyDirection,
    /// The booking date as "YYYY-MM-DD", defaults to today.
    pub date: Option<String>,
    /// An optional note.
    pub note: Option<String>,
}

/// The response to a successful piggy transfer.
#[derive(Debug, Serialize)]
pub struct PiggyTransferResponse {
    /// Always "ok".
    pub message: String,
    /// The posted transfer.
    pub transfer: PiggyTransfer,
}

/// Handle `POST` requests that move money between an account and a piggy bank.
pub async fn piggy_transfer_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<PiggyTransferForm>, JsonRejection>,
) -> Result<Json<PiggyTransferResponse>, Error> {
    let form = json_body(payload)?;
    let amount = form.amount.parse()?;
    let date = match form.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => OffsetDateTime::now_utc().date(),
    };
    let note = form
        .note
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(str::to_owned);

    let connection = lock_connection(&state.db_connection)?;
    let transfer = post_piggy_transfer(
        NewPiggyTransfer {
            owner: user_id,
            piggy_id: form.piggy_id,
            account_id: form.account_id,
            amount,
            direction: form.direction,
            date,
            note,
        },
        &connection,
    )?;

    Ok(Json(PiggyTransferResponse {
        message: "ok".to_owned(),
        transfer,
    }))
}

/// The query parameters for closing a piggy bank.
#[derive(Debug, Default, Deserialize)]
pub struct DeletePiggyQuery {
    /// The account that receives the remaining balance.
    pub account_id: Option<AccountId>,
}

/// The response to a successful piggy bank deletion.
#[derive(Debug, Serialize)]
pub struct DeletePiggyResponse {
    /// Always "deleted".
    pub message: String,
    /// The refund of the remaining balance, if there was one.
    pub refund: Option<PiggyTransfer>,
}

/// Handle `DELETE` requests that close a piggy bank.
pub async fn delete_piggy_bank_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Path(piggy_id): Path<PiggyId>,
    Query(query): Query<DeletePiggyQuery>,
) -> Result<Json<DeletePiggyResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let refund = delete_piggy_bank(
        user_id,
        piggy_id,
        query.account_id,
        OffsetDateTime::now_utc().date(),
        &connection,
    )?;

    Ok(Json(DeletePiggyResponse {
        message: "deleted".to_owned(),
        refund,
    }))
}
