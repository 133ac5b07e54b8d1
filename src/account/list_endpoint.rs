//! Lists the accounts of the logged in user.

use axum::{
    Extension, Json,
    extract::State,
};

use crate::{
    Error,
    account::{Account, get_accounts_for_user},
    app_state::DbState,
    auth::UserID,
    db::lock_connection,
};

/// Handle `GET` requests for the accounts of the current user.
pub async fn get_accounts_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_accounts_for_user(user_id, &connection).map(Json)
}
