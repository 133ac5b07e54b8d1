//! Lists and searches the address book of the logged in user.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{
    Error,
    app_state::DbState,
    auth::UserID,
    contact::{Contact, get_contacts},
    db::lock_connection,
};

/// The query parameters for the contact list.
#[derive(Debug, Default, Deserialize)]
pub struct ContactsQuery {
    /// Only return contacts whose display name contains this text.
    pub q: Option<String>,
}

/// Handle `GET` requests for the contacts of the current user.
pub async fn get_contacts_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ContactsQuery>,
) -> Result<Json<Vec<Contact>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_contacts(user_id, query.q.as_deref(), &connection).map(Json)
}
