//! The split group endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    account::AccountId,
    app_state::DbState,
    auth::UserID,
    contact::ContactId,
    db::lock_connection,
    json_body,
    money::AmountInput,
    split::{
        Group, GroupId, GroupName, Member, MemberId, ShareOutcome, SplitMode, SplitRequest,
        add_member, create_group, delete_group, list_groups, remove_member, split_group,
    },
};

/// A plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// What happened, e.g. "deleted".
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_owned(),
        })
    }
}

/// The groups of the current user.
#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    /// The groups, newest first.
    pub groups: Vec<Group>,
}

/// Handle `GET` requests for the split groups of the current user.
pub async fn get_groups_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<GroupsResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let groups = list_groups(user_id, &connection)?;

    Ok(Json(GroupsResponse { groups }))
}

/// The body of a request to create a split group.
#[derive(Debug, Default, Deserialize)]
pub struct GroupForm {
    /// The name of the group.
    pub name: Option<String>,
}

/// The response to a successful group creation.
#[derive(Debug, Serialize)]
pub struct GroupCreatedResponse {
    /// Always "created".
    pub message: String,
    /// The new, empty group.
    pub group: Group,
}

/// Handle `POST` requests that create a split group.
pub async fn create_group_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<GroupForm>, JsonRejection>,
) -> Result<(StatusCode, Json<GroupCreatedResponse>), Error> {
    let form = json_body(payload)?;
    let name = GroupName::new(form.name.as_deref().unwrap_or_default())?;

    let connection = lock_connection(&state.db_connection)?;
    let group = create_group(user_id, name, &connection)?;

    Ok((
        StatusCode::CREATED,
        Json(GroupCreatedResponse {
            message: "created".to_owned(),
            group,
        }),
    ))
}

/// Handle `DELETE` requests that delete a split group and its members.
pub async fn delete_group_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Path(group_id): Path<GroupId>,
) -> Result<Json<MessageResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    match delete_group(user_id, group_id, &connection) {
        Ok(()) => Ok(MessageResponse::new("deleted")),
        Err(Error::Conflict(_)) => Err(Error::NotFound),
        Err(error) => Err(error),
    }
}

/// The body of a request to add a member to a split group.
#[derive(Debug, Default, Deserialize)]
pub struct MemberForm {
    /// The contact to add.
    pub contact_id: Option<ContactId>,
}

/// The response to a successful member addition.
#[derive(Debug, Serialize)]
pub struct MemberAddedResponse {
    /// Always "added".
    pub message: String,
    /// The new member.
    pub member: Member,
}

/// Handle `POST` requests that add a contact to a split group.
pub async fn add_member_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Path(group_id): Path<GroupId>,
    payload: Result<Json<MemberForm>, JsonRejection>,
) -> Result<(StatusCode, Json<MemberAddedResponse>), Error> {
    let form = json_body(payload)?;
    let Some(contact_id) = form.contact_id else {
        return Err(Error::Validation("contact_id is required".to_owned()));
    };

    let connection = lock_connection(&state.db_connection)?;
    let member = add_member(user_id, group_id, contact_id, &connection)?;

    Ok((
        StatusCode::CREATED,
        Json(MemberAddedResponse {
            message: "added".to_owned(),
            member,
        }),
    ))
}

/// Handle `DELETE` requests that remove a member from a split group.
pub async fn remove_member_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Path((group_id, member_id)): Path<(GroupId, MemberId)>,
) -> Result<Json<MessageResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    remove_member(user_id, group_id, member_id, &connection)?;

    Ok(MessageResponse::new("deleted"))
}

/// The body of a split request.
#[derive(Debug, Default, Deserialize)]
pub struct SplitForm {
    /// The total to split.
    pub amount: Option<AmountInput>,
    /// Either "send" or "request".
    pub mode: Option<String>,
    /// The account that pays the shares when sending.
    pub from_account_id: Option<AccountId>,
    /// An optional note for every member.
    pub message: Option<String>,
}

/// The outcome of a split.
#[derive(Debug, Serialize)]
pub struct SplitResponse {
    /// "sent" or "requested".
    pub message: String,
    /// The mode the split ran in.
    pub mode: SplitMode,
    /// One entry per member, in member order.
    pub results: Vec<ShareOutcome>,
}

/// Handle `POST` requests that split an amount among the members of a group.
///
/// A split that sends money answers with `200 OK` even when some of the
/// transfers failed, the failures are listed in the results.
pub async fn split_group_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Path(group_id): Path<GroupId>,
    payload: Result<Json<SplitForm>, JsonRejection>,
) -> Result<Json<SplitResponse>, Error> {
    let form = json_body(payload)?;

    let mode = match form.mode.as_deref().map(str::trim) {
        Some(mode) if mode.eq_ignore_ascii_case("send") => SplitMode::Send,
        Some(mode) if mode.eq_ignore_ascii_case("request") => SplitMode::Request,
        _ => {
            return Err(Error::Validation(
                "mode must be either \"send\" or \"request\"".to_owned(),
            ));
        }
    };
    let Some(amount) = form.amount.as_ref() else {
        return Err(Error::Validation("amount is required".to_owned()));
    };
    let amount = amount.parse()?;
    let message = form
        .message
        .as_deref()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_owned);

    let connection = lock_connection(&state.db_connection)?;
    let results = split_group(
        SplitRequest {
            owner: user_id,
            group_id,
            amount,
            mode,
            from_account_id: form.from_account_id,
            message,
            date: OffsetDateTime::now_utc().date(),
        },
        &connection,
    )?;

    let message = match mode {
        SplitMode::Send => "sent",
        SplitMode::Request => "requested",
    };

    Ok(Json(SplitResponse {
        message: message.to_owned(),
        mode,
        results,
    }))
}
