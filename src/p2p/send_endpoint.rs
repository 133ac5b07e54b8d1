//! Sends money to a contact from one of the caller's accounts.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    Error,
    account::{AccountId, get_owned_account},
    app_state::DbState,
    auth::{UserID, get_user_by_id},
    contact::{ContactId, get_contact},
    db::lock_connection,
    json_body,
    money::{AmountInput, amount_format, format_amount},
    notification::{NewNotification, NotificationKind, notify_or_warn},
    p2p::{NewP2PTransfer, TransferId, post_p2p},
};

/// The body of a send request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendForm {
    /// The caller's account the money leaves.
    pub from_account_id: Option<AccountId>,
    /// The internal contact that receives the money.
    pub contact_id: Option<ContactId>,
    /// The amount to send.
    pub amount: Option<AmountInput>,
    /// An optional note.
    pub message: Option<String>,
    /// Overrides the contact's name on the caller's statement.
    pub contact_display_name: Option<String>,
}

/// The response to a successful send.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    /// Always "ok".
    pub message: String,
    /// The ID of the posted transfer.
    pub transfer_id: TransferId,
    /// The name the money was sent to.
    pub to_name: String,
    /// The amount sent.
    #[serde(serialize_with = "amount_format::serialize")]
    pub amount: Decimal,
}

/// Handle `POST` requests that send money to a contact.
///
/// The contact must be internal and must not be the caller themself, and the
/// sending account must belong to the caller.
pub async fn send_p2p_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<SendForm>, JsonRejection>,
) -> Result<Json<SendResponse>, Error> {
    let form = json_body(payload)?;

    let (Some(from_account_id), Some(contact_id), Some(amount)) =
        (form.from_account_id, form.contact_id, form.amount.as_ref())
    else {
        return Err(Error::Validation(
            "from_account_id, contact_id and amount are required".to_owned(),
        ));
    };
    let amount = amount.parse()?;
    let message = form
        .message
        .as_deref()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_owned);

    let connection = lock_connection(&state.db_connection)?;

    let contact = match get_contact(user_id, contact_id, &connection) {
        Ok(contact) => contact,
        Err(Error::NotFound) => {
            return Err(Error::Validation("invalid or external contact".to_owned()));
        }
        Err(error) => return Err(error),
    };
    let Some((to_user_id, to_account_id)) = contact.internal_target() else {
        return Err(Error::Validation("invalid or external contact".to_owned()));
    };

    if amount <= Decimal::ZERO {
        return Err(Error::Validation("the amount must be positive".to_owned()));
    }

    match get_owned_account(user_id, from_account_id, &connection) {
        Ok(_) => {}
        Err(Error::NotFound) => {
            return Err(Error::Validation("invalid sending account".to_owned()));
        }
        Err(error) => return Err(error),
    }

    if to_user_id == user_id {
        return Err(Error::Validation(
            "you cannot send money to yourself".to_owned(),
        ));
    }

    let sender = get_user_by_id(user_id, &connection)?;
    let to_name = form
        .contact_display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&contact.display_name)
        .to_owned();

    let transfer = post_p2p(
        NewP2PTransfer {
            from_user_id: user_id,
            to_user_id,
            from_account_id,
            to_account_id,
            amount,
            message,
            sender_name: sender.display_name.clone(),
            recipient_name: to_name.clone(),
            date: OffsetDateTime::now_utc().date(),
        },
        &connection,
    )?;

    let amount_text = format_amount(transfer.amount);
    notify_or_warn(
        NewNotification {
            user_id,
            kind: NotificationKind::P2PSent,
            title: "Transfer sent".to_owned(),
            body: Some(format!("You sent {amount_text} EUR to {to_name}.")),
            dedupe_key: Some(format!("p2p:sent:{}", transfer.id)),
            payload: json!({
                "transfer_id": transfer.id,
                "amount": amount_text,
                "contact_id": contact.id,
            }),
        },
        &connection,
    );
    notify_or_warn(
        NewNotification {
            user_id: to_user_id,
            kind: NotificationKind::P2PReceived,
            title: "You received a transfer".to_owned(),
            body: Some(format!(
                "{} sent you {amount_text} EUR.",
                sender.display_name
            )),
            dedupe_key: Some(format!("p2p:recv:{}", transfer.id)),
            payload: json!({
                "transfer_id": transfer.id,
                "amount": amount_text,
                "from_user": user_id,
            }),
        },
        &connection,
    );

    Ok(Json(SendResponse {
        message: "ok".to_owned(),
        transfer_id: transfer.id,
        to_name,
        amount: transfer.amount,
    }))
}
