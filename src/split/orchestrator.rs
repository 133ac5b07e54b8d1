//! Splits an amount among the members of a group.
//!
//! In [SplitMode::Send] every member's share is paid from one of the caller's
//! accounts with its own P2P transfer. A transfer that fails is recorded in the
//! outcome and the remaining members are still paid. In [SplitMode::Request]
//! each member is sent a payment request instead and no money moves.

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Date;

use crate::{
    Error,
    account::{AccountId, get_owned_account},
    auth::{UserID, get_user_by_id},
    contact::{ContactId, get_contact},
    money::{amount_format, format_amount, to_cents},
    notification::{
        NewNotification, NotificationId, NotificationKind, create_notification, notify_or_warn,
    },
    p2p::{NewP2PTransfer, TransferId, post_p2p},
    split::{Group, GroupId, Member, MemberId, get_group, partition},
};

/// Whether a split pays the members or asks them to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Pay each member their share.
    Send,
    /// Ask each member for their share.
    Request,
}

/// What happened to one member's share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    /// The share was paid.
    Success,
    /// The share could not be paid or requested, see [ShareOutcome::error].
    Failed,
    /// The member was asked to pay the share.
    Requested,
}

/// The result of a split for one member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareOutcome {
    /// The member.
    pub member_id: MemberId,
    /// The contact the member was created from.
    pub contact_id: ContactId,
    /// The member's name.
    pub display_name: String,
    /// The member's share.
    #[serde(serialize_with = "amount_format::serialize")]
    pub amount: Decimal,
    /// What happened to the share.
    pub status: ShareStatus,
    /// The transfer that paid the share.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_id: Option<TransferId>,
    /// The payment request sent to the member.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<NotificationId>,
    /// Why the share failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ShareOutcome {
    fn new(member: &Member, amount: Decimal, status: ShareStatus) -> Self {
        Self {
            member_id: member.id,
            contact_id: member.contact_id,
            display_name: member.display_name.clone(),
            amount,
            status,
            transfer_id: None,
            notification_id: None,
            error: None,
        }
    }

    fn failed(member: &Member, amount: Decimal, error: &Error) -> Self {
        Self {
            error: Some(error.client_message()),
            ..Self::new(member, amount, ShareStatus::Failed)
        }
    }
}

/// A split to be carried out with [split_group].
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRequest {
    /// The user that owns the group.
    pub owner: UserID,
    /// The group to split among.
    pub group_id: GroupId,
    /// The total to split.
    pub amount: Decimal,
    /// Whether to pay or request the shares.
    pub mode: SplitMode,
    /// The caller's account that pays the shares, required for [SplitMode::Send].
    pub from_account_id: Option<AccountId>,
    /// An optional note for every member.
    pub message: Option<String>,
    /// The date transfers are booked on.
    pub date: Date,
}

/// Split `request.amount` among the members of a group and pay or request each share.
///
/// Shares come from [partition] and are assigned in member order, so earlier
/// members carry any leftover cent. Outcomes are returned in the same order.
///
/// # Errors
/// Nothing is written when this function returns an error:
/// - [Error::Validation] if the amount rounds to less than one cent, the group has no members,
///   or, when sending, the paying account is missing or not owned by the caller,
/// - [Error::NotFound] if the group does not exist or belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
///
/// Failures of individual transfers or requests are reported in the outcomes.
pub fn split_group(
    request: SplitRequest,
    connection: &Connection,
) -> Result<Vec<ShareOutcome>, Error> {
    if !to_cents(request.amount).is_some_and(|cents| cents > 0) {
        return Err(Error::Validation("the amount must be at least 0.01".to_owned()));
    }

    let group = get_group(request.owner, request.group_id, connection)?;

    if group.members.is_empty() {
        return Err(Error::Validation("the group has no members".to_owned()));
    }

    let shares = partition(request.amount, group.members.len());
    let owner = get_user_by_id(request.owner, connection)?;

    let outcomes = match request.mode {
        SplitMode::Send => {
            let Some(from_account_id) = request.from_account_id else {
                return Err(Error::Validation(
                    "from_account_id is required to send money".to_owned(),
                ));
            };

            match get_owned_account(request.owner, from_account_id, connection) {
                Ok(_) => {}
                Err(Error::NotFound) => {
                    return Err(Error::Validation("invalid sending account".to_owned()));
                }
                Err(error) => return Err(error),
            }

            group
                .members
                .iter()
                .zip(shares)
                .map(|(member, share)| {
                    send_share(
                        &group,
                        member,
                        share,
                        from_account_id,
                        &owner.display_name,
                        &request,
                        connection,
                    )
                })
                .collect::<Vec<_>>()
        }
        SplitMode::Request => {
            let outcomes = group
                .members
                .iter()
                .zip(shares)
                .map(|(member, share)| {
                    request_share(&group, member, share, &owner.display_name, &request, connection)
                })
                .collect::<Vec<_>>();

            notify_or_warn(
                NewNotification {
                    user_id: request.owner,
                    kind: NotificationKind::P2PRequest,
                    title: format!("Requests sent for {}", group.name),
                    body: Some(format!(
                        "You asked {} people for {} EUR in total.",
                        group.members.len(),
                        format_amount(request.amount)
                    )),
                    dedupe_key: None,
                    payload: json!({
                        "group_id": group.id,
                        "amount": format_amount(request.amount),
                    }),
                },
                connection,
            );

            outcomes
        }
    };

    let failed = outcomes
        .iter()
        .filter(|outcome| outcome.status == ShareStatus::Failed)
        .count();
    tracing::info!(
        "Split {} EUR among {} members of group {} ({:?}), {failed} failed",
        format_amount(request.amount),
        outcomes.len(),
        group.id,
        request.mode
    );

    Ok(outcomes)
}

fn send_share(
    group: &Group,
    member: &Member,
    share: Decimal,
    from_account_id: AccountId,
    owner_name: &str,
    request: &SplitRequest,
    connection: &Connection,
) -> ShareOutcome {
    let transfer = get_internal_target(request.owner, member, connection).and_then(
        |(to_user_id, to_account_id)| {
            post_p2p(
                NewP2PTransfer {
                    from_user_id: request.owner,
                    to_user_id,
                    from_account_id,
                    to_account_id,
                    amount: share,
                    message: request.message.clone(),
                    sender_name: owner_name.to_owned(),
                    recipient_name: member.display_name.clone(),
                    date: request.date,
                },
                connection,
            )
        },
    );

    let transfer = match transfer {
        Ok(transfer) => transfer,
        Err(error) => {
            tracing::warn!(
                "Could not send share of member {} in group {}: {error}",
                member.id,
                group.id
            );
            return ShareOutcome::failed(member, share, &error);
        }
    };

    let amount_text = format_amount(share);
    notify_or_warn(
        NewNotification {
            user_id: request.owner,
            kind: NotificationKind::P2PSent,
            title: "Transfer sent".to_owned(),
            body: Some(format!(
                "You sent {amount_text} EUR to {} for {}.",
                member.display_name, group.name
            )),
            dedupe_key: Some(format!("p2p:split:sent:{}", transfer.id)),
            payload: json!({
                "transfer_id": transfer.id,
                "group_id": group.id,
                "member_id": member.id,
                "amount": amount_text,
            }),
        },
        connection,
    );
    notify_or_warn(
        NewNotification {
            user_id: transfer.to_user_id,
            kind: NotificationKind::P2PReceived,
            title: "You received a transfer".to_owned(),
            body: Some(format!(
                "{owner_name} sent you {amount_text} EUR (group {}).",
                group.name
            )),
            dedupe_key: Some(format!("p2p:split:recv:{}", transfer.id)),
            payload: json!({
                "transfer_id": transfer.id,
                "group_id": group.id,
                "amount": amount_text,
            }),
        },
        connection,
    );

    ShareOutcome {
        transfer_id: Some(transfer.id),
        ..ShareOutcome::new(member, share, ShareStatus::Success)
    }
}

fn request_share(
    group: &Group,
    member: &Member,
    share: Decimal,
    owner_name: &str,
    request: &SplitRequest,
    connection: &Connection,
) -> ShareOutcome {
    let amount_text = format_amount(share);
    let notification_id = get_internal_target(request.owner, member, connection).and_then(
        |(to_user_id, _)| {
            create_notification(
                NewNotification {
                    user_id: to_user_id,
                    kind: NotificationKind::P2PRequest,
                    title: format!("Payment request for group {}", group.name),
                    body: Some(format!(
                        "{owner_name} asks you for {amount_text} EUR for a shared expense."
                    )),
                    dedupe_key: None,
                    payload: json!({
                        "group_id": group.id,
                        "origin_user": request.owner,
                        "amount": amount_text,
                        "message": request.message,
                    }),
                },
                connection,
            )
        },
    );

    match notification_id {
        Ok(notification_id) => ShareOutcome {
            notification_id: Some(notification_id),
            ..ShareOutcome::new(member, share, ShareStatus::Requested)
        },
        Err(error) => {
            tracing::warn!(
                "Could not request share of member {} in group {}: {error}",
                member.id,
                group.id
            );
            ShareOutcome::failed(member, share, &error)
        }
    }
}

/// The user and account behind `member`, read from its contact at split time.
fn get_internal_target(
    owner: UserID,
    member: &Member,
    connection: &Connection,
) -> Result<(UserID, AccountId), Error> {
    get_contact(owner, member.contact_id, connection)?
        .internal_target()
        .ok_or_else(|| {
            Error::Validation(format!(
                "{} cannot receive internal transfers",
                member.display_name
            ))
        })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        Error,
        account::get_account,
        contact::{NewContact, create_contact},
        notification::{NotificationKind, get_notifications},
        split::{
            GroupName, ShareStatus, SplitMode, SplitRequest, add_member, create_group, split_group,
        },
        test_utils::{TestBank, create_test_bank, get_test_connection},
        transaction::get_account_transactions,
    };

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn request(bank: &TestBank, group_id: i64, amount: &str, mode: SplitMode) -> SplitRequest {
        SplitRequest {
            owner: bank.alice.id,
            group_id,
            amount: d(amount),
            mode,
            from_account_id: Some(bank.alice_account),
            message: Some("dinner".to_owned()),
            date: date!(2025 - 06 - 01),
        }
    }

    #[test]
    fn send_pays_every_member_their_share() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let group = create_group(bank.alice.id, GroupName::new_unchecked("Dinner"), &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_bob, &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_carol, &conn).unwrap();

        let outcomes = split_group(request(&bank, group.id, "10.01", SplitMode::Send), &conn).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == ShareStatus::Success));
        assert_eq!(outcomes[0].amount, d("5.01"));
        assert_eq!(outcomes[1].amount, d("5.00"));
        assert_eq!(get_account(bank.alice_account, &conn).unwrap().balance, d("89.99"));
        assert_eq!(get_account(bank.bob_account, &conn).unwrap().balance, d("55.01"));
        assert_eq!(get_account(bank.carol_account, &conn).unwrap().balance, d("5.00"));

        let received = get_notifications(bank.carol.id, 10, None, &conn).unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].kind, NotificationKind::P2PReceived);
        assert_eq!(get_notifications(bank.alice.id, 10, None, &conn).unwrap().len(), 2);
    }

    #[test]
    fn send_continues_after_a_failed_member() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let group = create_group(bank.alice.id, GroupName::new_unchecked("Dinner"), &conn).unwrap();
        let broken = create_contact(
            NewContact {
                owner: bank.alice.id,
                display_name: "Closed account".to_owned(),
                target_user_id: Some(bank.bob.id),
                target_account_id: Some(9999),
                iban: None,
            },
            &conn,
        )
        .unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_bob, &conn).unwrap();
        add_member(bank.alice.id, group.id, broken.id, &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_carol, &conn).unwrap();

        let outcomes = split_group(request(&bank, group.id, "10.00", SplitMode::Send), &conn).unwrap();

        let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![ShareStatus::Success, ShareStatus::Failed, ShareStatus::Success]
        );
        assert!(outcomes[1].error.is_some());
        assert!(outcomes[1].transfer_id.is_none());
        assert_eq!(get_account(bank.alice_account, &conn).unwrap().balance, d("93.33"));
        assert_eq!(get_account(bank.bob_account, &conn).unwrap().balance, d("53.34"));
        assert_eq!(get_account(bank.carol_account, &conn).unwrap().balance, d("3.33"));
    }

    #[test]
    fn send_reports_overdraft_per_member() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let group = create_group(bank.alice.id, GroupName::new_unchecked("Car"), &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_bob, &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_carol, &conn).unwrap();

        let outcomes =
            split_group(request(&bank, group.id, "150.00", SplitMode::Send), &conn).unwrap();

        assert_eq!(outcomes[0].status, ShareStatus::Success);
        assert_eq!(outcomes[1].status, ShareStatus::Failed);
        assert_eq!(get_account(bank.alice_account, &conn).unwrap().balance, d("25.00"));
    }

    #[test]
    fn send_preflight_errors_write_nothing() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let group = create_group(bank.alice.id, GroupName::new_unchecked("Dinner"), &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_bob, &conn).unwrap();

        let mut no_account = request(&bank, group.id, "10.00", SplitMode::Send);
        no_account.from_account_id = None;
        let mut foreign_account = request(&bank, group.id, "10.00", SplitMode::Send);
        foreign_account.from_account_id = Some(bank.bob_account);

        assert!(matches!(split_group(no_account, &conn), Err(Error::Validation(_))));
        assert!(matches!(split_group(foreign_account, &conn), Err(Error::Validation(_))));
        assert!(matches!(
            split_group(request(&bank, group.id, "0", SplitMode::Send), &conn),
            Err(Error::Validation(_))
        ));
        assert!(
            get_account_transactions(bank.alice_account, &conn)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn total_below_one_cent_is_rejected_in_both_modes() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let group = create_group(bank.alice.id, GroupName::new_unchecked("Coffee"), &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_bob, &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_carol, &conn).unwrap();

        for mode in [SplitMode::Send, SplitMode::Request] {
            let result = split_group(request(&bank, group.id, "0.004", mode), &conn);

            assert!(matches!(result, Err(Error::Validation(_))), "{mode:?}");
        }

        assert_eq!(get_account(bank.alice_account, &conn).unwrap().balance, d("100.00"));
        assert!(
            get_account_transactions(bank.alice_account, &conn)
                .unwrap()
                .is_empty()
        );
        for user in [bank.alice.id, bank.bob.id, bank.carol.id] {
            assert!(get_notifications(user, 10, None, &conn).unwrap().is_empty());
        }
    }

    #[test]
    fn empty_group_is_rejected() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let group = create_group(bank.alice.id, GroupName::new_unchecked("Empty"), &conn).unwrap();

        let result = split_group(request(&bank, group.id, "10.00", SplitMode::Request), &conn);

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn group_of_another_user_is_not_found() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let group = create_group(bank.alice.id, GroupName::new_unchecked("Dinner"), &conn).unwrap();
        let mut split = request(&bank, group.id, "10.00", SplitMode::Request);
        split.owner = bank.bob.id;

        assert_eq!(split_group(split, &conn), Err(Error::NotFound));
    }

    #[test]
    fn request_notifies_members_without_moving_money() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let group = create_group(bank.alice.id, GroupName::new_unchecked("Rent"), &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_bob, &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_carol, &conn).unwrap();

        let mut split = request(&bank, group.id, "10.00", SplitMode::Request);
        split.from_account_id = None;
        let outcomes = split_group(split, &conn).unwrap();

        assert!(outcomes.iter().all(|o| o.status == ShareStatus::Requested));
        assert!(outcomes.iter().all(|o| o.notification_id.is_some()));
        assert_eq!(get_account(bank.alice_account, &conn).unwrap().balance, d("100.00"));

        let bob_requests = get_notifications(bank.bob.id, 10, None, &conn).unwrap();
        assert_eq!(bob_requests.len(), 1);
        assert_eq!(bob_requests[0].kind, NotificationKind::P2PRequest);
        assert_eq!(bob_requests[0].payload["amount"], "5.00");

        let summary = get_notifications(bank.alice.id, 10, None, &conn).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].kind, NotificationKind::P2PRequest);
    }

    #[test]
    fn outcomes_serialize_with_lowercase_status() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let group = create_group(bank.alice.id, GroupName::new_unchecked("Rent"), &conn).unwrap();
        add_member(bank.alice.id, group.id, bank.alice_to_bob, &conn).unwrap();

        let outcomes = split_group(request(&bank, group.id, "3", SplitMode::Send), &conn).unwrap();
        let json = serde_json::to_value(&outcomes[0]).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["amount"], "3.00");
        assert!(json.get("error").is_none());
        assert!(json["transfer_id"].is_i64());
    }
}
