//! The registry of split groups and their members.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    contact::{ContactId, get_contact},
    database_id::DatabaseId,
    time_format::timestamp_format,
};

/// Database identifier for a split group.
pub type GroupId = DatabaseId;

/// Database identifier for a group member.
pub type MemberId = DatabaseId;

/// The name of a split group, e.g. "Flatmates".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Hash)]
pub struct GroupName(String);

impl GroupName {
    /// Create a group name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::Validation] if `name` is blank.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::Validation("group name cannot be empty".to_owned()))
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a group name without validation.
    ///
    /// The caller should ensure that the string is not blank.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for GroupName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for GroupName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupName::new(s)
    }
}

impl Display for GroupName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contact materialized into a split group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    /// The ID of the member.
    #[serde(rename = "member_id")]
    pub id: MemberId,
    /// The group the member belongs to.
    #[serde(skip)]
    pub group_id: GroupId,
    /// The contact the member was created from.
    pub contact_id: ContactId,
    /// The contact's name at the time they were added.
    pub display_name: String,
}

/// A named set of contacts that expenses are split among.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// The ID of the group.
    #[serde(rename = "group_id")]
    pub id: GroupId,
    /// The user that owns the group.
    #[serde(skip)]
    pub owner: UserID,
    /// The name of the group.
    pub name: GroupName,
    /// When the group was created.
    #[serde(serialize_with = "timestamp_format::serialize")]
    pub created_at: OffsetDateTime,
    /// The members in the order they were added.
    pub members: Vec<Member>,
}

/// Create the split group table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_group_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS split_group (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Create the split group member table.
///
/// Members are deleted with their group or their contact.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_group_member_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS split_group_member (
            id INTEGER PRIMARY KEY,
            group_id INTEGER NOT NULL,
            contact_id INTEGER NOT NULL,
            display_name TEXT NOT NULL,
            UNIQUE(group_id, contact_id),
            FOREIGN KEY(group_id) REFERENCES split_group(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(contact_id) REFERENCES contact(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Create an empty split group owned by `owner`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn create_group(
    owner: UserID,
    name: GroupName,
    connection: &Connection,
) -> Result<Group, Error> {
    let group = connection
        .prepare(
            "INSERT INTO split_group (user_id, name, created_at) VALUES (?1, ?2, ?3)
             RETURNING id, user_id, name, created_at",
        )?
        .query_row(
            (owner.as_i64(), name.as_ref(), OffsetDateTime::now_utc()),
            map_group_row,
        )?;

    tracing::info!("Created split group {} for user {owner}", group.id);

    Ok(group)
}

/// Get group `id` of `owner` together with its members.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the group does not exist or belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_group(owner: UserID, id: GroupId, connection: &Connection) -> Result<Group, Error> {
    let mut group = connection
        .prepare(
            "SELECT id, user_id, name, created_at FROM split_group
             WHERE id = :id AND user_id = :owner",
        )?
        .query_row(&[(":id", &id), (":owner", &owner.as_i64())], map_group_row)?;

    group.members = get_members(group.id, connection)?;

    Ok(group)
}

/// Get the groups of `owner`, newest first, each with its members.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn list_groups(owner: UserID, connection: &Connection) -> Result<Vec<Group>, Error> {
    let mut groups = connection
        .prepare(
            "SELECT id, user_id, name, created_at FROM split_group
             WHERE user_id = :owner
             ORDER BY id DESC",
        )?
        .query_map(&[(":owner", &owner.as_i64())], map_group_row)?
        .map(|group_result| group_result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    for group in &mut groups {
        group.members = get_members(group.id, connection)?;
    }

    Ok(groups)
}

/// Get the members of group `group_id` in the order they were added.
///
/// Shares are assigned in this order, so it must stay stable.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_members(group_id: GroupId, connection: &Connection) -> Result<Vec<Member>, Error> {
    connection
        .prepare(
            "SELECT id, group_id, contact_id, display_name FROM split_group_member
             WHERE group_id = :group_id
             ORDER BY id ASC",
        )?
        .query_map(&[(":group_id", &group_id)], map_member_row)?
        .map(|member_result| member_result.map_err(Error::SqlError))
        .collect()
}

/// Add contact `contact_id` to group `group_id`.
///
/// The member keeps a copy of the contact's display name.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the group does not exist or belongs to another user,
/// - [Error::Validation] if the contact does not exist or belongs to another user,
/// - [Error::Conflict] if the contact is external or already a member,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn add_member(
    owner: UserID,
    group_id: GroupId,
    contact_id: ContactId,
    connection: &Connection,
) -> Result<Member, Error> {
    let group = get_group(owner, group_id, connection)?;

    let contact = match get_contact(owner, contact_id, connection) {
        Ok(contact) => contact,
        Err(Error::NotFound) => return Err(Error::Validation("invalid contact".to_owned())),
        Err(error) => return Err(error),
    };

    if !contact.is_internal() {
        return Err(Error::Conflict(format!(
            "{} is not a customer of this bank and cannot take part in a split",
            contact.display_name
        )));
    }

    let member = connection
        .prepare(
            "INSERT INTO split_group_member (group_id, contact_id, display_name)
             VALUES (?1, ?2, ?3)
             RETURNING id, group_id, contact_id, display_name",
        )?
        .query_row(
            (group.id, contact.id, &contact.display_name),
            map_member_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Error::Conflict(format!(
                    "{} is already a member of {}",
                    contact.display_name, group.name
                ))
            }
            error => error.into(),
        })?;

    tracing::debug!("Added contact {contact_id} to split group {group_id}");

    Ok(member)
}

/// Remove member `member_id` from group `group_id`.
///
/// Transfers already made to the member are not affected.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the group or the member does not exist, or the group belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn remove_member(
    owner: UserID,
    group_id: GroupId,
    member_id: MemberId,
    connection: &Connection,
) -> Result<(), Error> {
    get_group(owner, group_id, connection)?;

    let rows_affected = connection.execute(
        "DELETE FROM split_group_member WHERE id = ?1 AND group_id = ?2",
        (member_id, group_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete group `id` of `owner` and all of its members.
///
/// # Errors
/// This function will return a:
/// - [Error::Conflict] if the group does not exist, was already deleted, or belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_group(owner: UserID, id: GroupId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM split_group WHERE id = ?1 AND user_id = ?2",
        (id, owner.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::Conflict(format!("split group {id} does not exist")));
    }

    tracing::info!("Deleted split group {id}");

    Ok(())
}

fn map_group_row(row: &Row) -> Result<Group, rusqlite::Error> {
    let raw_name: String = row.get(2)?;

    Ok(Group {
        id: row.get(0)?,
        owner: UserID::new(row.get(1)?),
        name: GroupName::new_unchecked(&raw_name),
        created_at: row.get(3)?,
        members: Vec::new(),
    })
}

fn map_member_row(row: &Row) -> Result<Member, rusqlite::Error> {
    Ok(Member {
        id: row.get(0)?,
        group_id: row.get(1)?,
        contact_id: row.get(2)?,
        display_name: row.get(3)?,
    })
}
