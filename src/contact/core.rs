//! Contact records and their database queries.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{Error, account::AccountId, auth::UserID, database_id::DatabaseId};

/// Database identifier for a contact.
pub type ContactId = DatabaseId;

/// An entry in a user's address book.
///
/// A contact is *internal* when it points at both a user and an account of
/// this bank, only internal contacts can receive P2P transfers.
/// Contacts with just an IBAN are external and cannot be paid from this service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    /// The ID of the contact.
    #[serde(rename = "contact_id")]
    pub id: ContactId,
    /// The user whose address book holds the contact.
    #[serde(skip)]
    pub owner: UserID,
    /// The name the owner gave the contact.
    pub display_name: String,
    /// The user the contact refers to, if they bank here.
    pub target_user_id: Option<UserID>,
    /// The account that receives money sent to the contact.
    pub target_account_id: Option<AccountId>,
    /// The IBAN of an external contact.
    pub iban: Option<String>,
}

impl Contact {
    /// The user and account money sent to this contact goes to.
    ///
    /// Returns `None` for external contacts.
    pub fn internal_target(&self) -> Option<(UserID, AccountId)> {
        match (self.target_user_id, self.target_account_id) {
            (Some(user_id), Some(account_id)) => Some((user_id, account_id)),
            _ => None,
        }
    }

    /// Whether the contact can receive internal transfers.
    pub fn is_internal(&self) -> bool {
        self.internal_target().is_some()
    }
}

/// The data needed to add a contact to an address book.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    /// The user whose address book the contact is added to.
    pub owner: UserID,
    /// The name shown for the contact.
    pub display_name: String,
    /// The user the contact refers to.
    pub target_user_id: Option<UserID>,
    /// The account that receives money sent to the contact.
    pub target_account_id: Option<AccountId>,
    /// The IBAN of an external contact.
    pub iban: Option<String>,
}

/// Create the contact table.
///
/// `target_account_id` is not a foreign key: an address book entry can outlive
/// the account it points at, and transfers to it then fail individually.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_contact_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS contact (
            id INTEGER PRIMARY KEY,
            owner_user_id INTEGER NOT NULL,
            display_name TEXT NOT NULL,
            target_user_id INTEGER,
            target_account_id INTEGER,
            iban TEXT,
            FOREIGN KEY(owner_user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_contact_owner ON contact(owner_user_id);",
        (),
    )?;

    Ok(())
}

/// Add a contact to the owner's address book.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the display name is blank,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_contact(new_contact: NewContact, connection: &Connection) -> Result<Contact, Error> {
    let display_name = new_contact.display_name.trim();

    if display_name.is_empty() {
        return Err(Error::Validation(
            "contact display name cannot be empty".to_owned(),
        ));
    }

    let contact = connection
        .prepare(
            "INSERT INTO contact (owner_user_id, display_name, target_user_id, target_account_id, iban)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, owner_user_id, display_name, target_user_id, target_account_id, iban",
        )?
        .query_row(
            (
                new_contact.owner.as_i64(),
                display_name,
                new_contact.target_user_id.map(|user_id| user_id.as_i64()),
                new_contact.target_account_id,
                new_contact.iban,
            ),
            map_row,
        )?;

    Ok(contact)
}

/// Get the contact `id` from the address book of `owner`.
///
/// # Errors
/// Returns an [Error::NotFound] if the contact does not exist or belongs to another user.
pub fn get_contact(owner: UserID, id: ContactId, connection: &Connection) -> Result<Contact, Error> {
    connection
        .prepare(
            "SELECT id, owner_user_id, display_name, target_user_id, target_account_id, iban
             FROM contact WHERE id = :id AND owner_user_id = :owner",
        )?
        .query_row(&[(":id", &id), (":owner", &owner.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Get the address book of `owner`, newest first.
///
/// If `search` is non-empty, only contacts whose display name contains it are returned.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_contacts(
    owner: UserID,
    search: Option<&str>,
    connection: &Connection,
) -> Result<Vec<Contact>, Error> {
    let pattern = match search.map(str::trim) {
        Some(search) if !search.is_empty() => format!("%{search}%"),
        _ => "%".to_owned(),
    };

    connection
        .prepare(
            "SELECT id, owner_user_id, display_name, target_user_id, target_account_id, iban
             FROM contact
             WHERE owner_user_id = ?1 AND display_name LIKE ?2
             ORDER BY id DESC",
        )?
        .query_map((owner.as_i64(), pattern), map_row)?
        .map(|contact_result| contact_result.map_err(Error::SqlError))
        .collect()
}

fn map_row(row: &Row) -> Result<Contact, rusqlite::Error> {
    let target_user_id: Option<i64> = row.get(3)?;

    Ok(Contact {
        id: row.get(0)?,
        owner: UserID::new(row.get(1)?),
        display_name: row.get(2)?,
        target_user_id: target_user_id.map(UserID::new),
        target_account_id: row.get(4)?,
        iban: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        auth::UserID,
        contact::{NewContact, create_contact, get_contact, get_contacts},
        test_utils::{create_test_bank, get_test_connection},
    };

    #[test]
    fn external_contact_is_not_internal() {
        let connection = get_test_connection();
        let bank = create_test_bank(&connection);

        let contact = get_contact(bank.alice.id, bank.alice_to_external, &connection).unwrap();

        assert!(!contact.is_internal());
        assert_eq!(contact.internal_target(), None);
    }

    #[test]
    fn internal_contact_has_target() {
        let connection = get_test_connection();
        let bank = create_test_bank(&connection);

        let contact = get_contact(bank.alice.id, bank.alice_to_bob, &connection).unwrap();

        assert_eq!(
            contact.internal_target(),
            Some((bank.bob.id, bank.bob_account))
        );
    }

    #[test]
    fn create_contact_fails_on_blank_name() {
        let connection = get_test_connection();
        let bank = create_test_bank(&connection);

        let result = create_contact(
            NewContact {
                owner: bank.alice.id,
                display_name: "   ".to_owned(),
                target_user_id: None,
                target_account_id: None,
                iban: Some("IT60X0542811101000000123456".to_owned()),
            },
            &connection,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn get_contact_hides_other_users_contacts() {
        let connection = get_test_connection();
        let bank = create_test_bank(&connection);

        assert_eq!(
            get_contact(bank.bob.id, bank.alice_to_bob, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_contacts_filters_by_name() {
        let connection = get_test_connection();
        let bank = create_test_bank(&connection);

        let contacts = get_contacts(bank.alice.id, Some("bian"), &connection).unwrap();

        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, bank.alice_to_bob);
    }

    #[test]
    fn get_contacts_without_search_returns_all_newest_first() {
        let connection = get_test_connection();
        let bank = create_test_bank(&connection);

        let contacts = get_contacts(bank.alice.id, None, &connection).unwrap();
        let ids: Vec<_> = contacts.iter().map(|contact| contact.id).collect();

        assert_eq!(
            ids,
            vec![bank.alice_to_external, bank.alice_to_carol, bank.alice_to_bob]
        );
        assert!(get_contacts(UserID::new(999), None, &connection).unwrap().is_empty());
    }
}
