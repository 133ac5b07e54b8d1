//! Database setup shared by every domain module.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    account::create_account_table,
    auth::create_user_table,
    contact::create_contact_table,
    notification::create_notification_table,
    p2p::create_p2p_transfer_table,
    piggy::{create_piggy_bank_table, create_piggy_transfer_table},
    settings::create_user_settings_table,
    split::{create_group_member_table, create_group_table},
    transaction::create_transaction_table,
};

/// Create the tables for all of the domain models.
///
/// Foreign key enforcement is switched on for `connection` first, SQLite
/// ignores the pragma inside a transaction.
///
/// # Errors
///
/// Returns an [Error::SqlError] if any of the tables could not be created.
/// No tables are created in that case.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_contact_table(&transaction)?;
    create_piggy_bank_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_p2p_transfer_table(&transaction)?;
    create_piggy_transfer_table(&transaction)?;
    create_group_table(&transaction)?;
    create_group_member_table(&transaction)?;
    create_notification_table(&transaction)?;
    create_user_settings_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Lock the shared database connection.
///
/// # Errors
///
/// Returns an [Error::DatabaseLockError] if the mutex is poisoned.
pub fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
