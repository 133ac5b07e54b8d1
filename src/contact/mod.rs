//! The owner-scoped address book used as the source of P2P recipients and group members.

mod core;
mod list_endpoint;

pub use self::core::{
    Contact, ContactId, NewContact, create_contact, create_contact_table, get_contact,
    get_contacts,
};
pub use list_endpoint::get_contacts_endpoint;
