//! Instant peer-to-peer transfers between accounts of this bank.

mod ledger;
mod send_endpoint;

pub use ledger::{NewP2PTransfer, P2PTransfer, TransferId, create_p2p_transfer_table, post_p2p};
pub use send_endpoint::send_p2p_endpoint;

#[cfg(test)]
pub use ledger::{apply_p2p, get_p2p_transfer};
