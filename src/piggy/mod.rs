//! Piggy banks: savings goals funded from, and refunded to, checking accounts.

mod core;
mod endpoints;
mod ledger;

pub use self::core::{
    PiggyBank, PiggyId, create_piggy_bank, create_piggy_bank_table,
    delete_piggy_bank, get_piggy_bank, get_piggy_banks,
};
pub use endpoints::{
    create_piggy_bank_endpoint, delete_piggy_bank_endpoint, get_piggy_banks_endpoint,
    piggy_transfer_endpoint,
};
pub use ledger::{
    NewPiggyTransfer, PiggyDirection, PiggyTransfer, apply_piggy_transfer,
    create_piggy_transfer_table, post_piggy_transfer,
};

#[cfg(test)]
pub use self::core::PiggyStatus;
