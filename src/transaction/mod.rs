//! Transactions and how posting them moves money.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - The poster that applies a transaction to account balances and category amounts
//! - Functions for reading, correcting and voiding posted transactions

mod core;
mod posting;

pub use core::{
    TRANSACTION_TABLE, Transaction, TransactionBuilder, create_transaction_table,
    transaction_store,
};
pub use posting::{
    TransactionDetails, get_transaction, list_transactions, post_transaction,
    update_transaction_details, void_transaction,
};
