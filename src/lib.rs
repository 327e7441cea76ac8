//! The storage and bookkeeping core of a personal finance ledger.
//!
//! Accounts hold balances, categories form a budget tree, and posting a
//! transaction moves money out of an account and against a category in one
//! all-or-nothing step. Everything is stored in SQLite through a small
//! generic record store.

#![warn(missing_docs)]

pub mod account;
pub mod category;
mod database_id;
mod db;
mod error;
mod ledger;
pub mod store;
pub mod transaction;

pub use database_id::{AccountId, CategoryId, DatabaseId, TransactionId};
pub use db::initialize as initialize_db;
pub use error::{Error, ErrorKind};
pub use ledger::Ledger;
