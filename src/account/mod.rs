//! Accounts that money is spent from and transferred between.

mod core;

pub use core::{
    ACCOUNT_TABLE, Account, AccountName, AccountUpdate, NewAccount, account_store,
    create_account, create_account_table, delete_account, get_account, get_total_account_balance,
    list_accounts, update_account,
};

pub(crate) use core::adjust_account_balance;
