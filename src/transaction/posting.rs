//! Posting transactions and keeping account balances and category amounts in
//! step with them.

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    account::{account_store, adjust_account_balance},
    category::{adjust_category_amount, category_store},
    database_id::{AccountId, CategoryId, TransactionId},
    store::{Fields, ListOptions, in_unit_of_work},
};

use super::core::{Transaction, TransactionBuilder, date_value, transaction_store};

/// Record a transaction and apply its effects.
///
/// In a single unit of work this:
/// 1. inserts the transaction row,
/// 2. subtracts `amount` from the source account's balance,
/// 3. adds `amount` to the transfer target's balance, if there is one,
/// 4. subtracts `amount` from the category's amount, if there is one.
///
/// If any step fails, none of the changes are kept.
///
/// # Errors
/// This function will return a:
/// - [Error::MissingCategory] if the transaction is not a transfer and has no category,
/// - [Error::SelfTransfer] if the transfer target is the source account,
/// - [Error::InvalidAccount] if the source or target account is not live,
/// - [Error::InvalidCategory] if the category is not live,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn post_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<TransactionId, Error> {
    match (builder.transfer_account_id, builder.category_id) {
        (None, None) => return Err(Error::MissingCategory),
        (Some(target), _) if target == builder.account_id => {
            return Err(Error::SelfTransfer(target));
        }
        _ => {}
    }

    let result = in_unit_of_work(connection, |connection| {
        ensure_account_is_live(builder.account_id, connection)?;
        if let Some(target) = builder.transfer_account_id {
            ensure_account_is_live(target, connection)?;
        }
        if let Some(category_id) = builder.category_id {
            ensure_category_is_live(category_id, connection)?;
        }

        let id = transaction_store(connection).create(&builder.to_fields())?;
        apply_effects(
            builder.account_id,
            builder.transfer_account_id,
            builder.category_id,
            builder.amount,
            connection,
        )?;

        Ok(id)
    });

    match &result {
        Ok(id) => tracing::info!(
            transaction_id = id,
            account_id = builder.account_id,
            category_id = ?builder.category_id,
            transfer_account_id = ?builder.transfer_account_id,
            amount = builder.amount,
            "posted transaction"
        ),
        Err(error) => tracing::error!(
            account_id = builder.account_id,
            amount = builder.amount,
            "could not post transaction: {error}"
        ),
    }

    result
}

/// Reverse the effects of a posted transaction and soft delete it.
///
/// The balances and amounts touched when the transaction was posted are
/// restored as they would be by posting the same transaction with a negated
/// amount.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `transaction_id` does not refer to a live transaction,
/// - [Error::InvalidAccount] or [Error::InvalidCategory] if an account or
///   category it touched has since been deleted,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn void_transaction(transaction_id: TransactionId, connection: &Connection) -> Result<(), Error> {
    in_unit_of_work(connection, |connection| {
        let store = transaction_store(connection);
        let transaction = store.get_by_id(transaction_id)?;

        apply_effects(
            transaction.account_id,
            transaction.transfer_account_id,
            transaction.category_id,
            -transaction.amount,
            connection,
        )?;
        store.soft_delete(transaction_id)?;

        tracing::info!(transaction_id, amount = transaction.amount, "voided transaction");

        Ok(())
    })
}

fn apply_effects(
    account_id: AccountId,
    transfer_account_id: Option<AccountId>,
    category_id: Option<CategoryId>,
    amount: f64,
    connection: &Connection,
) -> Result<(), Error> {
    adjust_account_balance(account_id, -amount, connection)?;

    if let Some(target) = transfer_account_id {
        adjust_account_balance(target, amount, connection)?;
    }

    if let Some(category_id) = category_id {
        adjust_category_amount(category_id, -amount, connection)?;
    }

    Ok(())
}

fn ensure_account_is_live(account_id: AccountId, connection: &Connection) -> Result<(), Error> {
    match account_store(connection).get_by_id(account_id) {
        Ok(_) => Ok(()),
        Err(Error::NotFound) => Err(Error::InvalidAccount(account_id)),
        Err(error) => Err(error),
    }
}

fn ensure_category_is_live(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    match category_store(connection).get_by_id(category_id) {
        Ok(_) => Ok(()),
        Err(Error::NotFound) => Err(Error::InvalidCategory(category_id)),
        Err(error) => Err(error),
    }
}

/// Retrieve a single live transaction by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `transaction_id` does not refer to a live transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    transaction_store(connection).get_by_id(transaction_id)
}

/// Retrieve the live transactions selected by `options`.
///
/// # Errors
/// This function will return an error if `options` refers to an unknown
/// column or if there is an SQL error.
pub fn list_transactions(
    options: &ListOptions,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    transaction_store(connection).list(options)
}

/// Changes to the descriptive details of a transaction.
///
/// Monetary fields cannot be changed once posted. Void the transaction and
/// post a new one instead.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionDetails {
    /// The new payee. `Some(None)` clears it.
    pub payee: Option<Option<String>>,
    /// The new memo. `Some(None)` clears it.
    pub memo: Option<Option<String>>,
    /// The new date.
    pub date: Option<Date>,
}

/// Apply `details` to the live transaction `transaction_id`.
///
/// Fields left as `None` are not changed. Balances and category amounts are
/// never touched.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn update_transaction_details(
    transaction_id: TransactionId,
    details: TransactionDetails,
    connection: &Connection,
) -> Result<(), Error> {
    let fields = Fields::new()
        .set_if_some("payee", details.payee)
        .set_if_some("memo", details.memo)
        .set_if_some("date", details.date.map(date_value));

    transaction_store(connection).update(transaction_id, &fields)
}
