//! A generic record store shared by every entity in the ledger.
//!
//! Each entity describes its row shape with [Record] and gets create, read,
//! update, soft delete and list operations from [Store]. Entities with a
//! display order also implement [Ordered] to get the reorder operations.

mod fields;
mod list_options;
mod ordering;
mod record;
mod record_store;
mod unit_of_work;

pub use fields::Fields;
pub use list_options::{Filter, ListOptions, OrderBy, SortOrder};
pub use record::{Ordered, Record};
pub use record_store::Store;
pub use unit_of_work::in_unit_of_work;
