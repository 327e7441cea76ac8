//! Hierarchical spending categories.

mod core;
mod db;
mod tree;

pub use core::{
    CATEGORY_TABLE, Category, CategoryName, category_store, create_category_table,
};
pub use db::{
    CategoryUpdate, NewCategory, create_category, delete_category, get_category,
    get_category_forest, list_categories, reorder_category, update_category,
};
pub use tree::{aggregate, build_forest};

pub(crate) use core::adjust_category_amount;
