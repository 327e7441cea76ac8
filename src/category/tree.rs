//! Builds the category forest from flat rows and computes display amounts.

use std::collections::HashMap;

use crate::database_id::CategoryId;

use super::Category;

/// Nest `categories` under their parents and return the root categories.
///
/// The input order is kept for roots and for the children of each category,
/// so passing categories sorted by position gives a forest sorted by
/// position. A category whose parent is not in `categories` (e.g. the parent
/// was deleted) becomes a root.
///
/// Categories whose parent chain loops back on itself never reach a root.
/// They are logged and added as roots after the others so that no category
/// is lost.
pub fn build_forest(categories: Vec<Category>) -> Vec<Category> {
    let index: HashMap<CategoryId, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, category)| (category.id, i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); categories.len()];
    let mut roots = Vec::new();

    for (i, category) in categories.iter().enumerate() {
        match category.parent_id.and_then(|parent_id| index.get(&parent_id)) {
            Some(&parent) if parent != i => children[parent].push(i),
            _ => roots.push(i),
        }
    }

    let mut slots: Vec<Option<Category>> = categories.into_iter().map(Some).collect();
    let mut forest: Vec<Category> = roots
        .into_iter()
        .filter_map(|root| take_subtree(root, &mut slots, &children))
        .collect();

    for i in 0..slots.len() {
        if let Some(category) = &slots[i] {
            tracing::warn!(
                category_id = category.id,
                parent_id = ?category.parent_id,
                "category is part of a parent cycle, treating it as a root"
            );
        }

        if let Some(category) = take_subtree(i, &mut slots, &children) {
            forest.push(category);
        }
    }

    forest
}

/// Move the category at `i` and its descendants out of `slots`.
///
/// Every slot is taken at most once, so this terminates even when
/// `children` contains a cycle.
fn take_subtree(
    i: usize,
    slots: &mut [Option<Category>],
    children: &[Vec<usize>],
) -> Option<Category> {
    let mut category = slots[i].take()?;

    category.children = children[i]
        .iter()
        .filter_map(|&child| take_subtree(child, slots, children))
        .collect();

    Some(category)
}

/// Replace the amount of every category that has children with the sum of
/// its children's amounts, and return the amount of `category`.
///
/// Descendants are aggregated first. A leaf keeps its stored amount and
/// counts as zero when it has none. This only changes the in-memory values,
/// nothing is written to the database.
pub fn aggregate(category: &mut Category) -> f64 {
    if category.children.is_empty() {
        return category.amount.unwrap_or(0.0);
    }

    let total = category.children.iter_mut().map(aggregate).sum();
    category.amount = Some(total);

    total
}
