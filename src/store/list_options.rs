//! Filters, sorting and pagination for [Store::list](super::Store::list).

use rusqlite::types::Value;

/// The order to sort records in a list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}

/// One sort key of a list query.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The column to sort by.
    pub column: &'static str,
    /// The direction to sort in.
    pub order: SortOrder,
}

/// A condition on a single column.
///
/// Each filter owns the values it compares against, they are bound as
/// positional parameters in the order the filters were added.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Equals(&'static str, Value),
    /// `column != value`
    NotEquals(&'static str, Value),
    /// `column < value`
    LessThan(&'static str, Value),
    /// `column <= value`
    AtMost(&'static str, Value),
    /// `column > value`
    GreaterThan(&'static str, Value),
    /// `column >= value`
    AtLeast(&'static str, Value),
    /// `column BETWEEN start AND end`, inclusive on both ends.
    Between(&'static str, Value, Value),
    /// `column IS NULL`
    IsNull(&'static str),
    /// `column IS NOT NULL`
    IsNotNull(&'static str),
}

impl Filter {
    /// The column the filter applies to.
    pub fn column(&self) -> &'static str {
        match self {
            Filter::Equals(column, _)
            | Filter::NotEquals(column, _)
            | Filter::LessThan(column, _)
            | Filter::AtMost(column, _)
            | Filter::GreaterThan(column, _)
            | Filter::AtLeast(column, _)
            | Filter::Between(column, _, _)
            | Filter::IsNull(column)
            | Filter::IsNotNull(column) => column,
        }
    }

    /// Render the filter as a SQL condition, appending its values to
    /// `params` so that the placeholders line up with their position.
    pub(super) fn push_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Filter::Equals(column, value) => comparison(column, "=", value, params),
            Filter::NotEquals(column, value) => comparison(column, "!=", value, params),
            Filter::LessThan(column, value) => comparison(column, "<", value, params),
            Filter::AtMost(column, value) => comparison(column, "<=", value, params),
            Filter::GreaterThan(column, value) => comparison(column, ">", value, params),
            Filter::AtLeast(column, value) => comparison(column, ">=", value, params),
            Filter::Between(column, start, end) => {
                params.push(start.clone());
                params.push(end.clone());
                format!(
                    "{column} BETWEEN ?{} AND ?{}",
                    params.len() - 1,
                    params.len()
                )
            }
            Filter::IsNull(column) => format!("{column} IS NULL"),
            Filter::IsNotNull(column) => format!("{column} IS NOT NULL"),
        }
    }
}

fn comparison(column: &str, operator: &str, value: &Value, params: &mut Vec<Value>) -> String {
    params.push(value.clone());
    format!("{column} {operator} ?{}", params.len())
}

/// Defines which records [Store::list](super::Store::list) returns and in
/// which order.
///
/// The default value selects every live record in storage order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    /// Conditions that must all hold.
    pub filters: Vec<Filter>,
    /// Sort keys, most significant first.
    pub order_by: Vec<OrderBy>,
    /// Selects up to the first N records.
    pub limit: Option<u64>,
    /// Skips the first N records.
    pub offset: Option<u64>,
}

impl ListOptions {
    /// Add a filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a sort key after any existing ones.
    pub fn order_by(mut self, column: &'static str, order: SortOrder) -> Self {
        self.order_by.push(OrderBy { column, order });
        self
    }

    /// Set the maximum number of records to return.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the number of records to skip.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The columns referred to by the filters and sort keys.
    pub(super) fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters
            .iter()
            .map(Filter::column)
            .chain(self.order_by.iter().map(|order_by| order_by.column))
    }

    /// Render everything after the base `WHERE` condition.
    pub(super) fn push_sql(&self, query: &mut String, params: &mut Vec<Value>) {
        for filter in &self.filters {
            query.push_str(" AND ");
            query.push_str(&filter.push_sql(params));
        }

        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|OrderBy { column, order }| match order {
                    SortOrder::Ascending => format!("{column} ASC"),
                    SortOrder::Descending => format!("{column} DESC"),
                })
                .collect();
            query.push_str(" ORDER BY ");
            query.push_str(&keys.join(", "));
        }

        // SQLite only accepts OFFSET after a LIMIT, -1 means no limit.
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                query.push_str(&format!(" LIMIT {limit} OFFSET {offset}"))
            }
            (Some(limit), None) => query.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => query.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
    }
}
