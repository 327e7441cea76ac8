//! Column to value mappings for inserts and updates.

use rusqlite::types::Value;

/// An ordered mapping of column name to value.
///
/// Setting the same column twice keeps the position of the first call and
/// the value of the last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(&'static str, Value)>);

impl Fields {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column` to `value`.
    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        let value = value.into();

        match self.0.iter_mut().find(|(existing, _)| *existing == column) {
            Some((_, existing_value)) => *existing_value = value,
            None => self.0.push((column, value)),
        }

        self
    }

    /// Set `column` to `value` only if `value` is `Some`.
    ///
    /// Use [Fields::set] with an `Option` to explicitly write `NULL`.
    pub fn set_if_some<T: Into<Value>>(self, column: &'static str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(column, value),
            None => self,
        }
    }

    /// Whether no columns have been set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of columns that have been set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(column, _)| *column)
    }

    /// The values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(_, value)| value)
    }
}
