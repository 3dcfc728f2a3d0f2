//! In-memory table handle exchanged between stages.
//!
//! A [`Table`] is an immutable, reference-counted batch of `f64` columns.
//! Cloning a table is cheap and never copies the underlying data, so stages
//! can pass tables around by value. Operations that "modify" a table
//! ([`Table::select`], [`Table::with_column`], ...) return a new table.
//!
//! # Example
//! ```
//! use ml_stages::table::Table;
//!
//! let table = Table::from_rows(["x", "y"], &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
//! assert_eq!(table.num_rows(), 2);
//! assert_eq!(table.column("y").unwrap().to_vec(), vec![2.0, 4.0]);
//! ```

use crate::error::{Result, StageError};
use ndarray::{concatenate, Array1, Array2, ArrayView1, Axis};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered, duplicate-free list of column names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    names: Vec<String>,
}

impl Schema {
    /// Build a schema, rejecting duplicate column names.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(StageError::Schema(format!(
                    "duplicate column name '{}'",
                    name
                )));
            }
        }
        Ok(Self { names })
    }

    /// Column names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of the named column, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct TableData {
    schema: Schema,
    data: Array2<f64>,
}

/// Immutable handle to a bounded batch of rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    inner: Arc<TableData>,
}

impl Table {
    /// Create a table from a schema and a `(rows, columns)` matrix.
    ///
    /// # Errors
    /// Returns [`StageError::Schema`] if the matrix width differs from the
    /// number of columns in the schema.
    pub fn new(schema: Schema, data: Array2<f64>) -> Result<Self> {
        if data.ncols() != schema.len() {
            return Err(StageError::Schema(format!(
                "schema has {} columns but data has {}",
                schema.len(),
                data.ncols()
            )));
        }
        Ok(Self {
            inner: Arc::new(TableData { schema, data }),
        })
    }

    /// Create a table from row vectors.
    ///
    /// # Errors
    /// Returns [`StageError::Schema`] on duplicate names or ragged rows.
    pub fn from_rows<I, S>(names: I, rows: &[Vec<f64>]) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = Schema::new(names)?;
        let width = schema.len();
        let mut flat = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(StageError::Schema(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
            flat.extend_from_slice(row);
        }
        let data = Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| StageError::Schema(e.to_string()))?;
        Self::new(schema, data)
    }

    /// Create a table with the given columns and no rows.
    pub fn empty<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = Schema::new(names)?;
        let data = Array2::zeros((0, schema.len()));
        Self::new(schema, data)
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn num_rows(&self) -> usize {
        self.inner.data.nrows()
    }

    pub fn num_columns(&self) -> usize {
        self.inner.data.ncols()
    }

    /// Underlying `(rows, columns)` matrix.
    pub fn data(&self) -> &Array2<f64> {
        &self.inner.data
    }

    /// View of the named column.
    pub fn column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        let idx = self.column_index(name)?;
        Ok(self.inner.data.column(idx))
    }

    /// View of the `i`-th row, or `None` when out of bounds.
    pub fn row(&self, i: usize) -> Option<ArrayView1<'_, f64>> {
        (i < self.num_rows()).then(|| self.inner.data.row(i))
    }

    /// Iterate over rows in order.
    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.inner.data.rows().into_iter()
    }

    /// Project the table onto the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>>>()?;
        let schema = Schema::new(names.iter().copied())?;
        Table::new(schema, self.inner.data.select(Axis(1), &indices))
    }

    /// Return a table with `values` stored under `name`.
    ///
    /// An existing column with the same name is replaced in place; otherwise
    /// the column is appended.
    pub fn with_column(&self, name: &str, values: Array1<f64>) -> Result<Table> {
        if values.len() != self.num_rows() {
            return Err(StageError::Schema(format!(
                "column '{}' has {} values, table has {} rows",
                name,
                values.len(),
                self.num_rows()
            )));
        }

        if let Some(idx) = self.schema().index_of(name) {
            let mut data = self.inner.data.clone();
            data.column_mut(idx).assign(&values);
            return Table::new(self.schema().clone(), data);
        }

        let data = concatenate(
            Axis(1),
            &[self.inner.data.view(), values.view().insert_axis(Axis(1))],
        )
        .map_err(|e| StageError::Schema(e.to_string()))?;
        let mut names = self.schema().names().to_vec();
        names.push(name.to_string());
        Table::new(Schema::new(names)?, data)
    }

    /// Apply `f` element-wise to the named column.
    pub fn map_column<F>(&self, name: &str, f: F) -> Result<Table>
    where
        F: FnMut(f64) -> f64,
    {
        let values = self.column(name)?.mapv(f);
        self.with_column(name, values)
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.schema()
            .index_of(name)
            .ok_or_else(|| StageError::Schema(format!("unknown column '{}'", name)))
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = TableData::deserialize(deserializer)?;
        // Re-run validation: persisted bytes are untrusted.
        let schema = Schema::new(raw.schema.names).map_err(D::Error::custom)?;
        Table::new(schema, raw.data).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    fn sample() -> Table {
        Table::from_rows(
            ["a", "b"],
            &[vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_shape() {
        let table = sample();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.schema().names(), &["a", "b"]);
    }

    #[test]
    fn test_from_rows_ragged() {
        let err = Table::from_rows(["a", "b"], &[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, StageError::Schema(_)));
    }

    #[test]
    fn test_duplicate_column_names_rejected() {
        let err = Table::from_rows(["a", "a"], &[vec![1.0, 2.0]]).unwrap_err();
        assert!(err.to_string().contains("duplicate column name"));
    }

    #[test]
    fn test_new_width_mismatch() {
        let schema = Schema::new(["a"]).unwrap();
        let err = Table::new(schema, array![[1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, StageError::Schema(_)));
    }

    #[test]
    fn test_empty_table() {
        let table = Table::empty(["x", "y", "z"]).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 3);
        assert!(table.row(0).is_none());
    }

    #[test]
    fn test_column_and_row_access() {
        let table = sample();
        assert_eq!(table.column("b").unwrap().to_vec(), vec![10.0, 20.0, 30.0]);
        assert_eq!(table.row(1).unwrap().to_vec(), vec![2.0, 20.0]);
        assert_eq!(table.rows().count(), 3);
        assert!(table.column("missing").is_err());
    }

    #[test]
    fn test_select_reorders() {
        let table = sample().select(&["b", "a"]).unwrap();
        assert_eq!(table.schema().names(), &["b", "a"]);
        assert_eq!(table.row(0).unwrap().to_vec(), vec![10.0, 1.0]);
    }

    #[test]
    fn test_with_column_appends() {
        let table = sample().with_column("c", array![7.0, 8.0, 9.0]).unwrap();
        assert_eq!(table.num_columns(), 3);
        assert_eq!(table.column("c").unwrap().to_vec(), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_with_column_replaces() {
        let original = sample();
        let table = original.with_column("a", array![0.0, 0.0, 0.0]).unwrap();
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.column("a").unwrap().to_vec(), vec![0.0, 0.0, 0.0]);
        // The source table is untouched.
        assert_eq!(original.column("a").unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_with_column_length_mismatch() {
        assert!(sample().with_column("c", array![1.0]).is_err());
    }

    #[test]
    fn test_map_column() {
        let table = sample().map_column("a", |x| x * 2.0).unwrap();
        assert_eq!(table.column("a").unwrap().to_vec(), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_clone_shares_data() {
        let table = sample();
        let copy = table.clone();
        assert!(Arc::ptr_eq(&table.inner, &copy.inner));
        assert_eq!(table, copy);
    }

    #[test]
    fn test_bincode_preserves_table() {
        let table = sample();
        let bytes = bincode::serialize(&table).unwrap();
        let restored: Table = bincode::deserialize(&bytes).unwrap();
        assert_eq!(table, restored);
    }

    proptest! {
        #[test]
        fn prop_from_rows_keeps_dimensions(rows in 0usize..20, cols in 1usize..6) {
            let names: Vec<String> = (0..cols).map(|i| format!("c{}", i)).collect();
            let data: Vec<Vec<f64>> = (0..rows)
                .map(|r| (0..cols).map(|c| (r * cols + c) as f64).collect())
                .collect();
            let table = Table::from_rows(names, &data).unwrap();
            prop_assert_eq!(table.num_rows(), rows);
            prop_assert_eq!(table.num_columns(), cols);
        }
    }
}
