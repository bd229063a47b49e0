//! Columnar in-memory table storage.

use crate::error::{Error, Result};
use crate::value::{DataType, Value};

/// A single named, typed column.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    #[must_use]
    pub const fn new(name: String, data_type: DataType) -> Self {
        Self { name, data_type }
    }
}

/// An ordered set of typed columns, each holding its own value list (all
/// lists the same length). Column names are unique case-insensitively.
///
/// Storage is genuinely columnar: `data[i]` is the full value list for
/// `columns[i]`, not a list of rows. Row-oriented access (`get_row`,
/// `insert_row`, ...) gathers/scatters across those per-column lists.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    columns: Vec<Column>,
    data: Vec<Vec<Value>>,
}

impl Table {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let data = columns.iter().map(|_| Vec::new()).collect();
        Self {
            name: name.into(),
            columns,
            data,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    /// Materializes every row in row-major order. Storage itself stays
    /// columnar; this gathers one value per column per row.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<Value>> {
        (0..self.row_count())
            .map(|i| self.data.iter().map(|col| col[i].clone()).collect())
            .collect()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Appends a column, padding every existing row with `Null`.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.column_index(&column.name).is_some() {
            return Err(Error::duplicate("column", column.name));
        }
        let row_count = self.row_count();
        self.columns.push(column);
        self.data.push(vec![Value::Null; row_count]);
        Ok(())
    }

    /// Drops a column, preserving the relative order of the rest.
    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| Error::not_found("column", name))?;
        self.columns.remove(idx);
        self.data.remove(idx);
        Ok(())
    }

    /// Appends a full row, coercing each value to its column's declared
    /// type. An untyped (`Any`) column is pinned to the type of the first
    /// non-null value written to it.
    pub fn insert_row(&mut self, mut values: Vec<Value>) -> Result<usize> {
        assert_eq!(values.len(), self.columns.len());
        for (col, value) in self.columns.iter_mut().zip(values.iter_mut()) {
            if col.data_type == DataType::Any {
                if !value.is_null() {
                    col.data_type = value.data_type();
                }
            } else {
                *value = value.coerce(col.data_type)?;
            }
        }
        for (column_data, value) in self.data.iter_mut().zip(values) {
            column_data.push(value);
        }
        Ok(self.row_count() - 1)
    }

    #[must_use]
    pub fn get_row(&self, index: usize) -> Option<Vec<Value>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.data.iter().map(|col| col[index].clone()).collect())
    }

    /// Replaces a whole row in place, coercing to column types.
    pub fn set_row(&mut self, index: usize, mut values: Vec<Value>) -> Result<()> {
        assert_eq!(values.len(), self.columns.len());
        for (col, value) in self.columns.iter().zip(values.iter_mut()) {
            *value = value.coerce(col.data_type)?;
        }
        for (column_data, value) in self.data.iter_mut().zip(values) {
            column_data[index] = value;
        }
        Ok(())
    }

    pub fn remove_row(&mut self, index: usize) -> Vec<Value> {
        self.data.iter_mut().map(|col| col.remove(index)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            "t",
            vec![
                Column::new("id".into(), DataType::Int),
                Column::new("name".into(), DataType::Text),
            ],
        )
    }

    #[test]
    fn insert_coerces_column_types() {
        let mut t = sample();
        t.insert_row(vec![Value::Text("1".into()), Value::Text("a".into())])
            .unwrap();
        assert!(matches!(t.get_row(0).unwrap()[0], Value::Int(1)));
    }

    #[test]
    fn add_column_pads_existing_rows_with_null() {
        let mut t = sample();
        t.insert_row(vec![Value::Int(1), Value::Text("a".into())])
            .unwrap();
        t.add_column(Column::new("extra".into(), DataType::Any))
            .unwrap();
        assert!(t.get_row(0).unwrap()[2].is_null());
    }

    #[test]
    fn drop_column_preserves_order() {
        let mut t = sample();
        t.insert_row(vec![Value::Int(1), Value::Text("a".into())])
            .unwrap();
        t.drop_column("id").unwrap();
        assert_eq!(t.columns()[0].name, "name");
        assert_eq!(t.get_row(0).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_column_name_rejected() {
        let mut t = sample();
        assert!(t
            .add_column(Column::new("id".into(), DataType::Int))
            .is_err());
    }
}
