use chrono::{DateTime, Utc};
use serde::Serialize;
use tracefall_core::error::{Result, TracefallError};

/// One value in a column, typed the way query engines hand them over.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    BigInt(i128),
    Float(f64),
    Str(String),
    Date(DateTime<Utc>),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Str(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Str(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn get(&self, row: usize) -> &Cell {
        self.cells.get(row).unwrap_or(&Cell::Null)
    }
}

/// Named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnBatch {
    columns: Vec<Column>,
    rows: usize,
}

impl ColumnBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: &str, cells: Vec<Cell>) -> Result<Self> {
        self.push_column(name, cells)?;
        Ok(self)
    }

    pub fn push_column(&mut self, name: &str, cells: Vec<Cell>) -> Result<()> {
        if self.column(name).is_some() {
            return Err(TracefallError::Ingest(format!("duplicate column {name}")));
        }
        if !self.columns.is_empty() && cells.len() != self.rows {
            return Err(TracefallError::Ingest(format!(
                "column {name} has {} rows, expected {}",
                cells.len(),
                self.rows
            )));
        }
        self.rows = cells.len();
        self.columns.push(Column {
            name: name.to_string(),
            cells,
        });
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}
