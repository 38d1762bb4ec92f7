use serde::Serialize;

use crate::error::{DeskError, Result, TableError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Empty fields are read as missing values.
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(field.to_string())
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(value) => Some(value.as_str()),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    fn to_field(&self) -> &str {
        self.as_str().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TabularDataset {
    columns: Vec<Column>,
}

impl TabularDataset {
    pub fn new(columns: Vec<Column>) -> std::result::Result<Self, TableError> {
        if let Some(first) = columns.first() {
            let expected = first.cells.len();
            if let Some(bad) = columns.iter().find(|c| c.cells.len() != expected) {
                return Err(TableError::RaggedColumn {
                    column: bad.name.clone(),
                    expected,
                    found: bad.cells.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn from_rows(
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> std::result::Result<Self, TableError> {
        let width = headers.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(TableError::RowTooLong {
                    row: idx + 1,
                    expected: width,
                    found: row.len(),
                });
            }
            let mut fields = row.into_iter();
            for column in columns.iter_mut() {
                let cell = fields
                    .next()
                    .map(|field| Cell::from_field(&field))
                    .unwrap_or(Cell::Missing);
                column.cells.push(cell);
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.cells.len()).unwrap_or(0)
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        let mut renamed = false;
        for column in self.columns.iter_mut().filter(|c| c.name == from) {
            column.name = to.to_string();
            renamed = true;
        }
        renamed
    }

    pub fn insert_column(
        &mut self,
        index: usize,
        column: Column,
    ) -> std::result::Result<(), TableError> {
        if index > self.columns.len() {
            return Err(TableError::IndexOutOfRange {
                index,
                width: self.columns.len(),
            });
        }
        if self.column(&column.name).is_some() {
            return Err(TableError::DuplicateColumn(column.name));
        }
        if !self.columns.is_empty() && column.cells.len() != self.row_count() {
            return Err(TableError::RaggedColumn {
                column: column.name,
                expected: self.row_count(),
                found: column.cells.len(),
            });
        }
        self.columns.insert(index, column);
        Ok(())
    }

    pub fn map_column<F>(&mut self, index: usize, mut f: F) -> std::result::Result<(), TableError>
    where
        F: FnMut(Cell) -> Cell,
    {
        let width = self.columns.len();
        let column = self
            .columns
            .get_mut(index)
            .ok_or(TableError::IndexOutOfRange { index, width })?;
        for cell in column.cells.iter_mut() {
            let current = std::mem::replace(cell, Cell::Missing);
            *cell = f(current);
        }
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b',')
            .from_writer(Vec::new());
        writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for idx in 0..self.row_count() {
            writer.write_record(self.columns.iter().map(|c| c.cells[idx].to_field()))?;
        }
        writer
            .into_inner()
            .map_err(|err| DeskError::Io(err.into_error()))
    }
}
