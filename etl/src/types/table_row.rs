use crate::types::Cell;

/// An ordered list of cells, positionally matching the column names of its table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    pub values: Vec<Cell>,
}

impl TableRow {
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Cell> {
        self.values
    }

    /// Returns the cell at `index`, treating out of range positions as null.
    pub fn get(&self, index: usize) -> &Cell {
        self.values.get(index).unwrap_or(&Cell::Null)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Cell>> for TableRow {
    fn from(values: Vec<Cell>) -> Self {
        Self::new(values)
    }
}
