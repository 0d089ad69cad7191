use serde::Serialize;

/// Non-fatal problem noticed while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    /// A record had a different cell count than the header line.
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// One data row, cells aligned with `DecodedTable::headers` and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct RawRow {
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn cell(&self, col: usize) -> &str {
        self.cells.get(col).map(String::as_str).unwrap_or("")
    }

    pub fn set_cell(&mut self, col: usize, value: String) {
        if col >= self.cells.len() {
            self.cells.resize(col + 1, String::new());
        }
        self.cells[col] = value;
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DecodedTable {
    /// Column names in file order, as the file claims them (may repeat).
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub warnings: Vec<DecodeWarning>,
}

impl DecodedTable {
    /// Value of the first column called `header`, if the file has one.
    pub fn value<'a>(&self, row: &'a RawRow, header: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .position(|h| h == header)
            .map(|col| row.cell(col))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
