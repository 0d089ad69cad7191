use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::Timelike;
use std::io::Cursor;
use tracing::debug;

use super::raw_table::{DecodedTable, RawRow};
use super::DecodeError;

/// Stringify one cell the way it reads on screen.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.num_seconds_from_midnight() == 0 => ts.format("%Y-%m-%d").to_string(),
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        other => other.to_string().trim().to_string(),
    }
}

/// Read the first worksheet of an XLSX/XLS workbook. Row 1 holds the headers,
/// later rows are read positionally and fully empty rows are dropped.
pub fn read_workbook(bytes: &[u8]) -> Result<DecodedTable, DecodeError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| DecodeError::ParseFailure(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    if sheet_names.len() > 1 {
        debug!(ignored = ?&sheet_names[1..], "only the first worksheet is read");
    }

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => return Err(DecodeError::ParseFailure(e.to_string())),
        None => return Ok(DecodedTable::default()),
    };

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(cell_to_string).collect(),
        None => return Ok(DecodedTable::default()),
    };
    if headers.iter().all(|h| h.is_empty()) {
        return Err(DecodeError::InvalidHeaders);
    }

    let width = headers.len();
    let data: Vec<RawRow> = rows
        .map(|cells| {
            let mut values: Vec<String> = cells.iter().take(width).map(cell_to_string).collect();
            values.resize(width, String::new());
            RawRow::new(values)
        })
        .filter(|row| !row.is_blank())
        .collect();

    debug!(columns = width, rows = data.len(), "decoded worksheet");
    Ok(DecodedTable {
        headers,
        rows: data,
        warnings: Vec::new(),
    })
}
