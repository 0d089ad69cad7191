use csv::{ReaderBuilder, Trim};
use tracing::{debug, warn};

use super::raw_table::{DecodeWarning, DecodedTable, RawRow};
use super::DecodeError;

const UTF8_BOM: &str = "\u{feff}";

/// Parse CSV bytes: first record is the header line, every cell is trimmed,
/// fully blank records are skipped and short records are padded with `""`.
pub fn read_csv(bytes: &[u8]) -> Result<DecodedTable, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::ParseFailure(format!("file is not valid UTF-8: {}", e)))?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // ragged rows are reported, not rejected
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut records = rdr.records();

    // 1) header line
    let headers: Vec<String> = match records.next() {
        Some(result) => {
            let record = result.map_err(|e| DecodeError::ParseFailure(e.to_string()))?;
            record.iter().map(|h| h.trim().to_string()).collect()
        }
        None => return Ok(DecodedTable::default()),
    };
    if headers.iter().all(|h| h.is_empty()) {
        return Err(DecodeError::InvalidHeaders);
    }

    // 2) data lines
    let mut table = DecodedTable {
        headers,
        ..Default::default()
    };
    let width = table.headers.len();
    for (idx, result) in records.enumerate() {
        let record = result.map_err(|e| {
            DecodeError::ParseFailure(format!("record {}: {}", idx + 1, e))
        })?;

        if record.len() != width {
            let line = record.position().map(|p| p.line()).unwrap_or(idx as u64 + 2);
            warn!(line, expected = width, found = record.len(), "ragged CSV row");
            table.warnings.push(DecodeWarning::RaggedRow {
                line,
                expected: width,
                found: record.len(),
            });
        }

        let mut cells: Vec<String> = record
            .iter()
            .take(width)
            .map(|c| c.trim().to_string())
            .collect();
        cells.resize(width, String::new());

        let row = RawRow::new(cells);
        if row.is_blank() {
            continue;
        }
        table.rows.push(row);
    }

    debug!(
        columns = width,
        rows = table.rows.len(),
        warnings = table.warnings.len(),
        "decoded CSV"
    );
    Ok(table)
}
