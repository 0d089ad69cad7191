// src/session/mod.rs
pub mod draft;
pub mod sink;
pub mod uploader;

pub use draft::{FormValue, RowDraft};
pub use sink::{CommitPayload, JsonSink, LogSink, SaveHandler};
pub use uploader::Uploader;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::decode::{DecodeError, DecodedTable, DEFAULT_MAX_UPLOAD_BYTES};
use crate::mapping::{coerce_cell, map_row, map_rows, DateConvention, NormalizedRow};
use crate::reconcile::{reconcile, resolve_column, HeaderMismatch};
use crate::schema::Schema;
use crate::validate::{validate, HeaderPolicy, Validation};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("row {row} does not exist ({len} rows)")]
    NoSuchRow { row: usize, len: usize },
    #[error("column {col} does not exist ({len} columns)")]
    NoSuchColumn { col: usize, len: usize },
    #[error("row {row} is open in the edit form")]
    RowFormOpen { row: usize },
    #[error("no row is being edited")]
    NotEditing,
    #[error("commit blocked: {errors} validation errors, headers ok: {headers_ok}")]
    CommitBlocked { errors: usize, headers_ok: bool },
    #[error("upload has already been committed")]
    Committed,
    #[error("file is still being decoded")]
    DecodeInFlight,
    #[error("save handler failed: {0}")]
    Save(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    Decoding,
    /// Headers parsed but no data rows.
    DecodedEmpty,
    Decoded,
    DecodeFailed,
    EditingRow { row: usize },
    Committed,
}

/// Knobs that change how an upload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub dates: DateConvention,
    pub headers: HeaderPolicy,
    pub max_upload_bytes: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            dates: DateConvention::default(),
            headers: HeaderPolicy::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Identifies one `begin_upload`; only the latest ticket is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewCell {
    pub field: String,
    pub text: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub index: usize,
    pub cells: Vec<PreviewCell>,
}

/// Everything derived from one uploaded file, up to its commit.
///
/// Raw rows and normalized rows always have the same length and order; the
/// position is the row's identity within the session.
#[derive(Debug)]
pub struct UploadSession {
    schema: Schema,
    options: SessionOptions,
    state: SessionState,
    generation: u64,
    file_name: Option<String>,
    table: DecodedTable,
    rows: Vec<NormalizedRow>,
    mismatch: HeaderMismatch,
    validation: Validation,
    decode_error: Option<DecodeError>,
}

impl UploadSession {
    pub fn new(schema: Schema, options: SessionOptions) -> Self {
        Self {
            schema,
            options,
            state: SessionState::Empty,
            generation: 0,
            file_name: None,
            table: DecodedTable::default(),
            rows: Vec::new(),
            mismatch: HeaderMismatch::default(),
            validation: Validation::default(),
            decode_error: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn table(&self) -> &DecodedTable {
        &self.table
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn mismatch(&self) -> &HeaderMismatch {
        &self.mismatch
    }

    pub fn validation(&self) -> &Validation {
        &self.validation
    }

    pub fn decode_error(&self) -> Option<&DecodeError> {
        self.decode_error.as_ref()
    }

    pub fn is_empty_file(&self) -> bool {
        self.state == SessionState::DecodedEmpty
    }

    fn reset(&mut self) {
        self.file_name = None;
        self.table = DecodedTable::default();
        self.rows.clear();
        self.mismatch = HeaderMismatch::default();
        self.validation = Validation::default();
        self.decode_error = None;
    }

    /// Drop the current file and everything derived from it. A decode still
    /// in flight will be ignored when it completes.
    pub fn clear(&mut self) {
        self.reset();
        self.generation += 1;
        self.state = SessionState::Empty;
        debug!(entity = %self.schema.entity, "session cleared");
    }

    /// Start a new upload, superseding any earlier one.
    pub fn begin_upload(&mut self, name: &str) -> UploadTicket {
        self.reset();
        self.generation += 1;
        self.file_name = Some(name.to_string());
        self.state = SessionState::Decoding;
        info!(file = name, generation = self.generation, "upload started");
        UploadTicket {
            generation: self.generation,
        }
    }

    /// Apply a decode result. Returns `false` when `ticket` was superseded and
    /// the result was dropped.
    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<DecodedTable, DecodeError>,
    ) -> bool {
        if ticket.generation != self.generation || self.state != SessionState::Decoding {
            warn!(
                ticket = ticket.generation,
                current = self.generation,
                "dropping stale decode result"
            );
            return false;
        }

        match result {
            Ok(table) if table.rows.is_empty() => {
                self.mismatch = reconcile(&table.headers, &self.schema);
                self.table = table;
                self.state = SessionState::DecodedEmpty;
            }
            Ok(table) => {
                self.mismatch = reconcile(&table.headers, &self.schema);
                self.rows = map_rows(&table, &self.schema, self.options.dates);
                self.table = table;
                self.revalidate();
                self.state = SessionState::Decoded;
            }
            Err(DecodeError::EmptyFile) => {
                self.state = SessionState::DecodedEmpty;
            }
            Err(e) => {
                warn!(file = ?self.file_name, error = %e, "decode failed");
                self.decode_error = Some(e);
                self.state = SessionState::DecodeFailed;
            }
        }

        info!(
            file = ?self.file_name,
            state = ?self.state,
            rows = self.rows.len(),
            errors = self.validation.error_count(),
            "upload decoded"
        );
        true
    }

    fn revalidate(&mut self) {
        self.validation = validate(
            &self.rows,
            &self.schema,
            &self.mismatch,
            self.options.headers,
        );
    }

    fn ensure_rows(&self, row: usize) -> Result<(), SessionError> {
        match self.state {
            SessionState::Committed => return Err(SessionError::Committed),
            SessionState::Decoding => return Err(SessionError::DecodeInFlight),
            _ => {}
        }
        if row >= self.rows.len() {
            return Err(SessionError::NoSuchRow {
                row,
                len: self.rows.len(),
            });
        }
        Ok(())
    }

    /// Open `row` for editing. Opening another row replaces the open draft.
    pub fn begin_edit(&mut self, row: usize) -> Result<RowDraft, SessionError> {
        self.ensure_rows(row)?;
        self.state = SessionState::EditingRow { row };
        Ok(RowDraft::from_row(&self.schema, row, &self.rows[row]))
    }

    /// Write the draft's changed controls back into its row and revalidate
    /// everything. Untouched cells keep their value, valid or not.
    pub fn save_edit(&mut self, draft: &RowDraft) -> Result<(), SessionError> {
        let row = match self.state {
            SessionState::EditingRow { row } if row == draft.row() => row,
            SessionState::Committed => return Err(SessionError::Committed),
            _ => return Err(SessionError::NotEditing),
        };

        for (name, value) in draft.changes() {
            let Some(field) = self.schema.field(name) else {
                continue;
            };
            let raw = value.to_raw();
            self.rows[row].set(name, coerce_cell(field, &raw, self.options.dates));
            if let Some(col) = resolve_column(field, &self.table.headers) {
                self.table.rows[row].set_cell(col, raw);
            }
        }

        self.revalidate();
        self.state = SessionState::Decoded;
        info!(row = row + 1, errors = self.validation.error_count(), "row saved");
        Ok(())
    }

    pub fn cancel_edit(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::EditingRow { .. } => {
                self.state = SessionState::Decoded;
                Ok(())
            }
            _ => Err(SessionError::NotEditing),
        }
    }

    /// Overwrite one raw cell in the header-agnostic grid, then re-map that
    /// row and revalidate. `col` indexes `table().headers`.
    pub fn edit_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), SessionError> {
        self.ensure_rows(row)?;
        if let SessionState::EditingRow { row: open } = self.state {
            return Err(SessionError::RowFormOpen { row: open });
        }
        let len = self.table.headers.len();
        if col >= len {
            return Err(SessionError::NoSuchColumn { col, len });
        }

        self.table.rows[row].set_cell(col, value.trim().to_string());
        self.rows[row] = map_row(
            &self.table.rows[row],
            &self.table.headers,
            &self.schema,
            self.options.dates,
        );
        self.revalidate();
        debug!(
            row = row + 1,
            header = %self.table.headers[col],
            errors = self.validation.error_count(),
            "cell edited"
        );
        Ok(())
    }

    /// Remove `row`; every later row moves up one position.
    pub fn delete_row(&mut self, row: usize) -> Result<(), SessionError> {
        self.ensure_rows(row)?;
        self.table.rows.remove(row);
        self.rows.remove(row);
        self.revalidate();
        self.state = if self.rows.is_empty() {
            SessionState::DecodedEmpty
        } else {
            SessionState::Decoded
        };
        info!(row = row + 1, remaining = self.rows.len(), "row deleted");
        Ok(())
    }

    /// Display grid over the fields read from the file.
    pub fn preview(&self) -> Vec<PreviewRow> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| PreviewRow {
                index,
                cells: self
                    .schema
                    .mapped_fields()
                    .map(|field| PreviewCell {
                        field: field.name.clone(),
                        text: row
                            .get(&field.name)
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        error: self
                            .validation
                            .error_for(index, &field.name)
                            .map(|e| e.message.clone()),
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn commit_enabled(&self) -> bool {
        self.state == SessionState::Decoded && !self.rows.is_empty() && self.validation.is_valid
    }

    /// Hand every row, with the raw grid it came from, to `handler`.
    /// Terminal for this upload.
    pub fn commit(&mut self, handler: &mut dyn SaveHandler) -> Result<usize, SessionError> {
        match self.state {
            SessionState::Committed => return Err(SessionError::Committed),
            SessionState::Decoding => return Err(SessionError::DecodeInFlight),
            _ => {}
        }
        if !self.commit_enabled() {
            return Err(SessionError::CommitBlocked {
                errors: self.validation.error_count(),
                headers_ok: self.validation.headers_ok,
            });
        }

        let payload = CommitPayload {
            entity: &self.schema.entity,
            file_name: self.file_name.as_deref(),
            headers: &self.table.headers,
            rows: &self.rows,
            table_data: &self.table.rows,
        };
        handler
            .save(&payload)
            .map_err(|e| SessionError::Save(format!("{:#}", e)))?;
        self.state = SessionState::Committed;
        info!(entity = %self.schema.entity, rows = self.rows.len(), "upload committed");
        Ok(self.rows.len())
    }
}
