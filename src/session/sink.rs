// src/session/sink.rs

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use tracing::info;

use crate::decode::RawRow;
use crate::mapping::NormalizedRow;

/// What one commit hands over: the normalized rows plus the file and raw grid
/// they were read from, in the same order.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPayload<'a> {
    pub entity: &'a str,
    pub file_name: Option<&'a str>,
    pub headers: &'a [String],
    pub rows: &'a [NormalizedRow],
    pub table_data: &'a [RawRow],
}

/// Receives the committed rows of one upload.
pub trait SaveHandler {
    fn save(&mut self, payload: &CommitPayload<'_>) -> Result<()>;
}

/// Writes the commit payload as pretty-printed JSON.
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SaveHandler for JsonSink<W> {
    fn save(&mut self, payload: &CommitPayload<'_>) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, payload).with_context(|| {
            format!(
                "serializing {} {} rows",
                payload.rows.len(),
                payload.entity
            )
        })?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().context("flushing committed rows")?;
        Ok(())
    }
}

/// Only logs what would have been saved.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SaveHandler for LogSink {
    fn save(&mut self, payload: &CommitPayload<'_>) -> Result<()> {
        let entity = payload.entity;
        info!(
            entity,
            file = payload.file_name.unwrap_or("<unnamed>"),
            columns = payload.headers.len(),
            rows = payload.rows.len(),
            "committed rows"
        );
        for (index, row) in payload.rows.iter().enumerate() {
            tracing::debug!(entity, row = index + 1, ?row, "committed row");
        }
        Ok(())
    }
}
