// src/decode/mod.rs
pub mod csv_reader;
pub mod raw_table;
pub mod workbook;

pub use raw_table::{DecodeWarning, DecodedTable, RawRow};

use anyhow::{Context, Result};
use std::{fs, io, path::Path};
use thiserror::Error;
use tracing::{info, warn};

/// Largest file accepted for upload unless configured otherwise (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Why a file could not be turned into a table. Fatal to that upload only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unsupported file format `{0}`; upload a .csv, .xlsx or .xls file")]
    UnsupportedFormat(String),
    #[error("file is empty or contains no valid data")]
    EmptyFile,
    #[error("file does not contain valid headers")]
    InvalidHeaders,
    #[error("could not parse file: {0}")]
    ParseFailure(String),
    #[error("file is {size} bytes; the upload limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    /// Pick the format from the file name's extension, ignoring case.
    pub fn from_name(name: &str) -> Result<Self, DecodeError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            "xls" => Ok(FileFormat::Xls),
            _ => Err(DecodeError::UnsupportedFormat(name.to_string())),
        }
    }
}

/// An uploaded file: its original name and full contents.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }

    /// Like `open`, but refuses files over `limit` bytes before reading them.
    pub fn open_within<P: AsRef<Path>>(path: P, limit: u64) -> Result<Self> {
        let path = path.as_ref();
        let size = fs::metadata(path)
            .with_context(|| format!("reading metadata of {}", path.display()))?
            .len();
        if size > limit {
            return Err(DecodeError::TooLarge { size, limit })
                .with_context(|| format!("refusing {}", path.display()));
        }
        Self::open(path).with_context(|| format!("reading {}", path.display()))
    }

    pub fn ensure_within(&self, limit: u64) -> Result<(), DecodeError> {
        let size = self.bytes.len() as u64;
        if size > limit {
            return Err(DecodeError::TooLarge { size, limit });
        }
        Ok(())
    }
}

/// Structural parse of `file`. A table with headers but no rows is not an
/// error here.
#[tracing::instrument(
    level = "info",
    skip(file),
    fields(file = %file.name, bytes = file.bytes.len())
)]
pub fn read_table(file: &UploadFile) -> Result<DecodedTable, DecodeError> {
    let table = match FileFormat::from_name(&file.name)? {
        FileFormat::Csv => csv_reader::read_csv(&file.bytes)?,
        FileFormat::Xlsx | FileFormat::Xls => workbook::read_workbook(&file.bytes)?,
    };
    for warning in &table.warnings {
        warn!(?warning, "decode warning");
    }
    Ok(table)
}

/// Decode `file` into a table holding at least one data row.
pub fn decode(file: &UploadFile) -> Result<DecodedTable, DecodeError> {
    let table = read_table(file)?;
    if table.rows.is_empty() {
        info!(file = %file.name, "no data rows");
        return Err(DecodeError::EmptyFile);
    }
    info!(
        file = %file.name,
        rows = table.rows.len(),
        columns = table.headers.len(),
        "decoded"
    );
    Ok(table)
}

/// Run `decode` on the blocking pool so the caller can await it.
pub async fn decode_async(file: UploadFile) -> Result<DecodedTable, DecodeError> {
    tokio::task::spawn_blocking(move || decode(&file))
        .await
        .unwrap_or_else(|e| {
            Err(DecodeError::ParseFailure(format!(
                "decoder task failed: {}",
                e
            )))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension_case_insensitively() {
        assert_eq!(FileFormat::from_name("a.CSV"), Ok(FileFormat::Csv));
        assert_eq!(FileFormat::from_name("rates.Xlsx"), Ok(FileFormat::Xlsx));
        assert_eq!(FileFormat::from_name("old.xls"), Ok(FileFormat::Xls));
        assert_eq!(
            FileFormat::from_name("notes.txt"),
            Err(DecodeError::UnsupportedFormat("notes.txt".into()))
        );
        assert!(FileFormat::from_name("no_extension").is_err());
    }

    #[test]
    fn header_only_csv_is_empty_file() {
        let file = UploadFile::new("schedules.csv", b"Schedule Name,Product\n".to_vec());

        let table = read_table(&file).unwrap();
        assert_eq!(table.headers.len(), 2);
        assert!(table.is_empty());

        assert_eq!(decode(&file), Err(DecodeError::EmptyFile));
    }

    #[test]
    fn blank_rows_only_is_empty_file() {
        let file = UploadFile::new("s.csv", b"a,b\n , \n,\n".to_vec());
        assert_eq!(decode(&file), Err(DecodeError::EmptyFile));
    }

    #[test]
    fn oversized_files_are_refused_before_reading() -> Result<()> {
        let file = UploadFile::new("big.csv", vec![b'a'; 11]);
        assert_eq!(file.ensure_within(11), Ok(()));
        assert_eq!(
            file.ensure_within(10),
            Err(DecodeError::TooLarge { size: 11, limit: 10 })
        );

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("big.csv");
        fs::write(&path, b"name\nQ1\n")?;
        let err = UploadFile::open_within(&path, 4).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DecodeError>(),
            Some(&DecodeError::TooLarge { size: 8, limit: 4 })
        );
        assert_eq!(UploadFile::open_within(&path, DEFAULT_MAX_UPLOAD_BYTES)?.bytes.len(), 8);
        Ok(())
    }

    #[tokio::test]
    async fn decode_async_matches_sync_decode() {
        let file = UploadFile::new("s.csv", b"name\nQ1\n".to_vec());
        let table = decode_async(file.clone()).await.unwrap();
        assert_eq!(Ok(table), decode(&file));
    }
}
