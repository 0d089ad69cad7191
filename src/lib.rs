//! Bulk spreadsheet ingestion for compensation-program entities.
//!
//! A file goes through `decode` → `reconcile` + `mapping` → `validate`, and the
//! resulting rows live in a `session::UploadSession` until they are committed
//! to a `session::SaveHandler`.

pub mod config;
pub mod decode;
pub mod logging;
pub mod mapping;
pub mod reconcile;
pub mod schema;
pub mod session;
pub mod validate;

pub use decode::{decode, decode_async, read_table, DecodeError, DecodedTable, UploadFile};
pub use mapping::{map_row, map_rows, FieldValue, NormalizedRow};
pub use reconcile::{reconcile, HeaderMismatch};
pub use schema::{Entity, FieldDescriptor, FieldKind, Schema};
pub use session::{SessionState, UploadSession, Uploader};
pub use validate::{validate, HeaderPolicy, Validation, ValidationError};
