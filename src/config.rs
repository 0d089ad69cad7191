// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::decode::DEFAULT_MAX_UPLOAD_BYTES;
use crate::mapping::DateConvention;
use crate::schema::SchemaSet;
use crate::session::SessionOptions;
use crate::validate::{ExtraHeaderPolicy, HeaderPolicy};

/// Names the config file when no path is passed explicitly.
pub const CONFIG_ENV: &str = "COMPSHEET_CONFIG";

/// Ingestion settings. Every key is optional in the YAML file.
///
/// ```yaml
/// date_convention: month_first
/// extra_headers: block
/// log_filter: info,compsheet=debug
/// max_upload_bytes: 10485760
/// schema_file: schemas.yaml
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    pub date_convention: DateConvention,
    pub extra_headers: ExtraHeaderPolicy,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Uploads larger than this are refused before parsing.
    pub max_upload_bytes: u64,
    /// YAML schema overrides, relative to the working directory.
    pub schema_file: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            date_convention: DateConvention::DayFirst,
            extra_headers: ExtraHeaderPolicy::Warn,
            log_filter: "info".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            schema_file: None,
        }
    }
}

impl IngestConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        let cfg = Self::from_yaml(&text).with_context(|| format!("parsing config {:?}", path))?;
        info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// `explicit` if given, else the file named by `COMPSHEET_CONFIG`, else
    /// defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => match env::var_os(CONFIG_ENV) {
                Some(path) if !path.is_empty() => Self::load(PathBuf::from(path)),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            dates: self.date_convention,
            headers: HeaderPolicy {
                extra: self.extra_headers,
            },
            max_upload_bytes: self.max_upload_bytes,
        }
    }

    pub fn schemas(&self) -> Result<SchemaSet> {
        match &self.schema_file {
            Some(path) => SchemaSet::load(path),
            None => Ok(SchemaSet::builtin()),
        }
    }
}
