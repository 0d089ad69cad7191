// src/mapping/mod.rs
pub mod date_parser;

pub use date_parser::{parse_date, DateConvention};

use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use tracing::trace;

use crate::decode::{DecodedTable, RawRow};
use crate::reconcile::{normalize_header, resolve_column};
use crate::schema::{BulkPolicy, FieldDescriptor, FieldKind, OptionItem, Schema, TextInput};

/// Normalized value of one schema field in one row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// No matching header, or a blank cell.
    Absent,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    /// A present cell whose coercion failed; kept for the validator.
    Invalid { raw: String },
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Absent, or text holding only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Absent => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Text written back into the raw cell after an edit.
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Absent => f.write_str("-"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Invalid { raw } => f.write_str(raw),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Absent => serializer.serialize_none(),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            FieldValue::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            FieldValue::Invalid { raw } => serializer.serialize_str(raw),
        }
    }
}

/// One row keyed by canonical field name, in schema order. Every schema
/// field is present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedRow {
    values: Vec<(String, FieldValue)>,
}

impl NormalizedRow {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    /// Replace the value of `field`, appending it when unknown.
    pub fn set(&mut self, field: &str, value: FieldValue) {
        match self.values.iter_mut().find(|(name, _)| name == field) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((field.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for NormalizedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn match_option<'a>(options: &'a [OptionItem], value: &str) -> Option<&'a OptionItem> {
    let wanted = normalize_header(value);
    options
        .iter()
        .find(|o| normalize_header(&o.value) == wanted)
        .or_else(|| options.iter().find(|o| normalize_header(&o.label) == wanted))
}

fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Coerce one raw cell to `field`'s type. Blank cells are `Absent`.
pub fn coerce_cell(field: &FieldDescriptor, raw: &str, dates: DateConvention) -> FieldValue {
    let value = raw.trim();
    if value.is_empty() {
        return FieldValue::Absent;
    }
    let invalid = || FieldValue::Invalid {
        raw: value.to_string(),
    };

    match &field.kind {
        FieldKind::Text {
            input: TextInput::Text,
            ..
        } => FieldValue::Text(value.to_string()),
        FieldKind::Text {
            input: TextInput::Number,
            ..
        } => parse_number(value).map(FieldValue::Number).unwrap_or_else(invalid),
        FieldKind::Select {
            options,
            allow_other,
        } => match match_option(options, value) {
            Some(option) => FieldValue::Text(option.value.clone()),
            None if *allow_other => FieldValue::Text(value.to_string()),
            None => invalid(),
        },
        FieldKind::Radio { options } => match_option(options, value)
            .map(|o| FieldValue::Text(o.value.clone()))
            .unwrap_or_else(invalid),
        FieldKind::Switch { .. } | FieldKind::Checkbox { .. } => {
            parse_flag(value).map(FieldValue::Boolean).unwrap_or_else(invalid)
        }
        FieldKind::Date { .. } => parse_date(value, dates)
            .map(FieldValue::Date)
            .unwrap_or_else(invalid),
    }
}

/// Map one decoded row onto the schema's canonical fields.
///
/// Each mapped field takes the cell under the first header matching its
/// alias set; fixed fields always take their fixed value.
pub fn map_row(
    raw: &RawRow,
    headers: &[String],
    schema: &Schema,
    dates: DateConvention,
) -> NormalizedRow {
    let mut row = NormalizedRow::default();
    for field in &schema.fields {
        let value = match &field.bulk {
            BulkPolicy::Fixed { value } => FieldValue::Text(value.clone()),
            BulkPolicy::Mapped => match resolve_column(field, headers) {
                Some(col) => coerce_cell(field, raw.cell(col), dates),
                None => FieldValue::Absent,
            },
        };
        row.values.push((field.name.clone(), value));
    }
    trace!(?row, "mapped row");
    row
}

/// Map every row of `table`, preserving order.
pub fn map_rows(
    table: &DecodedTable,
    schema: &Schema,
    dates: DateConvention,
) -> Vec<NormalizedRow> {
    table
        .rows
        .iter()
        .map(|raw| map_row(raw, &table.headers, schema, dates))
        .collect()
}
