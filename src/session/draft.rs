// src/session/draft.rs

use chrono::NaiveDate;
use serde::Serialize;

use crate::mapping::{FieldValue, NormalizedRow};
use crate::schema::{FieldKind, Schema};

/// Value held by one form control while a row is being edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FormValue {
    Text(String),
    Date(Option<NaiveDate>),
    Choice(String),
    Flag(bool),
    /// Cell text that did not parse as the field's type, shown as typed.
    Unparsed(String),
}

impl FormValue {
    fn from_value(kind: &FieldKind, value: &FieldValue) -> Self {
        match kind {
            FieldKind::Text { .. } => FormValue::Text(value.to_cell()),
            FieldKind::Select { .. } | FieldKind::Radio { .. } => {
                FormValue::Choice(value.to_cell().trim().to_string())
            }
            FieldKind::Switch { default } | FieldKind::Checkbox { default } => match value {
                FieldValue::Boolean(b) => FormValue::Flag(*b),
                FieldValue::Invalid { raw } => FormValue::Unparsed(raw.clone()),
                _ => FormValue::Flag(*default),
            },
            FieldKind::Date { .. } => match value {
                FieldValue::Invalid { raw } => FormValue::Unparsed(raw.clone()),
                other => FormValue::Date(other.as_date()),
            },
        }
    }

    /// Cell text handed back through the mapper on save.
    pub fn to_raw(&self) -> String {
        match self {
            FormValue::Text(s) | FormValue::Choice(s) | FormValue::Unparsed(s) => s.clone(),
            FormValue::Date(Some(d)) => d.format("%Y-%m-%d").to_string(),
            FormValue::Date(None) => String::new(),
            FormValue::Flag(b) => b.to_string(),
        }
    }
}

/// Editable copy of one row's file-backed fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDraft {
    row: usize,
    values: Vec<(String, FormValue)>,
    #[serde(skip)]
    loaded: Vec<FormValue>,
}

impl RowDraft {
    pub(crate) fn from_row(schema: &Schema, row: usize, values: &NormalizedRow) -> Self {
        let values = schema
            .mapped_fields()
            .map(|field| {
                let current = values.get(&field.name).unwrap_or(&FieldValue::Absent);
                (field.name.clone(), FormValue::from_value(&field.kind, current))
            })
            .collect::<Vec<_>>();
        let loaded = values.iter().map(|(_, v)| v.clone()).collect();
        Self {
            row,
            values,
            loaded,
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn get(&self, field: &str) -> Option<&FormValue> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    /// Replace a control's value. Returns `false` for fields not on the form.
    pub fn set(&mut self, field: &str, value: FormValue) -> bool {
        match self.values.iter_mut().find(|(name, _)| name == field) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Controls whose value differs from what the row held when opened.
    pub fn changes(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.values
            .iter()
            .zip(&self.loaded)
            .filter(|((_, now), before)| now != *before)
            .map(|((k, v), _)| (k.as_str(), v))
    }
}
