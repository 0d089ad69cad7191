//! Per-row, per-field validation and the dataset validity flag.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mapping::{FieldValue, NormalizedRow};
use crate::reconcile::HeaderMismatch;
use crate::schema::{FieldDescriptor, Schema, ValueType};

/// Whether unrecognized headers stop a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExtraHeaderPolicy {
    /// Extra headers are reported but never block.
    #[default]
    Warn,
    /// Any extra header blocks the commit.
    Block,
}

/// How the header check feeds into dataset validity. Missing required
/// headers always block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeaderPolicy {
    #[serde(default)]
    pub extra: ExtraHeaderPolicy,
}

impl HeaderPolicy {
    pub fn headers_ok(&self, mismatch: &HeaderMismatch) -> bool {
        mismatch.missing.is_empty()
            && (self.extra == ExtraHeaderPolicy::Warn || mismatch.extra.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// 0-based position in the current row sequence.
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    /// Row number as shown to users.
    pub fn display_row(&self) -> usize {
        self.row + 1
    }
}

/// Result of one full validation pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Validation {
    pub errors: Vec<ValidationError>,
    pub headers_ok: bool,
    pub is_valid: bool,
}

impl Validation {
    /// First error recorded for a cell.
    pub fn error_for(&self, row: usize, field: &str) -> Option<&ValidationError> {
        self.errors
            .iter()
            .find(|e| e.row == row && e.field == field)
    }

    pub fn errors_for_row(&self, row: usize) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.row == row)
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Distinct rows holding at least one error, ascending.
    pub fn invalid_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self.errors.iter().map(|e| e.row).collect();
        rows.dedup();
        rows
    }
}

fn type_message(field: &FieldDescriptor, value: &FieldValue) -> Option<&'static str> {
    if value.is_absent() {
        return None;
    }
    match (field.value_type(), value) {
        (ValueType::Date, FieldValue::Date(_))
        | (ValueType::Number, FieldValue::Number(_))
        | (ValueType::Boolean, FieldValue::Boolean(_))
        | (ValueType::String, FieldValue::Text(_))
        | (ValueType::Enum, _) => None,
        (ValueType::Date, _) => Some("must be a valid date"),
        (ValueType::Number, _) => Some("must be a number"),
        (ValueType::Boolean, _) => Some("must be true or false"),
        (ValueType::String, _) => Some("must be a string"),
    }
}

fn outside_options(field: &FieldDescriptor, value: &FieldValue) -> bool {
    if !field.kind.is_restricted() {
        return false;
    }
    let raw = match value {
        FieldValue::Text(s) => s.as_str(),
        FieldValue::Invalid { raw } => raw.as_str(),
        _ => return false,
    };
    !field.kind.options().iter().any(|o| o.value == raw)
}

fn check_row(
    schema: &Schema,
    row_index: usize,
    row: &NormalizedRow,
    out: &mut Vec<ValidationError>,
) {
    let mut push = |field: &FieldDescriptor, message: String| {
        out.push(ValidationError {
            row: row_index,
            field: field.name.clone(),
            message,
        })
    };

    for field in &schema.fields {
        let value = row.get(&field.name).unwrap_or(&FieldValue::Absent);

        if field.required && value.is_blank() {
            push(field, format!("{} is required", field.label));
            continue;
        }
        if let Some(message) = type_message(field, value) {
            push(field, format!("{} {}", field.label, message));
        }
        if outside_options(field, value) {
            let allowed: Vec<&str> = field
                .kind
                .options()
                .iter()
                .map(|o| o.value.as_str())
                .collect();
            push(
                field,
                format!("{} must be one of: {}", field.label, allowed.join(", ")),
            );
        }
    }
}

/// Re-scan every row against the schema.
///
/// Always a full pass: the error list depends only on the arguments, so
/// calling it twice on unchanged rows gives identical output.
pub fn validate(
    rows: &[NormalizedRow],
    schema: &Schema,
    mismatch: &HeaderMismatch,
    policy: HeaderPolicy,
) -> Validation {
    let mut errors = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        check_row(schema, index, row, &mut errors);
    }

    let headers_ok = policy.headers_ok(mismatch);
    let is_valid = errors.is_empty() && headers_ok;
    debug!(rows = rows.len(), errors = errors.len(), headers_ok, is_valid, "validated");

    Validation {
        errors,
        headers_ok,
        is_valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, UploadFile};
    use crate::mapping::{map_rows, DateConvention};
    use crate::reconcile::reconcile;
    use crate::schema::{Entity, FieldKind, TextInput};
    use chrono::NaiveDate;

    fn schedule_row(pairs: &[(&str, FieldValue)]) -> NormalizedRow {
        let schema = Entity::Schedules.builtin_schema();
        let mut row = NormalizedRow::default();
        for field in &schema.fields {
            row.set(&field.name, FieldValue::Absent);
        }
        row.set("status", FieldValue::Text("Active".into()));
        for (name, value) in pairs {
            row.set(name, value.clone());
        }
        row
    }

    fn complete_row() -> NormalizedRow {
        schedule_row(&[
            ("name", FieldValue::Text("Q1 Launch".into())),
            ("product", FieldValue::Text("Product Alpha".into())),
            ("scheduleType", FieldValue::Text("PCE".into())),
            (
                "startDate",
                FieldValue::Date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
            ),
        ])
    }

    #[test]
    fn complete_row_is_valid() {
        let schema = Entity::Schedules.builtin_schema();
        let v = validate(
            &[complete_row()],
            schema,
            &HeaderMismatch::default(),
            HeaderPolicy::default(),
        );
        assert!(v.errors.is_empty(), "{:?}", v.errors);
        assert!(v.is_valid);
    }

    #[test]
    fn required_fields_always_report() {
        let schema = Entity::Schedules.builtin_schema();
        let mut row = complete_row();
        row.set("name", FieldValue::Text("   ".into()));
        row.set("startDate", FieldValue::Absent);

        let v = validate(&[row], schema, &HeaderMismatch::default(), HeaderPolicy::default());
        assert_eq!(v.error_for(0, "name").unwrap().message, "Schedule Name is required");
        assert_eq!(v.error_for(0, "startDate").unwrap().message, "Start Date is required");
        assert_eq!(v.error_count(), 2);
        assert!(!v.is_valid);
    }

    #[test]
    fn type_and_enum_rules() {
        let schema = Entity::Schedules.builtin_schema();
        let mut row = complete_row();
        row.set("endDate", FieldValue::Invalid { raw: "soon".into() });
        row.set("scheduleType", FieldValue::Invalid { raw: "Monthly".into() });

        let v = validate(&[row], schema, &HeaderMismatch::default(), HeaderPolicy::default());
        assert_eq!(
            v.error_for(0, "endDate").unwrap().message,
            "End Date must be a valid date"
        );
        assert_eq!(
            v.error_for(0, "scheduleType").unwrap().message,
            "Schedule Type must be one of: PCE, Vested"
        );
        assert_eq!(v.invalid_rows(), vec![0]);
    }

    #[test]
    fn number_and_flag_fields_report_their_type() {
        let schema = Schema {
            entity: "rates".into(),
            fields: vec![
                FieldDescriptor::new(
                    "rate",
                    "Rate",
                    FieldKind::Text {
                        multiline: false,
                        min_rows: None,
                        input: TextInput::Number,
                    },
                ),
                FieldDescriptor::new("active", "Active", FieldKind::Switch { default: false }),
                FieldDescriptor::new("audited", "Audited", FieldKind::Checkbox { default: false }),
            ],
        };
        let mut bad = NormalizedRow::default();
        bad.set("rate", FieldValue::Invalid { raw: "ten".into() });
        bad.set("active", FieldValue::Invalid { raw: "maybe".into() });
        bad.set("audited", FieldValue::Text("yes please".into()));
        let mut good = NormalizedRow::default();
        good.set("rate", FieldValue::Number(10.5));
        good.set("active", FieldValue::Boolean(true));
        good.set("audited", FieldValue::Absent);

        let v = validate(
            &[bad, good],
            &schema,
            &HeaderMismatch::default(),
            HeaderPolicy::default(),
        );
        assert_eq!(v.error_for(0, "rate").unwrap().message, "Rate must be a number");
        assert_eq!(
            v.error_for(0, "active").unwrap().message,
            "Active must be true or false"
        );
        assert_eq!(
            v.error_for(0, "audited").unwrap().message,
            "Audited must be true or false"
        );
        assert!(v.errors_for_row(1).next().is_none());
        assert_eq!(v.invalid_rows(), vec![0]);
    }

    #[test]
    fn revalidation_is_idempotent() {
        let schema = Entity::Schedules.builtin_schema();
        let rows = vec![complete_row(), schedule_row(&[]), complete_row()];
        let mismatch = HeaderMismatch {
            extra: vec!["Region".into()],
            ..Default::default()
        };
        let first = validate(&rows, schema, &mismatch, HeaderPolicy::default());
        let second = validate(&rows, schema, &mismatch, HeaderPolicy::default());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.invalid_rows(), vec![1]);
        assert_eq!(first.errors_for_row(1).count(), 4);
    }

    #[test]
    fn extra_header_policy() {
        let schema = Entity::Schedules.builtin_schema();
        let mismatch = HeaderMismatch {
            extra: vec!["Region".into()],
            ..Default::default()
        };
        let warn = validate(&[complete_row()], schema, &mismatch, HeaderPolicy::default());
        assert!(warn.is_valid);

        let block = HeaderPolicy {
            extra: ExtraHeaderPolicy::Block,
        };
        let blocked = validate(&[complete_row()], schema, &mismatch, block);
        assert!(!blocked.headers_ok);
        assert!(!blocked.is_valid);
    }

    #[test]
    fn scheduled_launch_upload_is_invalid() {
        let csv = "Schedule Name,Product,Status,Start Date\n\
                   \"Q1 Launch\",\"Product Alpha\",\"Active\",\"01/03/2025\"\n";
        let file = UploadFile::new("launch.csv", csv.as_bytes().to_vec());
        let schema = Entity::Schedules.builtin_schema();

        let table = decode(&file).unwrap();
        let mismatch = reconcile(&table.headers, schema);
        let rows = map_rows(&table, schema, DateConvention::DayFirst);
        let v = validate(&rows, schema, &mismatch, HeaderPolicy::default());

        assert_eq!(mismatch.missing, vec!["scheduleType"]);
        assert_eq!(rows[0].get("startDate").unwrap().to_string(), "2025-03-01");
        assert!(v.error_for(0, "startDate").is_none());
        let err = v.error_for(0, "scheduleType").unwrap();
        assert_eq!(err.message, "Schedule Type is required");
        assert_eq!(err.display_row(), 1);
        assert!(!v.headers_ok);
        assert!(!v.is_valid);
    }
}
