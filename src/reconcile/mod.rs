//! Header reconciliation: which schema fields the uploaded headers cover.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::schema::{FieldDescriptor, Schema};

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\s-]").expect("valid regex"));

/// Lowercase, trim and drop every `_`, `-` and whitespace character.
pub fn normalize_header(raw: &str) -> String {
    SEPARATORS
        .replace_all(&raw.trim().to_lowercase(), "")
        .into_owned()
}

/// True when `header` is one of the field's accepted spellings.
pub fn header_matches(field: &FieldDescriptor, header: &str) -> bool {
    let header = normalize_header(header);
    !header.is_empty() && field.alias_set().any(|alias| normalize_header(alias) == header)
}

/// Column index of the first header matching `field`.
pub fn resolve_column(field: &FieldDescriptor, headers: &[String]) -> Option<usize> {
    headers.iter().position(|h| header_matches(field, h))
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HeaderMismatch {
    /// Required fields with no matching header.
    pub missing: Vec<String>,
    /// Headers matching no field at all.
    pub extra: Vec<String>,
    /// Optional fields with no matching header. Informational only.
    pub absent_optional: Vec<String>,
}

impl HeaderMismatch {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Compare file headers against the schema's alias sets.
///
/// Fixed fields are never missing, but their spellings still count as known
/// headers. Blank headers are ignored.
pub fn reconcile(headers: &[String], schema: &Schema) -> HeaderMismatch {
    let mut mismatch = HeaderMismatch::default();

    for field in schema.mapped_fields() {
        if resolve_column(field, headers).is_some() {
            continue;
        }
        if field.required {
            mismatch.missing.push(field.name.clone());
        } else {
            mismatch.absent_optional.push(field.name.clone());
        }
    }

    for header in headers {
        if header.trim().is_empty() {
            continue;
        }
        if !schema.fields.iter().any(|f| header_matches(f, header))
            && !mismatch.extra.contains(header)
        {
            mismatch.extra.push(header.clone());
        }
    }

    debug!(
        missing = ?mismatch.missing,
        extra = ?mismatch.extra,
        absent_optional = ?mismatch.absent_optional,
        "reconciled headers"
    );
    mismatch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Entity;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalization_ignores_case_and_separators() {
        assert_eq!(normalize_header("  Start_Date "), "startdate");
        assert_eq!(normalize_header("start-date"), "startdate");
        assert_eq!(normalize_header("START\tDATE"), "startdate");
        assert_eq!(normalize_header("startDate"), "startdate");
    }

    #[test]
    fn reports_missing_required_and_extra_headers() {
        let schema = Entity::Schedules.builtin_schema();
        let mismatch = reconcile(
            &headers(&["Schedule Name", "Product", "Status", "Start Date", "Region"]),
            schema,
        );

        assert_eq!(mismatch.missing, vec!["scheduleType"]);
        assert_eq!(mismatch.extra, vec!["Region"]);
        assert_eq!(mismatch.absent_optional, vec!["description", "endDate"]);
        assert!(!mismatch.is_empty());
    }

    #[test]
    fn every_alias_spelling_is_accepted() {
        let schema = Entity::Schedules.builtin_schema();
        let start = schema.field("startDate").unwrap();
        for spelling in [
            "start date",
            "StartDate",
            "START_DATE",
            "start-date",
            "Begin Date",
            "fromdate",
        ] {
            assert!(header_matches(start, spelling), "{} should match", spelling);
        }
        assert!(!header_matches(start, "end date"));
        assert!(!header_matches(start, ""));
    }

    #[test]
    fn fixed_field_header_is_not_extra() {
        let schema = Entity::Schedules.builtin_schema();
        let mismatch = reconcile(
            &headers(&["name", "product", "type", "start date", "schedule status"]),
            schema,
        );
        assert!(mismatch.is_empty(), "{:?}", mismatch);
    }

    #[test]
    fn resolves_first_matching_column() {
        let schema = Entity::Schedules.builtin_schema();
        let name = schema.field("name").unwrap();
        let cols = headers(&["Product", "schedule_name", "Name"]);
        assert_eq!(resolve_column(name, &cols), Some(1));
    }
}
