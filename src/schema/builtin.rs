// src/schema/builtin.rs

use clap::ValueEnum;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::{FieldDescriptor, FieldKind, OptionItem};
use super::Schema;

/// Entities that accept bulk spreadsheet uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Entity {
    Schedules,
    RateTables,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Schedules => "schedules",
            Entity::RateTables => "rate-tables",
        }
    }

    /// Display name used for the template sheet and file.
    pub fn title(&self) -> &'static str {
        match self {
            Entity::Schedules => "Schedule",
            Entity::RateTables => "Rate Table",
        }
    }

    pub fn builtin_schema(&self) -> &'static Schema {
        match self {
            Entity::Schedules => &SCHEDULE_SCHEMA,
            Entity::RateTables => &RATE_TABLE_SCHEMA,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const PRODUCTS: &[&str] = &[
    "Product Alpha",
    "Product Beta",
    "Product Gamma",
    "Product Delta",
    "Product Epsilon",
];

const SCHEDULE_NAMES: &[&str] = &[
    "Q4 2024 Project Alpha Launch",
    "Annual Financial Audit Prep",
    "New User Onboarding Flow",
    "Infrastructure Upgrade Phase 2",
    "HR Policy Review Cycle",
    "Marketing Campaign Q1",
    "Security Audit Schedule",
    "System Maintenance Window",
    "Data Migration Plan",
    "Customer Portal Update",
];

const START_DATE_ALIASES: &[&str] = &[
    "start date",
    "startdate",
    "start_date",
    "start-date",
    "begin date",
    "begindate",
    "from date",
    "fromdate",
];

const END_DATE_ALIASES: &[&str] = &[
    "end date",
    "enddate",
    "end_date",
    "end-date",
    "finish date",
    "finishdate",
    "to date",
    "todate",
];

fn options(values: &[&str]) -> Vec<OptionItem> {
    values.iter().map(|v| OptionItem::same(v)).collect()
}

static SCHEDULE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "schedules",
        vec![
            FieldDescriptor::new("name", "Schedule Name", FieldKind::text())
                .required()
                .aliases(&[
                    "name",
                    "schedule name",
                    "schedule",
                    "schedule_name",
                    "schedule-name",
                ]),
            FieldDescriptor::new(
                "product",
                "Product",
                FieldKind::Select {
                    options: options(PRODUCTS),
                    allow_other: true,
                },
            )
            .required()
            .aliases(&[
                "product",
                "product name",
                "productname",
                "product_name",
                "product-name",
            ]),
            FieldDescriptor::new(
                "scheduleType",
                "Schedule Type",
                FieldKind::Select {
                    options: options(&["PCE", "Vested"]),
                    allow_other: false,
                },
            )
            .required()
            .aliases(&[
                "schedule type",
                "scheduletype",
                "schedule_type",
                "schedule-type",
                "type",
            ]),
            // bulk uploads always land as Active
            FieldDescriptor::new(
                "status",
                "Status",
                FieldKind::Select {
                    options: options(&["Active", "Inactive", "Draft"]),
                    allow_other: false,
                },
            )
            .required()
            .aliases(&[
                "status",
                "schedule status",
                "schedulestatus",
                "status_type",
                "status-type",
            ])
            .fixed("Active"),
            FieldDescriptor::new("description", "Description", FieldKind::multiline(3))
                .aliases(&["description", "desc", "details", "notes", "comment"]),
            FieldDescriptor::new("startDate", "Start Date", FieldKind::date())
                .required()
                .aliases(START_DATE_ALIASES),
            FieldDescriptor::new("endDate", "End Date", FieldKind::date())
                .aliases(END_DATE_ALIASES),
        ],
    )
});

static RATE_TABLE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "rate-tables",
        vec![
            FieldDescriptor::new("name", "Name", FieldKind::text())
                .required()
                .aliases(&[
                    "rate table",
                    "rate table name",
                    "ratetable",
                    "rate_table_name",
                    "table name",
                ]),
            FieldDescriptor::new(
                "schedule",
                "Schedule",
                FieldKind::Select {
                    options: options(SCHEDULE_NAMES),
                    allow_other: true,
                },
            )
            .required()
            .aliases(&["schedule name", "schedule_name", "schedule-name"]),
            FieldDescriptor::new("comment", "Comment", FieldKind::multiline(3))
                .aliases(&["comments", "notes", "description", "desc"]),
            FieldDescriptor::new("startDate", "Start Date", FieldKind::date())
                .required()
                .aliases(START_DATE_ALIASES),
            FieldDescriptor::new("endDate", "End Date", FieldKind::date())
                .aliases(END_DATE_ALIASES),
        ],
    )
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{BulkPolicy, ValueType};

    #[test]
    fn builtin_schemas_are_well_formed() {
        for entity in [Entity::Schedules, Entity::RateTables] {
            let schema = entity.builtin_schema();
            assert!(schema.check().is_ok(), "{} schema invalid", entity);
        }
    }

    #[test]
    fn schedule_status_is_fixed_active() {
        let schema = Entity::Schedules.builtin_schema();
        let status = schema.field("status").expect("status field");
        assert_eq!(
            status.bulk,
            BulkPolicy::Fixed {
                value: "Active".into()
            }
        );
        assert!(!schema.mapped_fields().any(|f| f.name == "status"));
    }

    #[test]
    fn date_fields_are_typed_as_dates() {
        let schema = Entity::RateTables.builtin_schema();
        for name in ["startDate", "endDate"] {
            assert_eq!(schema.field(name).unwrap().value_type(), ValueType::Date);
        }
    }
}
