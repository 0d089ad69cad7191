pub mod builtin;
pub mod store;
pub mod types;
pub mod write;

pub use builtin::Entity;
pub use store::SchemaSet;
pub use types::{BulkPolicy, FieldDescriptor, FieldKind, OptionItem, TextInput, ValueType};
pub use write::{save_template, template_headers, write_template};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::reconcile::normalize_header;

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("schema `{0}` has no fields")]
    Empty(String),
    #[error("schema `{schema}` declares field `{field}` twice")]
    DuplicateField { schema: String, field: String },
    #[error("field `{field}` has no options")]
    NoOptions { field: String },
    #[error("header spelling `{alias}` is claimed by both `{first}` and `{second}`")]
    AmbiguousAlias {
        alias: String,
        first: String,
        second: String,
    },
}

/// Ordered field descriptors for one entity.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Schema {
    pub entity: String,
    pub fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new(entity: &str, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            entity: entity.to_string(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields read from the uploaded file, in schema order.
    pub fn mapped_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_mapped())
    }

    /// Check names are unique, option lists non-empty and that no header
    /// spelling resolves to two different fields.
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::Empty(self.entity.clone()));
        }

        let mut names: HashSet<&str> = HashSet::new();
        let mut owners: HashMap<String, &str> = HashMap::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: self.entity.clone(),
                    field: field.name.clone(),
                });
            }
            if matches!(
                field.kind,
                FieldKind::Select { .. } | FieldKind::Radio { .. }
            ) && field.kind.options().is_empty()
            {
                return Err(SchemaError::NoOptions {
                    field: field.name.clone(),
                });
            }
            for alias in field.alias_set() {
                let key = normalize_header(alias);
                match owners.get(&key) {
                    Some(owner) if *owner != field.name => {
                        return Err(SchemaError::AmbiguousAlias {
                            alias: alias.to_string(),
                            first: owner.to_string(),
                            second: field.name.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        owners.insert(key, field.name.as_str());
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_alias_shared_between_fields() {
        let schema = Schema::new(
            "widgets",
            vec![
                FieldDescriptor::new("name", "Name", FieldKind::text()).aliases(&["title"]),
                FieldDescriptor::new("label", "Label", FieldKind::text()).aliases(&["Title"]),
            ],
        );
        assert_eq!(
            schema.check(),
            Err(SchemaError::AmbiguousAlias {
                alias: "Title".into(),
                first: "name".into(),
                second: "label".into(),
            })
        );
    }

    #[test]
    fn rejects_duplicate_names_and_empty_options() {
        let dup = Schema::new(
            "widgets",
            vec![
                FieldDescriptor::new("name", "Name", FieldKind::text()),
                FieldDescriptor::new("name", "Other", FieldKind::text()),
            ],
        );
        assert!(matches!(
            dup.check(),
            Err(SchemaError::DuplicateField { .. })
        ));

        let empty = Schema::new(
            "widgets",
            vec![FieldDescriptor::new(
                "kind",
                "Kind",
                FieldKind::Radio { options: vec![] },
            )],
        );
        assert_eq!(
            empty.check(),
            Err(SchemaError::NoOptions {
                field: "kind".into()
            })
        );
    }
}
