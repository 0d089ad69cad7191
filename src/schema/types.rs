// src/schema/types.rs

use serde::{Deserialize, Serialize};

/// One selectable value of a `Select` or `Radio` field.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct OptionItem {
    pub label: String,
    pub value: String,
}

impl OptionItem {
    /// Option whose label and value are the same string.
    pub fn same(s: &str) -> Self {
        Self {
            label: s.to_string(),
            value: s.to_string(),
        }
    }
}

/// Whether a `Text` field holds free text or a number.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextInput {
    #[default]
    Text,
    Number,
}

/// Form widget of a field, each carrying its own configuration.
///
/// Deserialized from a `component` tag; an unknown tag fails to load.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        multiline: bool,
        #[serde(default)]
        min_rows: Option<u32>,
        #[serde(default)]
        input: TextInput,
    },
    Select {
        options: Vec<OptionItem>,
        /// Accept values outside `options` unchanged.
        #[serde(default)]
        allow_other: bool,
    },
    Radio {
        options: Vec<OptionItem>,
    },
    Switch {
        #[serde(default)]
        default: bool,
    },
    Checkbox {
        #[serde(default)]
        default: bool,
    },
    Date {
        #[serde(default)]
        placeholder: Option<String>,
    },
}

/// Value type a field's cells are coerced to.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Enum,
    Boolean,
    Date,
}

impl FieldKind {
    pub fn text() -> Self {
        FieldKind::Text {
            multiline: false,
            min_rows: None,
            input: TextInput::Text,
        }
    }

    pub fn multiline(min_rows: u32) -> Self {
        FieldKind::Text {
            multiline: true,
            min_rows: Some(min_rows),
            input: TextInput::Text,
        }
    }

    pub fn date() -> Self {
        FieldKind::Date {
            placeholder: Some("DD/MM/YYYY".into()),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            FieldKind::Text {
                input: TextInput::Text,
                ..
            } => ValueType::String,
            FieldKind::Text {
                input: TextInput::Number,
                ..
            } => ValueType::Number,
            FieldKind::Select { .. } | FieldKind::Radio { .. } => ValueType::Enum,
            FieldKind::Switch { .. } | FieldKind::Checkbox { .. } => ValueType::Boolean,
            FieldKind::Date { .. } => ValueType::Date,
        }
    }

    pub fn options(&self) -> &[OptionItem] {
        match self {
            FieldKind::Select { options, .. } | FieldKind::Radio { options } => options,
            FieldKind::Text { .. }
            | FieldKind::Switch { .. }
            | FieldKind::Checkbox { .. }
            | FieldKind::Date { .. } => &[],
        }
    }

    /// True when a present value must be one of `options()`.
    pub fn is_restricted(&self) -> bool {
        match self {
            FieldKind::Select { allow_other, .. } => !allow_other,
            FieldKind::Radio { .. } => true,
            FieldKind::Text { .. }
            | FieldKind::Switch { .. }
            | FieldKind::Checkbox { .. }
            | FieldKind::Date { .. } => false,
        }
    }
}

/// How a field takes part in bulk upload.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BulkPolicy {
    /// Read from the file through the alias set.
    #[default]
    Mapped,
    /// Never read from the file; every row gets `value`.
    Fixed { value: String },
}

/// A single expected logical field of an entity.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    /// Extra header spellings; the name and label are always accepted too.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub bulk: BulkPolicy,
}

impl FieldDescriptor {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            required: false,
            aliases: Vec::new(),
            kind,
            bulk: BulkPolicy::Mapped,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn fixed(mut self, value: &str) -> Self {
        self.bulk = BulkPolicy::Fixed {
            value: value.to_string(),
        };
        self
    }

    pub fn value_type(&self) -> ValueType {
        self.kind.value_type()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.bulk, BulkPolicy::Mapped)
    }

    /// Every accepted header spelling: name, label, then explicit aliases.
    pub fn alias_set(&self) -> impl Iterator<Item = &str> {
        [self.name.as_str(), self.label.as_str()]
            .into_iter()
            .chain(self.aliases.iter().map(String::as_str))
    }
}
