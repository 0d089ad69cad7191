use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};
use tracing::{debug, info};

use super::{Entity, FieldDescriptor, Schema};

/// Active schema per entity: the built-ins, optionally overridden from YAML.
///
/// The YAML file maps an entity key to its ordered field list:
///
/// ```yaml
/// schedules:
///   - name: name
///     label: Schedule Name
///     required: true
///     component: text
/// ```
#[derive(Debug, Clone)]
pub struct SchemaSet {
    overrides: HashMap<Entity, Schema>,
}

impl SchemaSet {
    pub fn builtin() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    /// Load overrides from `path`; entities absent from the file keep their
    /// built-in schema.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading schema file {:?}", path))?;
        let set = Self::from_yaml(&text).with_context(|| format!("parsing {:?}", path))?;
        info!(path = %path.display(), entities = set.overrides.len(), "loaded schema overrides");
        Ok(set)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let raw: HashMap<Entity, Vec<FieldDescriptor>> = serde_yaml::from_str(text)?;

        let mut overrides = HashMap::with_capacity(raw.len());
        for (entity, fields) in raw {
            let schema = Schema::new(entity.as_str(), fields);
            schema
                .check()
                .with_context(|| format!("schema for `{}` is invalid", entity))?;
            debug!(entity = %entity, fields = schema.fields.len(), "schema override");
            overrides.insert(entity, schema);
        }
        Ok(Self { overrides })
    }

    pub fn get(&self, entity: Entity) -> &Schema {
        self.overrides
            .get(&entity)
            .unwrap_or_else(|| entity.builtin_schema())
    }
}

impl Default for SchemaSet {
    fn default() -> Self {
        Self::builtin()
    }
}
