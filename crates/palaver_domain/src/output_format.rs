use derive_setters::Setters;
use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// JSON schema the answer of the model must conform to.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Setters)]
#[setters(into)]
pub struct OutputFormat {
    /// Identifies the schema to the upstream
    pub name: String,
    pub schema: RootSchema,
    /// Asks the upstream to enforce the schema exactly
    pub strict: bool,
}

impl OutputFormat {
    /// Schema generated from a Rust type. Subschemas are inlined since some
    /// upstreams reject `$ref`.
    pub fn of<T: JsonSchema>(name: impl ToString) -> Self {
        let settings = SchemaSettings::draft07().with(|settings| {
            settings.inline_subschemas = true;
            settings.meta_schema = None;
        });
        let mut schema = settings.into_generator().into_root_schema_for::<T>();
        schema.schema.metadata = None;

        Self { name: name.to_string(), schema, strict: true }
    }

    /// Schema supplied as JSON text. It is sent as is, without strict
    /// enforcement.
    pub fn from_json(name: impl ToString, json: &str) -> Result<Self> {
        let schema = serde_json::from_str::<RootSchema>(json)
            .map_err(|error| Error::InvalidOutputSchema(error.to_string()))?;
        Ok(Self { name: name.to_string(), schema, strict: false })
    }

    pub fn schema_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.schema)
    }
}
