use derive_setters::Setters;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ExecutableTool, NamedTool, ToolName};

/// Declaration of a tool as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Setters)]
#[setters(into, strip_option)]
pub struct ToolDefinition {
    pub name: ToolName,
    pub description: String,
    pub input_schema: RootSchema,
    /// Asks the upstream to validate arguments against the schema
    pub strict: bool,
}

impl ToolDefinition {
    pub fn new<N: ToString>(name: N) -> Self {
        ToolDefinition {
            name: ToolName::new(name),
            description: String::new(),
            input_schema: schemars::schema_for!(()),
            strict: false,
        }
    }
}

impl<T> From<&T> for ToolDefinition
where
    T: NamedTool + ExecutableTool + ToolDescription + Send + Sync + 'static,
    T::Input: serde::de::DeserializeOwned + JsonSchema,
{
    fn from(t: &T) -> Self {
        let mut input: RootSchema = schemars::schema_for!(T::Input);
        // `$schema` and `title` are not part of function parameters
        input.meta_schema = None;
        input.schema.metadata = None;

        ToolDefinition {
            name: T::tool_name(),
            description: t.description(),
            input_schema: input,
            strict: true,
        }
    }
}

pub trait ToolDescription {
    fn description(&self) -> String;
}
