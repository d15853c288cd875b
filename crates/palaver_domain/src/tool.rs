use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::{Error, NamedTool, ToolCallFull, ToolDefinition, ToolDescription, ToolOutput};

/// A tool implementation. Handlers are synchronous: they receive the decoded
/// input and return the payload that is sent back to the model.
pub trait ExecutableTool {
    type Input: DeserializeOwned;

    fn call(&self, input: Self::Input) -> anyhow::Result<String>;

    /// Output offered as the default when the output is supplied by hand
    fn suggest_output(&self, _input: Self::Input) -> Option<String> {
        None
    }

    /// Message reported to the model when the arguments can't be decoded
    fn invalid_arguments(&self, error: &Error) -> String {
        error.to_string()
    }
}

/// Object safe view of an [`ExecutableTool`] that works on raw calls.
pub trait ToolCallService: Send + Sync {
    fn call(&self, call: &ToolCallFull) -> ToolOutput;

    fn suggest_output(&self, call: &ToolCallFull) -> Option<String>;
}

struct JsonTool<T>(T);

impl<T> ToolCallService for JsonTool<T>
where
    T: ExecutableTool + Send + Sync,
{
    fn call(&self, call: &ToolCallFull) -> ToolOutput {
        let input = match call.parse_arguments::<T::Input>() {
            Ok(input) => input,
            Err(error) => {
                warn!(
                    tool = %call.name,
                    arguments = %call.arguments,
                    error = %error,
                    "Invalid tool arguments"
                );
                return ToolOutput::error(self.0.invalid_arguments(&error));
            }
        };

        match self.0.call(input) {
            Ok(output) => ToolOutput::text(output),
            Err(error) => {
                warn!(tool = %call.name, error = ?error, "Tool call failed");
                ToolOutput::error(format!("{error:#}"))
            }
        }
    }

    fn suggest_output(&self, call: &ToolCallFull) -> Option<String> {
        match call.parse_arguments::<T::Input>() {
            Ok(input) => self.0.suggest_output(input),
            Err(error) => Some(ToolOutput::error(self.0.invalid_arguments(&error)).content),
        }
    }
}

/// A registered tool: its declaration plus the handler that executes it.
pub struct Tool {
    pub executable: Box<dyn ToolCallService + 'static>,
    pub definition: ToolDefinition,
}

impl<T> From<T> for Tool
where
    T: ExecutableTool + ToolDescription + NamedTool + Send + Sync + 'static,
    T::Input: JsonSchema,
{
    fn from(tool: T) -> Self {
        let definition = ToolDefinition::from(&tool);
        let executable = Box::new(JsonTool(tool));

        Tool { executable, definition }
    }
}

#[async_trait::async_trait]
pub trait ToolService: Send + Sync {
    /// Executes the call by name. Unknown names are answered with a "not
    /// implemented" payload which is not an error.
    async fn call(&self, call: &ToolCallFull) -> ToolOutput;

    /// Declarations of every registered tool
    fn list(&self) -> Vec<ToolDefinition>;

    fn suggest_output(&self, call: &ToolCallFull) -> Option<String>;
}
