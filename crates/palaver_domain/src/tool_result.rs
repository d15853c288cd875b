use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{ToolCallId, ToolName};

/// Outcome of a tool call, echoed back to the model as a tool turn that
/// carries the id of the originating call.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, Setters)]
#[setters(strip_option, into)]
pub struct ToolResult {
    pub name: ToolName,
    pub call_id: ToolCallId,
    #[setters(skip)]
    pub output: ToolOutput,
}

impl ToolResult {
    pub fn new(name: ToolName, call_id: ToolCallId) -> ToolResult {
        Self { name, call_id, output: Default::default() }
    }

    pub fn success(mut self, content: impl Into<String>) -> Self {
        self.output = ToolOutput::text(content);
        self
    }

    pub fn failure(mut self, message: impl ToString) -> Self {
        self.output = ToolOutput::error(message);
        self
    }

    pub fn output(mut self, output: ToolOutput) -> Self {
        self.output = output;
        self
    }

    pub fn is_error(&self) -> bool {
        self.output.is_error
    }
}

/// String payload produced by a tool. Structured payloads are JSON encoded.
#[derive(Default, Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        ToolOutput { content: content.into(), is_error: false }
    }

    /// Error payload the model can read: `{"error": "<message>"}`
    pub fn error(message: impl ToString) -> Self {
        ToolOutput {
            content: json!({ "error": message.to_string() }).to_string(),
            is_error: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}
