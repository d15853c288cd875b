use serde::Serialize;

use crate::{ToolCallFull, ToolCallId, ToolResult, Usage};

/// Events that are emitted by the orchestrator for external consumption.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ChatResponse {
    Text {
        text: String,
        is_complete: bool,
    },
    Reasoning(String),
    ToolCallStart(ToolCallFull),
    ToolCallEnd(ToolResult),
    /// Manual mode: a human has to supply the output of these calls
    ToolOutputRequired(Vec<ManualToolCall>),
    /// Something the user should know that did not stop the turn
    Notice(String),
    /// The turn failed
    Error(String),
    Usage(Usage),
}

/// A pending call presented to a human, with the output offered by default.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ManualToolCall {
    pub call_id: ToolCallId,
    pub call: ToolCallFull,
    pub default_output: Option<String>,
}
