use std::pin::Pin;

use thiserror::Error;

use crate::{ToolCallId, ToolName};

// No `From` conversions: errors are mapped where they occur.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing tool call id for tool: {0}")]
    ToolCallMissingId(ToolName),

    #[error("Invalid tool call arguments for {name}: {reason}")]
    ToolCallArgument { name: ToolName, reason: String },

    #[error("Tool output can not be empty: {0}")]
    EmptyToolOutput(ToolCallId),

    #[error("No tool output was submitted for: {0}")]
    MissingToolOutput(ToolCallId),

    #[error("Tool result does not answer any tool call of the conversation: {0}")]
    OrphanToolResult(ToolCallId),

    #[error("There are no tool calls waiting for output")]
    NoPendingToolCalls,

    #[error("Tool calls are waiting for manual output; submit it before sending a new message")]
    AwaitingToolOutput,

    #[error("temperature must be between 0.0 and 1.0, got {0}")]
    InvalidTemperature(f32),

    #[error("max tokens must be between {min} and {max}, got {value}")]
    InvalidMaxTokens { value: u32, min: u32, max: u32 },

    #[error("Invalid output schema: {0}")]
    InvalidOutputSchema(String),

    #[error("Unknown reasoning effort: {0}")]
    InvalidReasoningEffort(String),
}

pub type Result<A> = std::result::Result<A, Error>;
pub type BoxStream<A, E> =
    Pin<Box<dyn tokio_stream::Stream<Item = std::result::Result<A, E>> + Send>>;

pub type ResultStream<A, E> = std::result::Result<BoxStream<A, E>, E>;
