use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, ToolCallFull, ToolCallId, ToolResult};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// One logged message of a conversation.
#[derive(Clone, Debug, Deserialize, From, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Message(MessageTurn),
    ToolResult(ToolResult),
}

/// A user or assistant message. Only assistant turns carry tool calls.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MessageTurn {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallFull>,
}

impl Turn {
    pub fn user(content: impl ToString) -> Self {
        MessageTurn { role: Role::User, content: Some(content.to_string()), tool_calls: vec![] }
            .into()
    }

    pub fn assistant(content: impl ToString) -> Self {
        Self::assistant_with_calls(Some(content.to_string()), vec![])
    }

    /// Blank text is stored as `None`
    pub fn assistant_with_calls(content: Option<String>, tool_calls: Vec<ToolCallFull>) -> Self {
        MessageTurn {
            role: Role::Assistant,
            content: content.filter(|content| !content.trim().is_empty()),
            tool_calls,
        }
        .into()
    }

    pub fn role(&self) -> Role {
        match self {
            Turn::Message(message) => message.role,
            Turn::ToolResult(_) => Role::Tool,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Turn::Message(message) => message.content.as_deref(),
            Turn::ToolResult(result) => Some(result.output.as_str()),
        }
    }

    pub fn tool_calls(&self) -> &[ToolCallFull] {
        match self {
            Turn::Message(message) => &message.tool_calls,
            Turn::ToolResult(_) => &[],
        }
    }
}

/// Ordered, append-only log of turns. It is rendered to the screen and sent as
/// the context of every request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn append(&mut self, turn: impl Into<Turn>) {
        let turn = turn.into();
        if let Turn::ToolResult(result) = &turn {
            debug_assert!(
                self.has_call(&result.call_id),
                "tool result without a preceding call: {}",
                result.call_id
            );
        }
        debug!(role = %turn.role(), "Appending turn to conversation");
        self.turns.push(turn);
    }

    /// Appends the results of a batch. Either every result answers a call of
    /// an earlier assistant turn and all are appended, or none is.
    pub fn append_tool_results(&mut self, results: Vec<ToolResult>) -> Result<()> {
        if let Some(orphan) = results.iter().find(|result| !self.has_call(&result.call_id)) {
            return Err(Error::OrphanToolResult(orphan.call_id.clone()));
        }
        results.into_iter().for_each(|result| self.append(result));
        Ok(())
    }

    fn has_call(&self, call_id: &ToolCallId) -> bool {
        self.turns
            .iter()
            .flat_map(Turn::tool_calls)
            .any(|call| call.valid_call_id() == Some(call_id))
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }
}
