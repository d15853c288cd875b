use std::str::FromStr;

use palaver_domain::{
    ChatCompletionMessage, CompletedResponse, FinishReason, ToolCallFull, ToolCallId, ToolName,
    Usage,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, ErrorResponse};

/// Typed server sent event of the responses API. Only the events that carry
/// text, finished items or the final response are decoded.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        #[serde(default)]
        delta: String,
    },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone { item: OutputItem },
    #[serde(rename = "response.completed")]
    Completed { response: ResponseObject },
    #[serde(rename = "response.incomplete")]
    Incomplete { response: ResponseObject },
    #[serde(rename = "response.failed")]
    Failed { response: ResponseObject },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        code: Option<serde_json::Value>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    FunctionCall {
        #[serde(default)]
        id: Option<ToolCallId>,
        #[serde(default)]
        call_id: Option<ToolCallId>,
        #[serde(default)]
        name: Option<ToolName>,
        #[serde(default, deserialize_with = "palaver_domain::deserialize_arguments")]
        arguments: String,
    },
    Reasoning {
        #[serde(default)]
        summary: Vec<OutputContent>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContent {
    OutputText { text: String },
    SummaryText { text: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ResponseObject {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub usage: Option<ResponseUsage>,
    #[serde(default)]
    pub error: Option<ErrorResponse>,
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct IncompleteDetails {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResponseUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl From<ResponseUsage> for Usage {
    fn from(usage: ResponseUsage) -> Self {
        Usage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

fn texts(content: &[OutputContent]) -> impl Iterator<Item = &str> {
    content.iter().filter_map(|part| match part {
        OutputContent::OutputText { text } | OutputContent::SummaryText { text } => {
            Some(text.as_str())
        }
        OutputContent::Unknown => None,
    })
}

impl OutputItem {
    /// The call id falls back to the item id
    fn into_tool_call(self) -> Option<ToolCallFull> {
        match self {
            OutputItem::FunctionCall { id, call_id, name, arguments } => {
                let mut call = ToolCallFull::new(name.unwrap_or_else(|| ToolName::new("")))
                    .arguments(arguments);
                call.call_id = call_id.filter(|id| !id.is_blank()).or(id);
                Some(call)
            }
            _ => None,
        }
    }
}

impl From<ResponseObject> for ChatCompletionMessage {
    fn from(response: ResponseObject) -> Self {
        let mut message = ChatCompletionMessage::default();
        if let Some(usage) = response.usage {
            message.usage = Some(usage.into());
        }
        message.finish_reason = response
            .incomplete_details
            .and_then(|details| details.reason)
            .and_then(|reason| FinishReason::from_str(&reason).ok());

        // An empty final output keeps what the stream accumulated
        if response.output.is_empty() {
            return message;
        }

        let mut content: Option<String> = None;
        let mut tool_calls = vec![];
        for item in response.output {
            match item {
                OutputItem::Message { content: parts } => {
                    content.get_or_insert_with(String::new).extend(texts(&parts));
                }
                item @ OutputItem::FunctionCall { .. } => tool_calls.extend(item.into_tool_call()),
                OutputItem::Reasoning { .. } | OutputItem::Unknown => {}
            }
        }

        message.completed(CompletedResponse { content, tool_calls })
    }
}

impl Event {
    /// Maps the event to a completion message. Events that carry nothing
    /// usable map to `None`; a failed response is an error.
    pub fn into_message(self) -> anyhow::Result<Option<ChatCompletionMessage>> {
        Ok(match self {
            Event::OutputTextDelta { delta } => {
                Some(ChatCompletionMessage::default().content_part(delta))
            }
            Event::OutputItemDone { item } => match item {
                item @ OutputItem::FunctionCall { .. } => item
                    .into_tool_call()
                    .map(|call| ChatCompletionMessage::default().add_tool_call(call)),
                OutputItem::Reasoning { summary } => {
                    let summary = texts(&summary).collect::<Vec<_>>().join("\n");
                    (!summary.is_empty())
                        .then(|| ChatCompletionMessage::default().reasoning(summary))
                }
                // Text already arrived as deltas
                OutputItem::Message { .. } | OutputItem::Unknown => None,
            },
            Event::Completed { response } | Event::Incomplete { response } => {
                Some(response.into())
            }
            Event::Failed { response } => {
                let error = response.error.unwrap_or_default();
                return Err(Error::Response(error).into());
            }
            Event::Error { message, code } => {
                let mut error = ErrorResponse::default();
                error.message = message;
                error.code = code.and_then(|code| serde_json::from_value(code).ok());
                return Err(Error::Response(error).into());
            }
            Event::Unknown => {
                debug!("Ignoring event");
                None
            }
        })
    }
}
