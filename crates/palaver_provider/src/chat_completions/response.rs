use std::str::FromStr;

use palaver_domain::{
    ChatCompletionMessage, Content, FinishReason, ToolCallFull, ToolCallId, ToolCallPart,
    ToolName, Usage,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::tool_choice::FunctionType;
use crate::error::{Error, ErrorResponse};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum Response {
    Failure {
        error: ErrorResponse,
    },
    Success {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        choices: Vec<Choice>,
        #[serde(default)]
        usage: Option<ResponseUsage>,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResponseUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum Choice {
    NonStreaming {
        finish_reason: Option<String>,
        message: ResponseMessage,
    },
    Streaming {
        finish_reason: Option<String>,
        delta: ResponseMessage,
    },
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ResponseMessage {
    pub content: Option<String>,
    #[serde(default, alias = "reasoning_content")]
    pub reasoning: Option<String>,
    pub role: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ToolCall {
    #[serde(default, deserialize_with = "deserialize_index")]
    pub index: Option<u64>,
    #[serde(default)]
    pub id: Option<ToolCallId>,
    #[serde(default)]
    pub r#type: Option<FunctionType>,
    #[serde(default)]
    pub function: FunctionCall,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct FunctionCall {
    // Only the first event typically has the name of the function call
    #[serde(default)]
    pub name: Option<ToolName>,
    #[serde(default, deserialize_with = "palaver_domain::deserialize_arguments")]
    pub arguments: String,
}

/// Accepts an integer or a string of digits. Anything else is treated as
/// absent so the fragment falls back to its id.
fn deserialize_index<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(number)) => number.as_u64(),
        Some(serde_json::Value::String(text))
            if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) =>
        {
            text.parse().ok()
        }
        _ => None,
    })
}

impl From<ResponseUsage> for Usage {
    fn from(usage: ResponseUsage) -> Self {
        Usage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

fn finish_reason(value: &Option<String>) -> Option<FinishReason> {
    value.as_deref().and_then(|s| FinishReason::from_str(s).ok())
}

impl TryFrom<Response> for ChatCompletionMessage {
    type Error = anyhow::Error;

    fn try_from(res: Response) -> Result<Self, Self::Error> {
        match res {
            Response::Success { choices, usage, .. } => {
                // The usage frame that closes a stream carries no choices
                let mut response = match choices.into_iter().next() {
                    Some(Choice::NonStreaming { message, finish_reason: reason }) => {
                        let mut resp =
                            ChatCompletionMessage::assistant(Content::full(
                                message.content.unwrap_or_default(),
                            ))
                            .finish_reason_opt(finish_reason(&reason));
                        if let Some(reasoning) = message.reasoning.filter(|r| !r.is_empty()) {
                            resp = resp.reasoning(reasoning);
                        }
                        for tool_call in message.tool_calls.unwrap_or_default() {
                            let name = tool_call.function.name.unwrap_or_else(|| {
                                warn!(call_id = ?tool_call.id, "Tool call without a name");
                                ToolName::new("")
                            });
                            let mut call = ToolCallFull::new(name)
                                .arguments(tool_call.function.arguments);
                            call.call_id = tool_call.id;
                            resp = resp.add_tool_call(call);
                        }
                        resp
                    }
                    Some(Choice::Streaming { delta, finish_reason: reason }) => {
                        let mut resp = ChatCompletionMessage::default()
                            .finish_reason_opt(finish_reason(&reason));
                        if let Some(content) = delta.content {
                            resp = resp.content_part(content);
                        }
                        if let Some(reasoning) = delta.reasoning.filter(|r| !r.is_empty()) {
                            resp = resp.reasoning(reasoning);
                        }
                        for tool_call in delta.tool_calls.unwrap_or_default() {
                            resp = resp.add_tool_call(ToolCallPart {
                                index: tool_call.index,
                                call_id: tool_call.id,
                                name: tool_call.function.name,
                                arguments_part: tool_call.function.arguments,
                            });
                        }
                        resp
                    }
                    None => ChatCompletionMessage::default(),
                };

                if let Some(usage) = usage {
                    response.usage = Some(usage.into());
                }
                Ok(response)
            }
            Response::Failure { error } => Err(Error::Response(error).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use palaver_domain::ToolCall as DomainToolCall;
    use pretty_assertions::assert_eq;

    use super::*;

    fn decode(event: &str) -> anyhow::Result<ChatCompletionMessage> {
        serde_json::from_str::<Response>(event)
            .with_context(|| format!("Failed to parse response: {event}"))
            .and_then(ChatCompletionMessage::try_from)
    }

    #[test]
    fn test_open_ai_response_event() {
        let event = "{\"id\":\"chatcmpl-B2YVxGR9TaLBrEcFMVCv2B4IcNe4g\",\"object\":\"chat.completion.chunk\",\"created\":1739949029,\"model\":\"gpt-4o-mini-2024-07-18\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":null,\"tool_calls\":[{\"index\":0,\"id\":\"call_fmuXMsHhKD5eM2k0CvgNed53\",\"type\":\"function\",\"function\":{\"name\":\"web_search\",\"arguments\":\"\"}}],\"refusal\":null},\"logprobs\":null,\"finish_reason\":null}]}";

        let actual = decode(event).unwrap();

        let expected = vec![DomainToolCall::Part(ToolCallPart {
            index: Some(0),
            call_id: Some(ToolCallId::new("call_fmuXMsHhKD5eM2k0CvgNed53")),
            name: Some(ToolName::new("web_search")),
            arguments_part: "".to_string(),
        })];
        assert_eq!(actual.tool_calls, expected);
        assert_eq!(actual.content, None);
    }

    #[test]
    fn test_index_as_digit_string() {
        let event = r#"{"choices":[{"delta":{"tool_calls":[{"index":"3","function":{"arguments":"{\"q"}}]}}]}"#;
        let actual = decode(event).unwrap();
        let part = actual.tool_calls[0].as_partial().cloned().unwrap();
        assert_eq!(part.index, Some(3));
        assert_eq!(part.arguments_part, "{\"q");

        let event = r#"{"choices":[{"delta":{"tool_calls":[{"index":"first","id":"call_1"}]}}]}"#;
        let actual = decode(event).unwrap();
        let part = actual.tool_calls[0].as_partial().cloned().unwrap();
        assert_eq!(part.index, None);
        assert_eq!(part.call_id, Some(ToolCallId::new("call_1")));
    }

    #[test]
    fn test_text_delta_and_reasoning() {
        let event = r#"{"choices":[{"delta":{"content":"Olá","reasoning_content":"thinking"},"finish_reason":"stop"}]}"#;
        let actual = decode(event).unwrap();
        assert_eq!(actual.content, Some(Content::part("Olá")));
        assert_eq!(actual.reasoning.as_deref(), Some("thinking"));
        assert_eq!(actual.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_usage_frame_without_choices() {
        let event = r#"{"id":"chatcmpl-1","choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        let actual = decode(event).unwrap();
        let expected = ChatCompletionMessage::default().usage(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        });
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_non_streaming_message() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Oi","tool_calls":[{"id":"call_1","type":"function","function":{"name":"web_search","arguments":"{\"query\":\"praias\"}"}}]},"finish_reason":"tool_calls"}]}"#;

        let actual = decode(body).unwrap();

        let expected = ChatCompletionMessage::assistant(Content::full("Oi"))
            .finish_reason(FinishReason::ToolCalls)
            .add_tool_call(
                ToolCallFull::new(ToolName::new("web_search"))
                    .call_id(ToolCallId::new("call_1"))
                    .arguments(r#"{"query":"praias"}"#),
            );
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_error_deserialization() {
        let event = r#"{"error":{"message":"This endpoint's maximum context length is 16384 tokens","code":400}}"#;
        let actual = decode(event);
        assert!(actual.is_err());
    }
}
