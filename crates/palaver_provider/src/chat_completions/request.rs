use derive_setters::Setters;
use palaver_domain::{
    Context, ModelId, OutputFormat, ReasoningEffort, Role, Temperature, ToolCallFull, ToolCallId,
    ToolDefinition, ToolName, Turn,
};
use serde::{Deserialize, Serialize};

use super::tool_choice::{FunctionType, ToolChoice};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<ToolName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<ToolCallId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ToolCall {
    pub id: Option<ToolCallId>,
    pub r#type: FunctionType,
    pub function: FunctionCall,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: ToolName,
    pub arguments: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FunctionDescription {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub strict: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Tool {
    pub r#type: FunctionType,
    pub function: FunctionDescription,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StreamOptions {
    pub include_usage: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Reasoning {
    pub effort: ReasoningEffort,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JsonSchema {
    pub name: String,
    pub schema: serde_json::Value,
    pub strict: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonSchema { json_schema: JsonSchema },
}

impl TryFrom<OutputFormat> for ResponseFormat {
    type Error = serde_json::Error;

    fn try_from(value: OutputFormat) -> Result<Self, Self::Error> {
        Ok(ResponseFormat::JsonSchema {
            json_schema: JsonSchema {
                schema: value.schema_value()?,
                name: value.name,
                strict: value.strict,
            },
        })
    }
}

/// Body of `POST chat/completions`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Setters)]
#[setters(strip_option)]
pub struct Request {
    pub model: ModelId,
    pub messages: Vec<Message>,
    pub temperature: Temperature,
    pub max_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl Request {
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

impl TryFrom<ToolDefinition> for Tool {
    type Error = serde_json::Error;

    fn try_from(value: ToolDefinition) -> Result<Self, Self::Error> {
        Ok(Tool {
            r#type: FunctionType,
            function: FunctionDescription {
                name: value.name.into_string(),
                description: value.description,
                parameters: serde_json::to_value(value.input_schema)?,
                strict: value.strict,
            },
        })
    }
}

impl From<ToolCallFull> for ToolCall {
    fn from(value: ToolCallFull) -> Self {
        Self {
            id: value.call_id,
            r#type: FunctionType,
            function: FunctionCall { name: value.name, arguments: value.arguments },
        }
    }
}

impl From<Turn> for Message {
    fn from(value: Turn) -> Self {
        match value {
            Turn::Message(message) => Message {
                role: message.role.into(),
                content: Some(message.content.unwrap_or_default()),
                name: None,
                tool_call_id: None,
                tool_calls: (!message.tool_calls.is_empty()).then(|| {
                    message
                        .tool_calls
                        .into_iter()
                        .map(ToolCall::from)
                        .collect()
                }),
            },
            Turn::ToolResult(result) => Message {
                role: MessageRole::Tool,
                content: Some(result.output.content),
                name: Some(result.name),
                tool_call_id: Some(result.call_id),
                tool_calls: None,
            },
        }
    }
}

impl TryFrom<Context> for Request {
    type Error = serde_json::Error;

    fn try_from(context: Context) -> Result<Self, Self::Error> {
        let system = context.instructions.map(|instructions| Message {
            role: MessageRole::System,
            content: Some(instructions),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        });

        let messages = system
            .into_iter()
            .chain(context.messages.into_iter().map(Message::from))
            .collect();

        let tools = context
            .tools
            .into_iter()
            .map(Tool::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Request {
            model: context.model,
            messages,
            temperature: context.temperature,
            max_tokens: context.max_tokens.value(),
            stream: context.stream,
            stream_options: context.stream.then_some(StreamOptions { include_usage: true }),
            tools: (!tools.is_empty()).then_some(tools),
            tool_choice: context.tool_choice.map(ToolChoice::from),
            reasoning: context.reasoning_effort.map(|effort| Reasoning { effort }),
            response_format: context
                .output_format
                .map(ResponseFormat::try_from)
                .transpose()?,
        })
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
            Role::Tool => MessageRole::Tool,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}
