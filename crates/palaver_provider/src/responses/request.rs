use palaver_domain::{
    Context, ModelId, OutputFormat, ReasoningEffort, Role, Temperature, ToolCallId,
    ToolDefinition, ToolName, Turn,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    OutputText { text: String },
}

/// Conversation log entry in the `input` array.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    Message {
        role: MessageRole,
        content: Vec<ContentPart>,
    },
    FunctionCall {
        call_id: Option<ToolCallId>,
        name: ToolName,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: ToolCallId,
        output: String,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Tool {
    pub r#type: String,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub strict: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Reasoning {
    pub effort: ReasoningEffort,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextFormat {
    JsonSchema {
        name: String,
        schema: serde_json::Value,
        strict: bool,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Text {
    pub format: TextFormat,
}

impl TryFrom<OutputFormat> for Text {
    type Error = serde_json::Error;

    fn try_from(value: OutputFormat) -> Result<Self, Self::Error> {
        Ok(Text {
            format: TextFormat::JsonSchema {
                schema: value.schema_value()?,
                name: value.name,
                strict: value.strict,
            },
        })
    }
}

/// Body of `POST responses`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Request {
    pub model: ModelId,
    pub input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub temperature: Temperature,
    pub max_output_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,
}

impl Request {
    pub fn item_count(&self) -> usize {
        self.input.len()
    }
}

impl TryFrom<ToolDefinition> for Tool {
    type Error = serde_json::Error;

    fn try_from(value: ToolDefinition) -> Result<Self, Self::Error> {
        Ok(Tool {
            r#type: "function".to_string(),
            name: value.name.into_string(),
            description: value.description,
            parameters: serde_json::to_value(value.input_schema)?,
            strict: value.strict,
        })
    }
}

/// A turn becomes one or more input items: the text of an assistant turn
/// comes first, followed by one `function_call` item per call.
fn into_items(turn: Turn) -> Vec<InputItem> {
    match turn {
        Turn::Message(message) => {
            let text = message.content.filter(|content| !content.is_empty());
            let content = match message.role {
                Role::Assistant => text.map(|text| InputItem::Message {
                    role: MessageRole::Assistant,
                    content: vec![ContentPart::OutputText { text }],
                }),
                Role::User | Role::Tool => Some(InputItem::Message {
                    role: MessageRole::User,
                    content: vec![ContentPart::InputText { text: text.unwrap_or_default() }],
                }),
            };

            content
                .into_iter()
                .chain(message.tool_calls.into_iter().map(|call| {
                    InputItem::FunctionCall {
                        call_id: call.call_id,
                        name: call.name,
                        arguments: call.arguments,
                    }
                }))
                .collect()
        }
        Turn::ToolResult(result) => vec![InputItem::FunctionCallOutput {
            call_id: result.call_id,
            output: result.output.content,
        }],
    }
}

impl TryFrom<Context> for Request {
    type Error = serde_json::Error;

    fn try_from(context: Context) -> Result<Self, Self::Error> {
        // This shape has no tool choice: a follow-up omits the declarations and
        // tells the model not to call tools instead
        let follow_up = context.is_follow_up();

        let tools = if follow_up {
            vec![]
        } else {
            context
                .tools
                .into_iter()
                .map(Tool::try_from)
                .collect::<Result<Vec<_>, _>>()?
        };

        let instructions = if follow_up {
            context.follow_up_instructions.or(context.instructions)
        } else {
            context.instructions
        };

        Ok(Request {
            model: context.model,
            input: context.messages.into_iter().flat_map(into_items).collect(),
            instructions,
            temperature: context.temperature,
            max_output_tokens: context.max_tokens.value(),
            stream: context.stream,
            tools: (!tools.is_empty()).then_some(tools),
            reasoning: context.reasoning_effort.map(|effort| Reasoning { effort }),
            text: context.output_format.map(Text::try_from).transpose()?,
        })
    }
}
