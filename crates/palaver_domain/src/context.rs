use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    MaxTokens, ModelId, OutputFormat, ReasoningEffort, SessionConfig, Temperature, ToolChoice,
    ToolDefinition, Turn,
};

/// Appended to the instructions of a follow-up request for API shapes that
/// can't force tool use off with a tool choice.
pub const FOLLOW_UP_INSTRUCTIONS: &str =
    "Answer using the submitted tool output. Do not call tools again.";

/// Represents a request being made to the LLM provider, independent of the
/// API shape it is eventually encoded into.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Setters)]
#[setters(into, strip_option)]
pub struct Context {
    pub model: ModelId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Replaces `instructions` for API shapes that omit tools on a follow-up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_instructions: Option<String>,
    pub messages: Vec<Turn>,
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    pub temperature: Temperature,
    pub max_tokens: MaxTokens,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    pub stream: bool,
}

impl Context {
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            instructions: None,
            follow_up_instructions: None,
            messages: vec![],
            tools: vec![],
            tool_choice: None,
            temperature: Temperature::default(),
            max_tokens: MaxTokens::default(),
            reasoning_effort: None,
            output_format: None,
            stream: true,
        }
    }

    /// Tool use is forced off for this request
    pub fn is_follow_up(&self) -> bool {
        matches!(self.tool_choice, Some(ToolChoice::None))
    }
}

/// Builds the outbound [`Context`] from the session configuration and the
/// conversation log. Building has no side effects.
#[derive(Clone, Debug, Default, Setters)]
#[setters(into)]
pub struct RequestBuilder {
    /// Declarations available to the model
    tools: Vec<ToolDefinition>,
    /// Forces tool use off so the model answers in natural language
    follow_up: bool,
}

impl RequestBuilder {
    pub fn build(&self, config: &SessionConfig, turns: &[Turn]) -> Context {
        let instructions = config.active_instructions().map(str::to_string);

        // A follow-up keeps the declarations so the upstream can resolve the
        // tool calls already present in the log
        let tools = if config.tools_enabled || self.follow_up {
            self.tools.clone()
        } else {
            vec![]
        };

        let tool_choice = if self.follow_up {
            Some(ToolChoice::None)
        } else {
            None
        };

        let follow_up_instructions = self.follow_up.then(|| {
            let mut text = instructions
                .as_deref()
                .map(|instructions| format!("{}\n\n", instructions.trim()))
                .unwrap_or_default();
            text.push_str(FOLLOW_UP_INSTRUCTIONS);
            text
        });

        debug!(
            model = %config.model,
            turns = turns.len(),
            tools = tools.len(),
            follow_up = self.follow_up,
            "Building request"
        );

        Context {
            model: config.model.clone(),
            instructions,
            follow_up_instructions,
            messages: turns.to_vec(),
            tools,
            tool_choice,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            reasoning_effort: config.reasoning_effort,
            output_format: config.output_format.clone(),
            stream: config.stream,
        }
    }
}
