use std::fmt;
use std::str::FromStr;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{Error, ModelId, OutputFormat, Temperature};

pub const DEFAULT_INSTRUCTIONS: &str =
    "You are a helpful assistant that can answer questions and help with tasks.";

/// Reasoning effort hint forwarded to the model as `reasoning.effort`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    /// Parses a user supplied effort. `off`/`none` clears the hint.
    pub fn parse_opt(value: &str) -> crate::Result<Option<Self>> {
        match value.trim().to_lowercase().as_str() {
            "off" | "none" | "" => Ok(None),
            other => Self::from_str(other)
                .map(Some)
                .map_err(|_| Error::InvalidReasoningEffort(value.to_string())),
        }
    }
}

/// Upper bound for the number of tokens the model may generate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MaxTokens(u32);

impl MaxTokens {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 131_072;

    pub fn new(value: u32) -> crate::Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidMaxTokens { value, min: Self::MIN, max: Self::MAX })
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for MaxTokens {
    fn default() -> Self {
        Self(30_000)
    }
}

impl TryFrom<u32> for MaxTokens {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MaxTokens> for u32 {
    fn from(value: MaxTokens) -> Self {
        value.0
    }
}

impl fmt::Display for MaxTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters of the next request, changed only by explicit user interaction.
#[derive(Clone, Debug, PartialEq, Setters)]
#[setters(into)]
pub struct SessionConfig {
    pub model: ModelId,
    pub instructions: String,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub temperature: Temperature,
    pub max_tokens: MaxTokens,
    pub tools_enabled: bool,
    /// Only effective while tools are enabled, see [`SessionConfig::manual_mode`]
    pub manual_tool_output: bool,
    /// Schema the answers must follow, free text when `None`
    pub output_format: Option<OutputFormat>,
    pub stream: bool,
}

impl SessionConfig {
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            reasoning_effort: Some(ReasoningEffort::Medium),
            temperature: Temperature::default(),
            max_tokens: MaxTokens::default(),
            tools_enabled: false,
            manual_tool_output: false,
            output_format: None,
            stream: true,
        }
    }

    /// Tool outputs are supplied by a human instead of being executed
    pub fn manual_mode(&self) -> bool {
        self.tools_enabled && self.manual_tool_output
    }

    /// Instructions when they contain anything but whitespace
    pub fn active_instructions(&self) -> Option<&str> {
        Some(self.instructions.as_str()).filter(|instructions| !instructions.trim().is_empty())
    }
}
