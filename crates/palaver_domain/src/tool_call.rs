use derive_more::{Display, From};
use derive_setters::Setters;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{Error, Result, ToolName};

/// Unique identifier for a using a tool
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Hash, Serialize, Display)]
#[serde(transparent)]
pub struct ToolCallId(pub(crate) String);

impl ToolCallId {
    pub fn new(value: impl ToString) -> Self {
        ToolCallId(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Contains a part message for using a tool. This is received as a part of the
/// response from the model only when streaming is enabled.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize, Setters)]
#[setters(strip_option, into)]
pub struct ToolCallPart {
    /// Positional index assigned by the upstream service. NOTE: Not every
    /// upstream attaches it to every fragment.
    pub index: Option<u64>,

    /// Optional unique identifier that represents a single call to the tool
    /// use. NOTE: Not all models send the call ID with every fragment
    pub call_id: Option<ToolCallId>,
    pub name: Option<ToolName>,

    /// Arguments fragment that needs to be appended to the arguments received
    /// so far for the same call
    pub arguments_part: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, From)]
pub enum ToolCall {
    Full(ToolCallFull),
    Part(ToolCallPart),
}

impl ToolCall {
    pub fn as_partial(&self) -> Option<&ToolCallPart> {
        match self {
            ToolCall::Full(_) => None,
            ToolCall::Part(part) => Some(part),
        }
    }

    pub fn as_full(&self) -> Option<&ToolCallFull> {
        match self {
            ToolCall::Full(full) => Some(full),
            ToolCall::Part(_) => None,
        }
    }
}

/// Contains the full information about using a tool. This is received as a part
/// of the response from the model when streaming is disabled, or assembled from
/// [`ToolCallPart`]s once the stream is over.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, Setters)]
#[setters(strip_option, into)]
#[serde(rename_all = "snake_case")]
pub struct ToolCallFull {
    pub name: ToolName,
    pub call_id: Option<ToolCallId>,
    /// Raw arguments exactly as produced by the model
    pub arguments: String,
}

impl ToolCallFull {
    pub fn new(tool_name: ToolName) -> Self {
        Self { name: tool_name, call_id: None, arguments: String::new() }
    }

    /// Returns the call id when it is present and not blank
    pub fn valid_call_id(&self) -> Option<&ToolCallId> {
        self.call_id.as_ref().filter(|id| !id.is_blank())
    }

    /// Decodes the arguments into the tool input. Both a JSON object and a
    /// JSON-encoded string that contains an object are accepted.
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> Result<T> {
        let error = |reason: String| Error::ToolCallArgument { name: self.name.clone(), reason };

        let value: Value =
            serde_json::from_str(&self.arguments).map_err(|e| error(e.to_string()))?;
        let value = match value {
            Value::String(encoded) => {
                serde_json::from_str(&encoded).map_err(|e| error(e.to_string()))?
            }
            value => value,
        };

        serde_json::from_value(value).map_err(|e| error(e.to_string()))
    }
}

/// Deserializes tool call arguments that some upstreams send as a JSON object
/// instead of a JSON-encoded string. Objects are re-encoded so the arguments
/// are always kept as text.
pub fn deserialize_arguments<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(arguments)) => Ok(arguments),
        Some(value) => Ok(value.to_string()),
    }
}
