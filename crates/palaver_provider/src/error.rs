use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Response(ErrorResponse),

    #[error("Invalid Status Code: {0}")]
    InvalidStatusCode(u16),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Response without choices")]
    EmptyChoices,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ErrorCode {
    String(String),
    Number(u16),
}

/// Error object returned by OpenAI compatible servers, possibly nested.
#[derive(Default, Debug, Deserialize, Serialize, Clone, Setters)]
#[setters(strip_option, into)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Box<ErrorResponse>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_of: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<serde_json::Value>,
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        serde_json::to_string(self)
            .map_err(|_| std::fmt::Error)?
            .fmt(f)
    }
}
