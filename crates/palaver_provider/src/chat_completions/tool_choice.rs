use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    None,
    Auto,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct FunctionType;

impl Serialize for FunctionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("function")
    }
}

impl<'de> Deserialize<'de> for FunctionType {
    fn deserialize<D>(deserializer: D) -> Result<FunctionType, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(FunctionType)
    }
}

impl From<palaver_domain::ToolChoice> for ToolChoice {
    fn from(value: palaver_domain::ToolChoice) -> Self {
        match value {
            palaver_domain::ToolChoice::None => ToolChoice::None,
            palaver_domain::ToolChoice::Auto => ToolChoice::Auto,
        }
    }
}
