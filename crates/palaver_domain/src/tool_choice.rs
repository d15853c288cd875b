use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum ToolChoice {
    /// The model must not call any tool
    None,
    #[default]
    Auto,
}
