use palaver_domain::Tool;

use super::web_search::WebSearch;

#[derive(Default)]
pub struct ToolRegistry;

impl ToolRegistry {
    /// Returns every tool the assistant can declare to the model
    pub fn tools(&self) -> Vec<Tool> {
        vec![WebSearch.into()]
    }
}
