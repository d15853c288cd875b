use std::collections::HashMap;
use std::sync::Arc;

use palaver_domain::{Tool, ToolCallFull, ToolDefinition, ToolName, ToolOutput, ToolService};
use tracing::debug;

use crate::tools::ToolRegistry;

/// Payload answered for a tool that has no handler
pub const NOT_IMPLEMENTED: &str = r#"{"message":"Function not implemented."}"#;

#[derive(Clone)]
pub struct PalaverToolService {
    tools: Arc<HashMap<ToolName, Tool>>,
}

impl PalaverToolService {
    pub fn new() -> Self {
        PalaverToolService::from_iter(ToolRegistry.tools())
    }
}

impl Default for PalaverToolService {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Tool> for PalaverToolService {
    fn from_iter<T: IntoIterator<Item = Tool>>(iter: T) -> Self {
        let tools: HashMap<ToolName, Tool> = iter
            .into_iter()
            .map(|tool| (tool.definition.name.clone(), tool))
            .collect::<HashMap<_, _>>();

        Self { tools: Arc::new(tools) }
    }
}

#[async_trait::async_trait]
impl ToolService for PalaverToolService {
    async fn call(&self, call: &ToolCallFull) -> ToolOutput {
        debug!(tool_name = %call.name, arguments = %call.arguments, "Executing tool call");

        let output = match self.tools.get(&call.name) {
            Some(tool) => tool.executable.call(call),
            None => {
                debug!(tool_name = %call.name, "No handler for tool");
                ToolOutput::text(NOT_IMPLEMENTED)
            }
        };

        debug!(output = ?output, "Tool call result");
        output
    }

    fn list(&self) -> Vec<ToolDefinition> {
        let mut tools: Vec<_> = self
            .tools
            .values()
            .map(|tool| tool.definition.clone())
            .collect();

        // Declarations go out in a stable order
        tools.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));

        tools
    }

    fn suggest_output(&self, call: &ToolCallFull) -> Option<String> {
        self.tools
            .get(&call.name)
            .and_then(|tool| tool.executable.suggest_output(call))
    }
}
