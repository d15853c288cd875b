use anyhow::Context;
use palaver_domain::{Error, ExecutableTool, NamedTool, ToolDescription, ToolName, ToolOutput};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

pub const SEARCH_ERROR_MESSAGE: &str = "Search failed. Please try again.";

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct WebSearchInput {
    /// Search terms, for example: best beaches in Brazil
    pub query: String,
}

#[derive(Debug, Serialize)]
struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

#[derive(Debug, Serialize)]
struct SearchResults<'a> {
    query: &'a str,
    results: Vec<SearchHit>,
}

/// Searches the web for information. Results are simulated: every query
/// answers with the same two example sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSearch;

impl WebSearch {
    fn search(&self, query: &str) -> anyhow::Result<String> {
        let query = query.trim();
        if query.is_empty() {
            anyhow::bail!(SEARCH_ERROR_MESSAGE);
        }

        debug!(query = %query, "Running web search");
        let payload = SearchResults {
            query,
            results: vec![
                SearchHit {
                    title: "Example source 1".to_string(),
                    url: "https://example.com/fonte-1".to_string(),
                    snippet: format!("Simulated result for '{query}'."),
                },
                SearchHit {
                    title: "Example source 2".to_string(),
                    url: "https://example.com/fonte-2".to_string(),
                    snippet: format!("Another simulated result for '{query}'."),
                },
            ],
        };

        serde_json::to_string(&payload).context(SEARCH_ERROR_MESSAGE)
    }
}

impl NamedTool for WebSearch {
    fn tool_name() -> ToolName {
        ToolName::new("web_search")
    }
}

impl ToolDescription for WebSearch {
    fn description(&self) -> String {
        "Search the web for information".to_string()
    }
}

impl ExecutableTool for WebSearch {
    type Input = WebSearchInput;

    fn call(&self, input: Self::Input) -> anyhow::Result<String> {
        self.search(&input.query).inspect_err(|err| {
            error!(query = %input.query, error = ?err, "Web search failed");
        })
    }

    fn suggest_output(&self, input: Self::Input) -> Option<String> {
        Some(
            self.search(&input.query)
                .unwrap_or_else(|_| ToolOutput::error(SEARCH_ERROR_MESSAGE).content),
        )
    }

    fn invalid_arguments(&self, _error: &Error) -> String {
        SEARCH_ERROR_MESSAGE.to_string()
    }
}
