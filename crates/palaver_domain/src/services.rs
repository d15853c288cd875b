use crate::{ChatCompletionMessage, Context, ResultStream, ToolService};

#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    async fn chat(&self, context: Context) -> ResultStream<ChatCompletionMessage, anyhow::Error>;
}

/// Core app trait providing access to the services the orchestrator needs.
pub trait Services: Send + Sync + 'static {
    type ProviderService: ProviderService;
    type ToolService: ToolService;

    fn provider_service(&self) -> &Self::ProviderService;
    fn tool_service(&self) -> &Self::ToolService;
}
