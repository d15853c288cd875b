use anyhow::{Context, Result};
use palaver_domain::{
    ChatCompletionMessage, Context as ChatContext, Provider, ProviderService, ResultStream,
};
use palaver_provider::Client;

#[derive(Clone)]
pub struct PalaverProviderService {
    client: Client,
}

impl PalaverProviderService {
    pub fn new(provider: Provider) -> Result<Self> {
        Ok(Self { client: Client::new(provider)? })
    }
}

#[async_trait::async_trait]
impl ProviderService for PalaverProviderService {
    async fn chat(&self, request: ChatContext) -> ResultStream<ChatCompletionMessage, anyhow::Error> {
        let model = request.model.clone();
        self.client
            .chat(request)
            .await
            .with_context(|| format!("Failed to chat with model: {model}"))
    }
}
