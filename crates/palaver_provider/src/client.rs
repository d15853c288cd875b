use std::sync::Arc;

use anyhow::{Context as _, Result};
use palaver_domain::{
    ApiShape, ChatCompletionMessage, Context, Provider, ProviderService, ResultStream,
};
use reqwest::redirect::Policy;
use tracing::info;

use crate::chat_completions::ChatCompletions;
use crate::responses::Responses;

/// Inference client for the API shape selected by the [`Provider`].
#[derive(Clone)]
pub struct Client {
    inner: Arc<InnerClient>,
}

enum InnerClient {
    ChatCompletions(ChatCompletions),
    Responses(Responses),
}

impl Client {
    pub fn new(provider: Provider) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(provider.timeout)
            .read_timeout(provider.timeout)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .pool_max_idle_per_host(5)
            .redirect(Policy::limited(10))
            .build()?;

        info!(
            api = %provider.api,
            base_url = %provider.base_url,
            timeout_secs = provider.timeout.as_secs(),
            "Initializing provider client"
        );

        let url = provider.base_url.clone();
        let inner = match provider.api {
            ApiShape::Chat => InnerClient::ChatCompletions(
                ChatCompletions::builder()
                    .client(client)
                    .provider(provider)
                    .build()
                    .with_context(|| format!("Failed to initialize: {url}"))?,
            ),
            ApiShape::Responses => InnerClient::Responses(
                Responses::builder()
                    .client(client)
                    .provider(provider)
                    .build()
                    .with_context(|| format!("Failed to initialize: {url}"))?,
            ),
        };

        Ok(Self { inner: Arc::new(inner) })
    }
}

#[async_trait::async_trait]
impl ProviderService for Client {
    async fn chat(&self, context: Context) -> ResultStream<ChatCompletionMessage, anyhow::Error> {
        match self.inner.as_ref() {
            InnerClient::ChatCompletions(provider) => provider.chat(context).await,
            InnerClient::Responses(provider) => provider.chat(context).await,
        }
    }
}
