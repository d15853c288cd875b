use anyhow::{Context as _, Result};
use derive_builder::Builder;
use palaver_domain::{ChatCompletionMessage, Context as ChatContext, Provider, ResultStream};
use reqwest::Client;
use reqwest_eventsource::RequestBuilderExt;
use tracing::debug;

use super::request::Request;
use super::response::{Event, ResponseObject};
use crate::event_stream::{into_message_stream, parse_frame, Decoder};
use crate::utils::{endpoint, format_http_context, headers};

/// Client of the `responses` API shape.
#[derive(Clone, Builder)]
pub struct Responses {
    client: Client,
    provider: Provider,
}

impl Responses {
    pub fn builder() -> ResponsesBuilder {
        ResponsesBuilder::default()
    }

    pub async fn chat(
        &self,
        context: ChatContext,
    ) -> ResultStream<ChatCompletionMessage, anyhow::Error> {
        let request = Request::try_from(context).context("Failed to encode the request")?;
        let url = endpoint(&self.provider.base_url, "responses")?;

        debug!(
            url = %url,
            model = %request.model,
            item_count = %request.item_count(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Connecting Upstream"
        );

        let mut es = self
            .client
            .post(url.clone())
            .headers(headers(&self.provider)?)
            .json(&request)
            .eventsource()
            .with_context(|| format_http_context(None, "POST", &url))?;
        es.set_retry_policy(Box::new(reqwest_eventsource::retry::Never));

        Ok(into_message_stream(es, url, self.provider.timeout, ResponsesDecoder))
    }
}

#[derive(Clone, Copy)]
struct ResponsesDecoder;

impl Decoder for ResponsesDecoder {
    fn decode_event(&self, data: &str) -> Result<Option<ChatCompletionMessage>> {
        let Some(event) = parse_frame::<Event>(data) else {
            return Ok(None);
        };
        event
            .into_message()
            .with_context(|| format!("Response failed: {data}"))
    }

    fn decode_body(&self, body: &str) -> Result<ChatCompletionMessage> {
        let response = serde_json::from_str::<ResponseObject>(body)
            .with_context(|| format!("Invalid response from the server: {body}"))?;
        Ok(response.into())
    }
}
