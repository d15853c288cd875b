use anyhow::{Context as _, Result};
use derive_builder::Builder;
use palaver_domain::{ChatCompletionMessage, Context as ChatContext, Provider, ResultStream};
use reqwest::Client;
use reqwest_eventsource::RequestBuilderExt;
use tracing::debug;

use super::request::Request;
use super::response::Response;
use crate::error::Error;
use crate::event_stream::{into_message_stream, parse_frame, Decoder};
use crate::utils::{endpoint, format_http_context, headers};

/// Client of the `chat/completions` API shape.
#[derive(Clone, Builder)]
pub struct ChatCompletions {
    client: Client,
    provider: Provider,
}

impl ChatCompletions {
    pub fn builder() -> ChatCompletionsBuilder {
        ChatCompletionsBuilder::default()
    }

    pub async fn chat(
        &self,
        context: ChatContext,
    ) -> ResultStream<ChatCompletionMessage, anyhow::Error> {
        let request = Request::try_from(context).context("Failed to encode the request")?;
        let url = endpoint(&self.provider.base_url, "chat/completions")?;

        debug!(
            url = %url,
            model = %request.model,
            message_count = %request.message_count(),
            tool_choice = ?request.tool_choice,
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

        Ok(into_message_stream(es, url, self.provider.timeout, ChatCompletionsDecoder))
    }
}

#[derive(Clone, Copy)]
struct ChatCompletionsDecoder;

impl Decoder for ChatCompletionsDecoder {
    fn decode_event(&self, data: &str) -> Result<Option<ChatCompletionMessage>> {
        let Some(response) = parse_frame::<Response>(data) else {
            return Ok(None);
        };
        ChatCompletionMessage::try_from(response)
            .with_context(|| format!("Failed to create completion message: {data}"))
            .map(Some)
    }

    fn decode_body(&self, body: &str) -> Result<ChatCompletionMessage> {
        let response = serde_json::from_str::<Response>(body)
            .with_context(|| format!("Invalid response from the server: {body}"))?;
        if let Response::Success { choices, .. } = &response {
            if choices.is_empty() {
                return Err(Error::EmptyChoices.into());
            }
        }
        ChatCompletionMessage::try_from(response)
    }
}

#[cfg(test)]
mod tests {
    use palaver_domain::{Content, ToolCall};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_decode_event_skips_malformed_frame() {
        let actual = ChatCompletionsDecoder.decode_event("{\"choices\":[{\"delta\"").unwrap();
        assert_eq!(actual, None);
    }

    #[test]
    fn test_decode_event_reports_upstream_error() {
        let actual = ChatCompletionsDecoder
            .decode_event(r#"{"error":{"message":"overloaded","code":503}}"#);
        assert!(actual.is_err());
    }

    #[test]
    fn test_decode_body_without_choices() {
        let actual = ChatCompletionsDecoder.decode_body(r#"{"id":"x","choices":[]}"#);
        let error = actual.unwrap_err();
        assert!(matches!(error.downcast_ref::<Error>(), Some(Error::EmptyChoices)));
    }

    #[test]
    fn test_decode_body() {
        let actual = ChatCompletionsDecoder
            .decode_body(r#"{"choices":[{"message":{"content":"Olá"},"finish_reason":"stop"}]}"#)
            .unwrap();
        assert_eq!(actual.content, Some(Content::full("Olá")));
        assert_eq!(actual.tool_calls, Vec::<ToolCall>::new());
    }
}
