use std::time::Duration;

use anyhow::Context as _;
use palaver_domain::{BoxStream, ChatCompletionMessage};
use reqwest::Url;
use reqwest_eventsource::{Event, EventSource};
use tokio_stream::StreamExt;
use tracing::debug;

use crate::error::Error;
use crate::utils::{format_http_context, transport_error};

/// Sentinel frame that ends a stream
const DONE: &str = "[DONE]";

/// Turns the payloads of one API shape into completion messages.
pub(crate) trait Decoder: Clone + Send + Sync + 'static {
    /// Decodes the `data` of a server sent event. Frames that carry nothing
    /// usable yield `Ok(None)`; an error reported by the upstream is an `Err`.
    fn decode_event(&self, data: &str) -> anyhow::Result<Option<ChatCompletionMessage>>;

    /// Decodes the complete body of a response that was not streamed.
    fn decode_body(&self, body: &str) -> anyhow::Result<ChatCompletionMessage>;
}

/// Reads an event source until it ends or sends `[DONE]`. Empty frames are
/// skipped, a non event-stream response is decoded as a complete body.
pub(crate) fn into_message_stream<D: Decoder>(
    event_source: EventSource,
    url: Url,
    timeout: Duration,
    decoder: D,
) -> BoxStream<ChatCompletionMessage, anyhow::Error> {
    let stream = event_source
        .take_while(|message| match message {
            Err(reqwest_eventsource::Error::StreamEnded) => false,
            Ok(Event::Message(event)) if event.data == DONE => {
                debug!("Received completion from Upstream");
                false
            }
            _ => true,
        })
        .then(move |event| {
            let decoder = decoder.clone();
            async move {
                match event {
                    Ok(event) => match event {
                        Event::Open => None,
                        Event::Message(event) if event.data.is_empty() => None,
                        Event::Message(message) => decoder.decode_event(&message.data).transpose(),
                    },
                    Err(error) => match error {
                        reqwest_eventsource::Error::StreamEnded => None,
                        reqwest_eventsource::Error::InvalidStatusCode(_, response) => {
                            let status = response.status();
                            let body = response.text().await.ok();
                            Some(Err(Error::InvalidStatusCode(status.as_u16())).with_context(
                                || match body {
                                    Some(body) => format!("{status} Reason: {body}"),
                                    None => format!("{status} Reason: [Unknown]"),
                                },
                            ))
                        }
                        reqwest_eventsource::Error::InvalidContentType(content_type, response) => {
                            let status = response.status();
                            debug!(
                                content_type = ?content_type,
                                status = %status,
                                "Upstream did not stream, decoding the complete body"
                            );
                            Some(match response.text().await {
                                Ok(body) => decoder
                                    .decode_body(&body)
                                    .with_context(|| format!("Http Status: {status}")),
                                Err(error) => Err(transport_error(error, timeout)),
                            })
                        }
                        reqwest_eventsource::Error::Transport(error) => {
                            debug!(error = %error, "Transport failure while streaming");
                            Some(Err(transport_error(error, timeout)))
                        }
                        error => {
                            debug!(error = %error, "Failed to receive chat completion event");
                            Some(Err(error.into()))
                        }
                    },
                }
            }
        })
        .filter_map(move |response| {
            response.map(|result| result.with_context(|| format_http_context(None, "POST", &url)))
        });

    Box::pin(stream)
}

/// Parses a frame, skipping it when it is not valid JSON of the expected shape.
pub(crate) fn parse_frame<T: serde::de::DeserializeOwned>(data: &str) -> Option<T> {
    serde_json::from_str::<T>(data)
        .inspect_err(|error| debug!(error = %error, data = %data, "Skipping malformed frame"))
        .ok()
}
