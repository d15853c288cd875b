mod chat_completions;
mod client;
mod error;
mod event_stream;
mod responses;
mod utils;

pub use client::Client;
pub use error::Error;
