mod provider;
mod request;
mod response;
mod tool_choice;

pub use provider::ChatCompletions;
