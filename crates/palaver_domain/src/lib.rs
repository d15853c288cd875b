mod chat_response;
mod config;
mod context;
mod conversation;
mod error;
mod message;
mod model;
mod orch;
mod output_format;
mod provider;
mod reconstruct;
mod services;
mod session;
mod temperature;
mod tool;
mod tool_call;
mod tool_choice;
mod tool_definition;
mod tool_name;
mod tool_result;

pub use chat_response::*;
pub use config::*;
pub use context::*;
pub use conversation::*;
pub use error::*;
pub use message::*;
pub use model::*;
pub use orch::*;
pub use output_format::*;
pub use provider::*;
pub use reconstruct::*;
pub use services::*;
pub use session::*;
pub use temperature::*;
pub use tool::*;
pub use tool_call::*;
pub use tool_choice::*;
pub use tool_definition::*;
pub use tool_name::*;
pub use tool_result::*;
