mod formats;
mod palaver_services;
mod provider;
mod tool_service;
mod tools;

pub use formats::*;
pub use palaver_services::*;
pub use provider::*;
pub use tool_service::*;
pub use tools::*;
