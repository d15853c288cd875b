mod provider;
mod request;
mod response;

pub use provider::Responses;
