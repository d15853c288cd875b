use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Unknown command: {0}. Type /help to see the available commands")]
    UnknownCommand(String),

    #[error("Missing command parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid argument for {command}: {value}")]
    InvalidParameter { command: String, value: String },
}

pub type Result<A> = std::result::Result<A, Error>;
