use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Calendar adapter error: {0}")]
    #[diagnostic(code(koostebotti::adapter))]
    Adapter(String),

    #[error("Chat transport error: {0}")]
    #[diagnostic(code(koostebotti::transport))]
    Transport(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(koostebotti::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(koostebotti::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(koostebotti::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(koostebotti::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for JSON serialization errors
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create calendar adapter errors
pub fn adapter_error(message: &str) -> Error {
    Error::Adapter(message.to_string())
}

/// Helper to create chat transport errors
pub fn transport_error(message: &str) -> Error {
    Error::Transport(message.to_string())
}

/// Helper to create configuration errors
#[allow(dead_code)]
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create other errors
#[allow(dead_code)]
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
