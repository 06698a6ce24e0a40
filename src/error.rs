//! Error types for gigachain.
//!
//! Each layer owns its error enum: [`ModelError`] for chat-model backends,
//! [`ChainError`] for chains built on top of them, and [`CommandError`] for
//! the CLI. [`Error`] aggregates all three for the binary.

use thiserror::Error;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Chat-model backend failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Chain failure.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Errors raised by chat-model backends.
#[derive(Debug, Error)]
pub enum ModelError {
    /// User or password is absent when a token has to be obtained.
    #[error(
        "can't authorize to GigaChat: missing credentials, provide GIGA_USER and GIGA_PASSWORD"
    )]
    MissingCredentials,

    /// The token endpoint answered with a non-success status.
    #[error("can't authorize to GigaChat, error code: {status}")]
    Unauthorized {
        /// HTTP status code returned by the token endpoint.
        status: u16,
    },

    /// Transport, timeout, status or parse failure while talking to the service.
    #[error("error raised by the service: {message}")]
    Service {
        /// Description of the underlying cause.
        message: String,
    },

    /// A message that cannot be serialized for the remote API.
    #[error("unsupported message: {message}")]
    UnsupportedMessage {
        /// What is wrong with the message.
        message: String,
    },

    /// Configuration rejected by the builder.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        message: String,
    },
}

impl ModelError {
    /// Wraps any displayable cause as a [`ModelError::Service`].
    pub fn service(cause: impl std::fmt::Display) -> Self {
        Self::Service {
            message: cause.to_string(),
        }
    }
}

/// Errors raised by chains.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The underlying chat model failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A prompt template variable has no value.
    #[error("missing value for prompt variable '{name}'")]
    MissingVariable {
        /// Variable name.
        name: String,
    },

    /// A prompt template is malformed.
    #[error("malformed prompt template: {message}")]
    Template {
        /// What is wrong with the template.
        message: String,
    },

    /// The chain received nothing to work on.
    #[error("empty input: {what}")]
    EmptyInput {
        /// Which input was empty.
        what: String,
    },

    /// Chain parameters are inconsistent.
    #[error("invalid chain configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the parameters.
        message: String,
    },

    /// The retrieval index could not be built or queried.
    #[error("retrieval index error: {message}")]
    Index {
        /// Description of the underlying cause.
        message: String,
    },

    /// Reading a template or document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChainError {
    /// Wraps a retrieval index failure.
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index {
            message: message.into(),
        }
    }
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command execution failed.
    #[error("command failed: {0}")]
    ExecutionFailed(String),

    /// Invalid command-line argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output formatting failed.
    #[error("output format error: {0}")]
    OutputFormat(String),

    /// Terminal or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
