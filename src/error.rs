use std::sync::Arc;
use thiserror::Error;

use crate::dns::ParseError;

#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid upstream server: {0}")]
    InvalidUpstreamServer(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid EDNS payload size: {0}")]
    InvalidPayloadSize(String),

    #[error("Failed to read config file {path}: {reason}")]
    ReadFile { path: String, reason: String },

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

/// Reasons a query produced no usable message
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("Query timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("All upstream servers failed: {0}")]
    AllServersFailed(String),

    #[error("Malformed DNS message: {0}")]
    Protocol(#[from] ParseError),

    #[error("Response from {0} does not match the query")]
    Mismatched(std::net::SocketAddr),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<std::io::Error> for ResolveError {
    fn from(err: std::io::Error) -> Self {
        ResolveError::Io(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Problems in a list of `<qname> <qtype>` lines
#[derive(Error, Debug, Clone)]
pub enum InputError {
    #[error("line {line}: expected `<qname> <qtype>`, got {text:?}")]
    Malformed { line: usize, text: String },

    #[error("line {line}: {source}")]
    Invalid { line: usize, source: ParseError },
}
