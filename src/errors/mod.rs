//! # Error Handling
//!
//! Error types for the control plane. Validation failures that attach to a
//! single source object (bad Ingress, dangling service reference, cyclic
//! delegation) are never represented here — they become `dag::Status` data on
//! that object so one malformed object can never abort a rebuild. This module
//! covers the ambient failure surface: configuration, transport, TLS parsing
//! and I/O.

pub mod tls;

pub use tls::TlsError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("i/o error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    #[error("tls error: {0}")]
    Tls(#[from] TlsError),

    #[error("xDS protocol error: {message}")]
    Xds { message: String, node_id: Option<String> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    pub fn xds<S: Into<String>>(message: S) -> Self {
        Self::Xds { message: message.into(), node_id: None }
    }

    pub fn xds_with_node<S: Into<String>, N: Into<String>>(message: S, node_id: N) -> Self {
        Self::Xds { message: message.into(), node_id: Some(node_id.into()) }
    }

    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Config { message: error.to_string(), source: Some(Box::new(error)) }
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("configuration loading failed", Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_message() {
        let error = Error::config("bad value");
        assert!(matches!(error, Error::Config { .. }));
        assert_eq!(error.to_string(), "configuration error: bad value");
    }

    #[test]
    fn io_error_converts() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io { .. }));
    }
}
