//! Error types for Campaign Foundry

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
