//! Foundry Core - Campaign record, wire protocol, configuration and errors

pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

pub use config::{Credentials, FoundryConfig};
pub use error::{Error, Result};
pub use protocol::*;
pub use types::*;
