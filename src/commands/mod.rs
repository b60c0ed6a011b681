// ABOUTME: Action layer exports
// ABOUTME: Connection management and key browsing actions called by the presentation layer

pub mod connection;
pub mod keys;

pub use connection::*;
pub use keys::*;

use thiserror::Error;

use crate::config::StoreError;
use crate::db::ClientError;
use crate::models::KeyType;

/// Why an action failed. Actions fold this into their result record.
#[derive(Error, Debug)]
pub enum ActionError {
    /// Bad or missing input; nothing was written
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Cannot edit type {0}")]
    TypeMismatch(KeyType),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Client(#[from] ClientError),
}

impl ActionError {
    pub fn validation(message: impl Into<String>) -> Self {
        ActionError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ActionError::NotFound(message.into())
    }

    /// The server was unreachable; the UI should offer a way back
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, ActionError::Client(e) if e.is_connection_lost())
    }
}
