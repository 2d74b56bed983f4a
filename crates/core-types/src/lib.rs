//! Shared primitives for the WebScout workspace.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Shared error type carried across crate boundaries (event bus payloads,
/// session bookkeeping) where a richer taxonomy is not needed.
#[derive(Debug, Error, Clone)]
pub enum ScoutError {
    #[error("{message}")]
    Message { message: String },
}

impl ScoutError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_ne!(ActionId::new(), ActionId::new());
    }

    #[test]
    fn error_formats_message() {
        let err = ScoutError::new("bus closed");
        assert_eq!(err.to_string(), "bus closed");
    }
}
