//! Error type for MIDI port sessions.

use thiserror::Error;

/// The single failure kind surfaced by sessions: the text of the native
/// layer's last-operation status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn destroyed() -> Self {
        Self::new("engine handle has been destroyed")
    }

    pub(crate) fn invalid_config(reason: impl std::fmt::Display) -> Self {
        Self::new(format!("invalid config: {}", reason))
    }
}

impl From<midiport_engine::Error> for EngineError {
    fn from(e: midiport_engine::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<std::ffi::NulError> for EngineError {
    fn from(e: std::ffi::NulError) -> Self {
        Self::new(format!("name contains an interior NUL byte at {}", e.nul_position()))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
