//! Error types for the native MIDI engine.

use crate::api::Api;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI driver error: {0}")]
    Driver(String),

    #[error("invalid port index {index} ({count} ports available)")]
    InvalidPort { index: usize, count: usize },

    #[error("no MIDI port is open")]
    NotOpen,

    #[error("a MIDI connection already exists on this instance")]
    AlreadyOpen,

    #[error("virtual ports are not supported by the {} backend", .0.display_name())]
    VirtualUnsupported(Api),

    #[error("no compiled support for the {} backend", .0.display_name())]
    ApiUnavailable(Api),

    #[error("a callback function is already set")]
    CallbackAlreadySet,

    #[error("no callback function was set")]
    NoCallback,

    #[error("a user callback is currently set for this port")]
    CallbackActive,

    #[error("message of {size} bytes does not fit the {capacity} byte buffer")]
    MessageTooLarge { size: usize, capacity: usize },

    #[error("delivery thread error: {0}")]
    Thread(String),
}

#[cfg(feature = "midir")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Driver(e.to_string())
    }
}

#[cfg(feature = "midir")]
impl<T> From<midir::ConnectError<T>> for Error {
    fn from(e: midir::ConnectError<T>) -> Self {
        Error::Driver(e.to_string())
    }
}

#[cfg(feature = "midir")]
impl From<midir::PortInfoError> for Error {
    fn from(e: midir::PortInfoError) -> Self {
        Error::Driver(e.to_string())
    }
}

#[cfg(feature = "midir")]
impl From<midir::SendError> for Error {
    fn from(e: midir::SendError) -> Self {
        Error::Driver(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
