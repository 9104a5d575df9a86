//! Centralized error type for the midiport umbrella crate.
//!
//! Wraps both layers so `?` works whether a caller drives sessions or the
//! native engine directly.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] midiport_io::EngineError),

    #[error("native engine: {0}")]
    Native(#[from] midiport_engine::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
