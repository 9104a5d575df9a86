//! Platform backend (ALSA, CoreMIDI, WinMM, Web MIDI or JACK) via midir.
//!
//! A long-lived enumerator client answers enumeration queries; every connection
//! gets its own midir client because midir consumes it on connect.

mod input;
mod output;

pub use input::MidirInput;
pub use output::MidirOutput;

use crate::api::{Api, NATIVE_API};

pub(crate) fn backend_api() -> Api {
    NATIVE_API.unwrap_or(Api::Unspecified)
}
