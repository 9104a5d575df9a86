//! # midiport - Realtime MIDI port I/O
//!
//! One API over the operating system's MIDI subsystem: enumerate ports,
//! open physical or virtual connections, receive through a polled queue or
//! a callback, and send immediately.
//!
//! ## Architecture
//!
//! midiport is an umbrella crate over:
//! - **midiport-engine** - Native engine (backend selection, filtering, timestamps, queueing)
//! - **midiport-io** - Port sessions (engine handles, enumeration, callback registry)
//!
//! ## Quick Start
//!
//! ```no_run
//! use midiport::prelude::*;
//!
//! let mut output = OutputSession::new()?;
//! output.open_virtual_port("midiport out")?;
//!
//! let mut input = InputSession::builder()
//!     .ignore(IgnoreTypes::new(false, true, true))
//!     .build()?;
//! input.open_port(0, "midiport in")?;
//! input.set_callback(Box::new(|bytes, delta| println!("{delta:.4} {bytes:02X?}")))?;
//!
//! output.send_message(&[0x90, 60, 100])?;
//! # Ok::<(), midiport::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `midir` (default) - Platform backend for the target OS
//! - `jack` - JACK instead of the platform backend
//!
//! The dummy backend is always available.

mod error;

pub use error::{Error, Result};

/// Re-export of midiport-engine for direct backend access
pub use midiport_engine as engine;
/// Re-export of midiport-io
pub use midiport_io as io;

pub use midiport_io::{
    compiled_api_by_name, compiled_apis, sanitize_port_name, version, Api, CallbackRegistry,
    CallbackToken, DeliveryMode, EngineError, Handler, IgnoreTypes, Input, InputConfig,
    InputSession, InputSessionBuilder, MidiMessage, Output, OutputConfig, OutputSession,
    OutputSessionBuilder, Port, PortDescriptor, SessionId, SessionState, Status,
    MAX_MESSAGE_SIZE,
};

pub mod prelude {
    pub use crate::{
        Api, IgnoreTypes, Input, InputSession, MidiMessage, Output, OutputSession, Port,
        PortDescriptor,
    };
}
