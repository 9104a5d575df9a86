//! MIDI port sessions on top of `midiport-engine`.
//!
//! - [`InputSession`]: open a port, then poll [`Input::message`] or install a
//!   handler with [`Input::set_callback`]
//! - [`OutputSession`]: open a port and [`Output::send_message`]
//! - [`CallbackRegistry`]: maps engine tokens back to installed handlers
//!
//! ```no_run
//! use midiport_io::{Input, InputSession, Port};
//!
//! let mut input = InputSession::new()?;
//! for port in input.ports()? {
//!     println!("{}: {}", port.index, port.name);
//! }
//! input.open_port(0, "monitor")?;
//! input.set_callback(Box::new(|bytes, delta| {
//!     println!("{:>8.4}s {:02X?}", delta, bytes);
//! }))?;
//! # Ok::<(), midiport_io::EngineError>(())
//! ```

mod capability;
mod config;
mod enumerate;
mod error;
mod handle;
mod input;
mod message;
mod output;
mod port;
mod registry;

pub use capability::{compiled_api_by_name, compiled_apis, version};
pub use config::{InputConfig, OutputConfig, DEFAULT_INPUT_CLIENT_NAME, DEFAULT_OUTPUT_CLIENT_NAME};
pub use enumerate::{sanitize_port_name, PortDescriptor};
pub use error::{EngineError, Result};
pub use handle::Status;
pub use input::{DeliveryMode, InputSession, InputSessionBuilder, SessionState};
pub use message::MidiMessage;
pub use output::{OutputSession, OutputSessionBuilder};
pub use port::{Input, Output, Port};
pub use registry::{CallbackRegistry, CallbackToken, Handler, SessionId};

pub use midiport_engine::{Api, IgnoreTypes, MAX_MESSAGE_SIZE};
