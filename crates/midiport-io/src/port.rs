//! Capability traits shared by input and output sessions.

use midiport_engine::{Api, IgnoreTypes};

use crate::enumerate::{self, PortDescriptor};
use crate::error::{EngineError, Result};
use crate::handle::Status;
use crate::message::MidiMessage;
use crate::registry::Handler;

/// Operations common to both directions.
pub trait Port {
    fn open_port(&mut self, index: usize, connection_name: &str) -> Result<()>;

    /// Creates a software endpoint other applications can connect to.
    /// Not every backend supports this.
    fn open_virtual_port(&mut self, connection_name: &str) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    fn port_count(&self) -> Result<usize>;

    fn port_name(&self, index: usize) -> Result<String>;

    fn api(&self) -> Result<Api>;

    fn status(&self) -> Status;

    /// Releases the engine handle. Terminal.
    fn destroy(&mut self);

    fn ports(&self) -> Result<Vec<PortDescriptor>> {
        enumerate::ports(self)
    }

    fn find_port(&self, name: &str) -> Result<Option<PortDescriptor>> {
        enumerate::find_port(self, name)
    }

    fn open_port_by_name(&mut self, name: &str, connection_name: &str) -> Result<()> {
        let port = self
            .find_port(name)?
            .ok_or_else(|| EngineError::new(format!("no MIDI port named '{}'", name)))?;
        self.open_port(port.index, connection_name)
    }
}

pub trait Input: Port {
    fn ignore_types(&mut self, ignore: IgnoreTypes) -> Result<()>;

    /// Replaces any installed handler. Runs on the backend's delivery thread.
    fn set_callback(&mut self, handler: Handler) -> Result<()>;

    fn cancel_callback(&mut self) -> Result<()>;

    /// Non-blocking poll. Empty when nothing is queued.
    fn message(&mut self) -> Result<MidiMessage>;
}

pub trait Output: Port {
    fn send_message(&mut self, bytes: &[u8]) -> Result<()>;
}
