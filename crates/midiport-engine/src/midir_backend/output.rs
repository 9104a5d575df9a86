use midir::{MidiOutput, MidiOutputConnection};
use std::ffi::CStr;
use tracing::debug;

use super::backend_api;
use crate::api::Api;
use crate::error::{Error, Result};
use crate::native::{copy_port_name, NativeOutput, NativePort};

pub struct MidirOutput {
    client_name: String,
    enumerator: MidiOutput,
    connection: Option<MidiOutputConnection>,
}

impl MidirOutput {
    pub fn new(client_name: &str) -> Result<Self> {
        let enumerator = MidiOutput::new(client_name)?;
        Ok(Self {
            client_name: client_name.to_string(),
            enumerator,
            connection: None,
        })
    }
}

impl NativePort for MidirOutput {
    fn api(&self) -> Api {
        backend_api()
    }

    fn open_port(&mut self, index: usize, port_name: &CStr) -> Result<()> {
        if self.connection.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let client = MidiOutput::new(&self.client_name)?;
        let ports = client.ports();
        let port = ports.get(index).ok_or(Error::InvalidPort {
            index,
            count: ports.len(),
        })?;
        let target = client.port_name(port)?;

        let connection = client.connect(port, &port_name.to_string_lossy())?;
        debug!("{}: connected MIDI output to '{}'", self.client_name, target);
        self.connection = Some(connection);
        Ok(())
    }

    #[cfg(unix)]
    fn open_virtual_port(&mut self, port_name: &CStr) -> Result<()> {
        use midir::os::unix::VirtualOutput;

        if self.connection.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let name = port_name.to_string_lossy();
        let connection = MidiOutput::new(&self.client_name)?.create_virtual(&name)?;
        debug!("{}: created virtual MIDI output '{}'", self.client_name, name);
        self.connection = Some(connection);
        Ok(())
    }

    #[cfg(not(unix))]
    fn open_virtual_port(&mut self, _port_name: &CStr) -> Result<()> {
        Err(Error::VirtualUnsupported(self.api()))
    }

    fn close_port(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
            debug!("{}: closed MIDI output", self.client_name);
        }
    }

    fn is_port_open(&self) -> bool {
        self.connection.is_some()
    }

    fn port_count(&self) -> Result<usize> {
        Ok(self.enumerator.port_count())
    }

    fn port_name(&self, index: usize, buf: &mut [u8]) -> Result<usize> {
        let ports = self.enumerator.ports();
        let port = ports.get(index).ok_or(Error::InvalidPort {
            index,
            count: ports.len(),
        })?;
        let name = self.enumerator.port_name(port)?;
        Ok(copy_port_name(&name, buf))
    }
}

impl NativeOutput for MidirOutput {
    fn send_message(&mut self, bytes: &[u8]) -> Result<()> {
        let connection = self.connection.as_mut().ok_or(Error::NotOpen)?;
        connection.send(bytes)?;
        Ok(())
    }
}

impl Drop for MidirOutput {
    fn drop(&mut self) {
        self.close_port();
    }
}
