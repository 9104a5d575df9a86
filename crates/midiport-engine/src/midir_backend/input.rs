use midir::{Ignore, MidiInput, MidiInputConnection};
use std::ffi::CStr;
use std::sync::Arc;
use tracing::debug;

use super::backend_api;
use crate::api::Api;
use crate::delivery::{DeliverFn, DeliveryState, IgnoreTypes, InputShared};
use crate::error::{Error, Result};
use crate::native::{copy_port_name, NativeInput, NativePort};

pub struct MidirInput {
    client_name: String,
    enumerator: MidiInput,
    shared: Arc<InputShared>,
    connection: Option<MidiInputConnection<DeliveryState>>,
}

impl MidirInput {
    pub fn new(client_name: &str, queue_size_limit: usize) -> Result<Self> {
        let enumerator = MidiInput::new(client_name)?;
        Ok(Self {
            client_name: client_name.to_string(),
            enumerator,
            shared: InputShared::new(queue_size_limit),
            connection: None,
        })
    }

    /// A fresh client with midir's own filtering disabled; ours runs in `DeliveryState`.
    fn client(&self) -> Result<MidiInput> {
        let mut client = MidiInput::new(&self.client_name)?;
        client.ignore(Ignore::None);
        Ok(client)
    }

    fn delivery(&self) -> DeliveryState {
        DeliveryState::new(Arc::clone(&self.shared))
    }
}

fn on_message(stamp_us: u64, bytes: &[u8], state: &mut DeliveryState) {
    state.receive(stamp_us as f64 / 1_000_000.0, bytes);
}

impl NativePort for MidirInput {
    fn api(&self) -> Api {
        backend_api()
    }

    fn open_port(&mut self, index: usize, port_name: &CStr) -> Result<()> {
        if self.connection.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let client = self.client()?;
        let ports = client.ports();
        let port = ports.get(index).ok_or(Error::InvalidPort {
            index,
            count: ports.len(),
        })?;
        let target = client.port_name(port)?;

        let connection = client.connect(
            port,
            &port_name.to_string_lossy(),
            on_message,
            self.delivery(),
        )?;
        debug!("{}: connected MIDI input to '{}'", self.client_name, target);
        self.connection = Some(connection);
        Ok(())
    }

    #[cfg(unix)]
    fn open_virtual_port(&mut self, port_name: &CStr) -> Result<()> {
        use midir::os::unix::VirtualInput;

        if self.connection.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let name = port_name.to_string_lossy();
        let connection = self
            .client()?
            .create_virtual(&name, on_message, self.delivery())?;
        debug!("{}: created virtual MIDI input '{}'", self.client_name, name);
        self.connection = Some(connection);
        Ok(())
    }

    #[cfg(not(unix))]
    fn open_virtual_port(&mut self, _port_name: &CStr) -> Result<()> {
        Err(Error::VirtualUnsupported(self.api()))
    }

    fn close_port(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.shared.end_connection();
            let _ = connection.close();
            debug!("{}: closed MIDI input", self.client_name);
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

impl NativeInput for MidirInput {
    fn ignore_types(&mut self, ignore: IgnoreTypes) {
        self.shared.set_ignore_types(ignore);
    }

    fn set_callback(&mut self, deliver: DeliverFn, token: u64) -> Result<()> {
        self.shared.set_callback(deliver, token)
    }

    fn replace_callback(&mut self, deliver: DeliverFn, token: u64) -> Result<()> {
        self.shared.replace_callback(deliver, token);
        Ok(())
    }

    fn cancel_callback(&mut self) -> Result<()> {
        self.shared.cancel_callback()
    }

    fn get_message(&mut self, buf: &mut [u8]) -> Result<(usize, f64)> {
        self.shared.pop_into(buf)
    }
}

impl Drop for MidirInput {
    fn drop(&mut self) {
        self.close_port();
    }
}
