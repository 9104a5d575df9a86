use std::ffi::CStr;
use tracing::debug;

use super::bus::{self, EndpointKind};
use crate::api::Api;
use crate::error::{Error, Result};
use crate::native::{copy_port_name, NativeOutput, NativePort};

struct Link {
    endpoint: u64,
    owned: bool,
}

pub struct DummyOutput {
    client_name: String,
    link: Option<Link>,
}

impl DummyOutput {
    pub fn new(client_name: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
            link: None,
        }
    }
}

impl NativePort for DummyOutput {
    fn api(&self) -> Api {
        Api::Dummy
    }

    fn open_port(&mut self, index: usize, port_name: &CStr) -> Result<()> {
        if self.link.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let endpoint = bus::endpoint_at(EndpointKind::Destination, index)?;
        debug!(
            "{}: dummy output '{}' connected to port {}",
            self.client_name,
            port_name.to_string_lossy(),
            index
        );
        self.link = Some(Link {
            endpoint,
            owned: false,
        });
        Ok(())
    }

    fn open_virtual_port(&mut self, port_name: &CStr) -> Result<()> {
        if self.link.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let endpoint = bus::create_endpoint(&port_name.to_string_lossy(), EndpointKind::Source);
        self.link = Some(Link {
            endpoint,
            owned: true,
        });
        Ok(())
    }

    fn close_port(&mut self) {
        if let Some(link) = self.link.take() {
            if link.owned {
                bus::remove_endpoint(link.endpoint);
            }
            debug!("{}: dummy output closed", self.client_name);
        }
    }

    fn is_port_open(&self) -> bool {
        self.link.is_some()
    }

    fn port_count(&self) -> Result<usize> {
        Ok(bus::endpoint_names(EndpointKind::Destination).len())
    }

    fn port_name(&self, index: usize, buf: &mut [u8]) -> Result<usize> {
        let names = bus::endpoint_names(EndpointKind::Destination);
        let name = names.get(index).ok_or(Error::InvalidPort {
            index,
            count: names.len(),
        })?;
        Ok(copy_port_name(name, buf))
    }
}

impl NativeOutput for DummyOutput {
    fn send_message(&mut self, bytes: &[u8]) -> Result<()> {
        let link = self.link.as_ref().ok_or(Error::NotOpen)?;
        bus::publish(link.endpoint, bytes)
    }
}

impl Drop for DummyOutput {
    fn drop(&mut self) {
        self.close_port();
    }
}
