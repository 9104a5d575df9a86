use std::ffi::CStr;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::debug;

use super::bus::{self, EndpointKind};
use crate::api::Api;
use crate::delivery::{DeliverFn, DeliveryState, IgnoreTypes, InputShared};
use crate::error::{Error, Result};
use crate::native::{copy_port_name, NativeInput, NativePort};

struct Link {
    endpoint: u64,
    subscriber: u64,
    /// Virtual ports own their endpoint and retire it on close.
    owned: bool,
}

pub struct DummyInput {
    client_name: String,
    shared: Arc<InputShared>,
    link: Option<Link>,
}

impl DummyInput {
    pub fn new(client_name: &str, queue_size_limit: usize) -> Self {
        Self {
            client_name: client_name.to_string(),
            shared: InputShared::new(queue_size_limit),
            link: None,
        }
    }

    fn attach(&mut self, endpoint: u64, owned: bool, port_name: &str) -> Result<()> {
        let (subscriber, rx) = bus::subscribe(endpoint)?;
        let mut state = DeliveryState::new(Arc::clone(&self.shared));
        let epoch = Instant::now();

        let spawned = thread::Builder::new()
            .name("midiport-dummy-input".to_string())
            .spawn(move || {
                for packet in rx.iter() {
                    if !state.is_current() {
                        break;
                    }
                    let stamp = packet.sent.saturating_duration_since(epoch).as_secs_f64();
                    state.receive(stamp, &packet.bytes);
                }
            });

        if let Err(e) = spawned {
            bus::unsubscribe(endpoint, subscriber);
            if owned {
                bus::remove_endpoint(endpoint);
            }
            return Err(Error::Thread(e.to_string()));
        }

        debug!(
            "{}: dummy input connected to '{}'",
            self.client_name, port_name
        );
        self.link = Some(Link {
            endpoint,
            subscriber,
            owned,
        });
        Ok(())
    }
}

impl NativePort for DummyInput {
    fn api(&self) -> Api {
        Api::Dummy
    }

    fn open_port(&mut self, index: usize, port_name: &CStr) -> Result<()> {
        if self.link.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let endpoint = bus::endpoint_at(EndpointKind::Source, index)?;
        self.attach(endpoint, false, &port_name.to_string_lossy())
    }

    fn open_virtual_port(&mut self, port_name: &CStr) -> Result<()> {
        if self.link.is_some() {
            return Err(Error::AlreadyOpen);
        }
        let name = port_name.to_string_lossy();
        let endpoint = bus::create_endpoint(&name, EndpointKind::Destination);
        self.attach(endpoint, true, &name)
    }

    fn close_port(&mut self) {
        if let Some(link) = self.link.take() {
            self.shared.end_connection();
            bus::unsubscribe(link.endpoint, link.subscriber);
            if link.owned {
                bus::remove_endpoint(link.endpoint);
            }
            debug!("{}: dummy input closed", self.client_name);
        }
    }

    fn is_port_open(&self) -> bool {
        self.link.is_some()
    }

    fn port_count(&self) -> Result<usize> {
        Ok(bus::endpoint_names(EndpointKind::Source).len())
    }

    fn port_name(&self, index: usize, buf: &mut [u8]) -> Result<usize> {
        let names = bus::endpoint_names(EndpointKind::Source);
        let name = names.get(index).ok_or(Error::InvalidPort {
            index,
            count: names.len(),
        })?;
        Ok(copy_port_name(name, buf))
    }
}

impl NativeInput for DummyInput {
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

impl Drop for DummyInput {
    fn drop(&mut self) {
        self.close_port();
    }
}
