//! Process-wide loopback bus behind the dummy backend.
//!
//! Virtual outputs publish as `Source` endpoints (visible to inputs),
//! virtual inputs listen on `Destination` endpoints (visible to outputs).

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::time::Instant;
use tracing::trace;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndpointKind {
    Source,
    Destination,
}

#[derive(Debug)]
pub(crate) struct Packet {
    pub bytes: Vec<u8>,
    pub sent: Instant,
}

struct Subscriber {
    id: u64,
    tx: Sender<Packet>,
}

struct Endpoint {
    id: u64,
    name: String,
    kind: EndpointKind,
    subscribers: Vec<Subscriber>,
}

struct Bus {
    next_id: u64,
    endpoints: Vec<Endpoint>,
}

static BUS: Mutex<Bus> = parking_lot::const_mutex(Bus {
    next_id: 1,
    endpoints: Vec::new(),
});

fn next_id(bus: &mut Bus) -> u64 {
    let id = bus.next_id;
    bus.next_id += 1;
    id
}

pub(crate) fn create_endpoint(name: &str, kind: EndpointKind) -> u64 {
    let mut bus = BUS.lock();
    let id = next_id(&mut bus);
    bus.endpoints.push(Endpoint {
        id,
        name: name.to_string(),
        kind,
        subscribers: Vec::new(),
    });
    trace!("dummy bus: created {:?} endpoint {} ({})", kind, id, name);
    id
}

/// Drops every subscriber sender, which ends their delivery threads.
pub(crate) fn remove_endpoint(id: u64) {
    let mut bus = BUS.lock();
    bus.endpoints.retain(|endpoint| endpoint.id != id);
    trace!("dummy bus: removed endpoint {}", id);
}

pub(crate) fn endpoint_names(kind: EndpointKind) -> Vec<String> {
    BUS.lock()
        .endpoints
        .iter()
        .filter(|endpoint| endpoint.kind == kind)
        .map(|endpoint| endpoint.name.clone())
        .collect()
}

pub(crate) fn endpoint_at(kind: EndpointKind, index: usize) -> Result<u64> {
    let bus = BUS.lock();
    let mut matching = bus.endpoints.iter().filter(|e| e.kind == kind);
    let count = matching.clone().count();
    matching
        .nth(index)
        .map(|endpoint| endpoint.id)
        .ok_or(Error::InvalidPort { index, count })
}

pub(crate) fn subscribe(endpoint_id: u64) -> Result<(u64, Receiver<Packet>)> {
    let mut bus = BUS.lock();
    let id = next_id(&mut bus);
    let endpoint = bus
        .endpoints
        .iter_mut()
        .find(|endpoint| endpoint.id == endpoint_id)
        .ok_or_else(|| Error::Driver(format!("dummy endpoint {} no longer exists", endpoint_id)))?;
    let (tx, rx) = unbounded();
    endpoint.subscribers.push(Subscriber { id, tx });
    Ok((id, rx))
}

pub(crate) fn unsubscribe(endpoint_id: u64, subscriber_id: u64) {
    let mut bus = BUS.lock();
    if let Some(endpoint) = bus.endpoints.iter_mut().find(|e| e.id == endpoint_id) {
        endpoint.subscribers.retain(|sub| sub.id != subscriber_id);
    }
}

pub(crate) fn publish(endpoint_id: u64, bytes: &[u8]) -> Result<()> {
    let sent = Instant::now();
    let mut bus = BUS.lock();
    let endpoint = bus
        .endpoints
        .iter_mut()
        .find(|endpoint| endpoint.id == endpoint_id)
        .ok_or_else(|| Error::Driver(format!("dummy endpoint {} no longer exists", endpoint_id)))?;

    // Receivers that went away without unsubscribing are pruned here.
    endpoint.subscribers.retain(|sub| {
        sub.tx
            .send(Packet {
                bytes: bytes.to_vec(),
                sent,
            })
            .is_ok()
    });
    Ok(())
}
