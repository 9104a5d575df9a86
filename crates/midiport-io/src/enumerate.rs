//! Port enumeration helpers.

use serde::Serialize;

use crate::error::Result;
use crate::port::Port;

/// A port visible at enumeration time. Indices shift on hot-plug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortDescriptor {
    pub index: usize,
    pub name: String,
}

pub(crate) fn ports<P: Port + ?Sized>(port: &P) -> Result<Vec<PortDescriptor>> {
    let count = port.port_count()?;
    (0..count)
        .map(|index| {
            Ok(PortDescriptor {
                index,
                name: port.port_name(index)?,
            })
        })
        .collect()
}

pub(crate) fn find_port<P: Port + ?Sized>(port: &P, name: &str) -> Result<Option<PortDescriptor>> {
    let ports = ports(port)?;
    if let Some(exact) = ports.iter().find(|p| p.name == name) {
        return Ok(Some(exact.clone()));
    }
    Ok(ports
        .into_iter()
        .find(|p| sanitize_port_name(&p.name) == name))
}

/// Strips the numbering some backends append to port names.
///
/// ALSA names end in `" client:port"` (`"Launchpad MIDI 1 24:0"`). WinMM
/// disambiguates duplicate devices with a trailing `" N"`.
pub fn sanitize_port_name(name: &str) -> &str {
    if let Some((head, tail)) = name.rsplit_once(' ') {
        if let Some((client, port)) = tail.split_once(':') {
            if is_number(client) && is_number(port) {
                return head;
            }
        }
        if cfg!(windows) && is_number(tail) {
            return head;
        }
    }
    name
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
