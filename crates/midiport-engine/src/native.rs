//! The boundary every backend implements.
//!
//! Handles are driven from a single thread at a time. Names cross the
//! boundary as NUL-terminated strings, and port names come back through a
//! caller-owned buffer: pass an empty buffer to learn the required size.

use std::ffi::CStr;

use crate::api::Api;
use crate::delivery::{DeliverFn, IgnoreTypes};
use crate::error::Result;

pub trait NativePort: Send {
    fn api(&self) -> Api;

    fn open_port(&mut self, index: usize, port_name: &CStr) -> Result<()>;

    fn open_virtual_port(&mut self, port_name: &CStr) -> Result<()>;

    /// No-op when nothing is open.
    fn close_port(&mut self);

    fn is_port_open(&self) -> bool;

    fn port_count(&self) -> Result<usize>;

    /// Returns the size needed for the name including its NUL terminator.
    /// The name is written to `buf` only when it fits.
    fn port_name(&self, index: usize, buf: &mut [u8]) -> Result<usize>;
}

pub trait NativeInput: NativePort {
    fn ignore_types(&mut self, ignore: IgnoreTypes);

    /// `token` is passed back verbatim on every delivery.
    fn set_callback(&mut self, deliver: DeliverFn, token: u64) -> Result<()>;

    /// Like `set_callback`, but swaps out an installed callback in one step
    /// instead of failing. Messages keep bypassing the queue throughout.
    fn replace_callback(&mut self, deliver: DeliverFn, token: u64) -> Result<()>;

    fn cancel_callback(&mut self) -> Result<()>;

    /// Pops the oldest queued message into `buf`. `(0, 0.0)` when empty.
    fn get_message(&mut self, buf: &mut [u8]) -> Result<(usize, f64)>;
}

pub trait NativeOutput: NativePort {
    fn send_message(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Two-call name protocol shared by the backends.
pub(crate) fn copy_port_name(name: &str, buf: &mut [u8]) -> usize {
    let bytes = name.as_bytes();
    let needed = bytes.len() + 1;
    if buf.len() >= needed {
        buf[..bytes.len()].copy_from_slice(bytes);
        buf[bytes.len()] = 0;
    }
    needed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_port_name_size_query() {
        let mut empty: [u8; 0] = [];
        assert_eq!(copy_port_name("Launchpad", &mut empty), 10);
    }

    #[test]
    fn test_copy_port_name_fits() {
        let mut buf = [0xFFu8; 12];
        let needed = copy_port_name("Launchpad", &mut buf);
        assert_eq!(needed, 10);
        assert_eq!(&buf[..10], b"Launchpad\0");
        assert_eq!(buf[10], 0xFF);
    }

    #[test]
    fn test_copy_port_name_too_small_leaves_buffer() {
        let mut buf = [0xAAu8; 4];
        assert_eq!(copy_port_name("Launchpad", &mut buf), 10);
        assert_eq!(buf, [0xAA; 4]);
    }
}
