//! Owned wrapper around one native engine connection.
//!
//! Every native call goes through [`EngineHandle::call`] or
//! [`EngineHandle::call_mut`], which record the outcome in the handle's
//! status before returning it.

use std::ffi::CString;

use midiport_engine::{Api, NativePort};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{EngineError, Result};

/// Outcome of the most recent native call on a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub ok: bool,
    pub message: String,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }
}

pub(crate) struct EngineHandle<N: NativePort + ?Sized> {
    native: Option<Box<N>>,
    status: Mutex<Status>,
}

impl<N: NativePort + ?Sized> EngineHandle<N> {
    pub(crate) fn new(native: Box<N>) -> Self {
        Self {
            native: Some(native),
            status: Mutex::new(Status::default()),
        }
    }

    pub(crate) fn status(&self) -> Status {
        self.status.lock().clone()
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.native.is_none()
    }

    fn record<T>(&self, op: &str, result: Result<T>) -> Result<T> {
        let mut status = self.status.lock();
        match &result {
            Ok(_) => *status = Status::default(),
            Err(e) => {
                debug!("{} failed: {}", op, e);
                *status = Status {
                    ok: false,
                    message: e.message().to_string(),
                };
            }
        }
        result
    }

    pub(crate) fn call<T>(
        &self,
        op: &str,
        f: impl FnOnce(&N) -> Result<T>,
    ) -> Result<T> {
        let result = match self.native.as_deref() {
            Some(native) => f(native),
            None => Err(EngineError::destroyed()),
        };
        self.record(op, result)
    }

    pub(crate) fn call_mut<T>(
        &mut self,
        op: &str,
        f: impl FnOnce(&mut N) -> Result<T>,
    ) -> Result<T> {
        let result = match self.native.as_deref_mut() {
            Some(native) => f(native),
            None => Err(EngineError::destroyed()),
        };
        self.record(op, result)
    }

    pub(crate) fn open(&mut self, index: usize, connection_name: &str) -> Result<()> {
        self.call_mut("open_port", |native| {
            let name = CString::new(connection_name)?;
            native.open_port(index, &name)?;
            Ok(())
        })
    }

    pub(crate) fn open_virtual(&mut self, connection_name: &str) -> Result<()> {
        self.call_mut("open_virtual_port", |native| {
            let name = CString::new(connection_name)?;
            native.open_virtual_port(&name)?;
            Ok(())
        })
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        self.call_mut("close_port", |native| {
            native.close_port();
            Ok(())
        })
    }

    pub(crate) fn is_open(&self) -> bool {
        self.native
            .as_deref()
            .map(|native| native.is_port_open())
            .unwrap_or(false)
    }

    pub(crate) fn api(&self) -> Result<Api> {
        self.call("api", |native| Ok(native.api()))
    }

    /// Always a fresh query; topology may change between calls.
    pub(crate) fn port_count(&self) -> Result<usize> {
        self.call("port_count", |native| Ok(native.port_count()?))
    }

    pub(crate) fn port_name(&self, index: usize) -> Result<String> {
        self.call("port_name", |native| {
            let mut needed = native.port_name(index, &mut [0u8; 0])?;
            loop {
                if needed == 0 {
                    return Ok(String::new());
                }
                let mut buf = vec![0u8; needed];
                let reported = native.port_name(index, &mut buf)?;
                // The name grew between the two calls.
                if reported > needed {
                    needed = reported;
                    continue;
                }
                let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
                buf.truncate(len);
                return Ok(String::from_utf8_lossy(&buf).into_owned());
            }
        })
    }

    /// Releases the native connection. Returns `false` if it was already gone;
    /// sessions report the repeat.
    pub(crate) fn destroy(&mut self) -> bool {
        match self.native.take() {
            Some(mut native) => {
                native.close_port();
                drop(native);
                *self.status.lock() = Status::default();
                true
            }
            None => false,
        }
    }
}
