//! Native MIDI engine: backend selection, port connections, input
//! filtering and delivery.
//!
//! Every backend implements [`NativeInput`] / [`NativeOutput`]. Inbound
//! messages pass through the same pipeline regardless of backend: ignore
//! filter, delta timestamp, then either the registered [`DeliverFn`] or a
//! bounded queue drained with [`NativeInput::get_message`].
//!
//! ```no_run
//! use midiport_engine::{create_output, Api};
//!
//! let mut out = create_output(Api::Unspecified, "example")?;
//! if out.port_count()? > 0 {
//!     out.open_port(0, c"example out")?;
//!     out.send_message(&[0x90, 60, 100])?;
//! }
//! # Ok::<(), midiport_engine::Error>(())
//! ```

mod api;
mod delivery;
pub mod dummy;
mod error;
#[cfg(feature = "midir")]
pub mod midir_backend;
mod native;

pub use api::{compiled_api_by_name, compiled_apis, version, Api};
pub use delivery::{DeliverFn, IgnoreTypes, DEFAULT_QUEUE_SIZE_LIMIT, MAX_MESSAGE_SIZE};
pub use error::{Error, Result};
pub use native::{NativeInput, NativeOutput, NativePort};

use tracing::debug;

/// Creates an input handle on `api`.
///
/// `Api::Unspecified` walks [`compiled_apis`] and keeps the first backend
/// reporting at least one port. When none do, the first backend that
/// initialised is used.
pub fn create_input(
    api: Api,
    client_name: &str,
    queue_size_limit: usize,
) -> Result<Box<dyn NativeInput>> {
    match api {
        Api::Unspecified => search(|candidate| open_input(candidate, client_name, queue_size_limit)),
        api => open_input(api, client_name, queue_size_limit),
    }
}

/// Creates an output handle on `api`. See [`create_input`] for `Unspecified`.
pub fn create_output(api: Api, client_name: &str) -> Result<Box<dyn NativeOutput>> {
    match api {
        Api::Unspecified => search(|candidate| open_output(candidate, client_name)),
        api => open_output(api, client_name),
    }
}

fn open_input(api: Api, client_name: &str, queue_size_limit: usize) -> Result<Box<dyn NativeInput>> {
    match api {
        Api::Dummy => Ok(Box::new(dummy::DummyInput::new(client_name, queue_size_limit))),
        #[cfg(feature = "midir")]
        api if crate::api::NATIVE_API == Some(api) => Ok(Box::new(midir_backend::MidirInput::new(
            client_name,
            queue_size_limit,
        )?)),
        api => Err(Error::ApiUnavailable(api)),
    }
}

fn open_output(api: Api, client_name: &str) -> Result<Box<dyn NativeOutput>> {
    match api {
        Api::Dummy => Ok(Box::new(dummy::DummyOutput::new(client_name))),
        #[cfg(feature = "midir")]
        api if crate::api::NATIVE_API == Some(api) => {
            Ok(Box::new(midir_backend::MidirOutput::new(client_name)?))
        }
        api => Err(Error::ApiUnavailable(api)),
    }
}

fn search<P, F>(mut open: F) -> Result<Box<P>>
where
    P: NativePort + ?Sized,
    F: FnMut(Api) -> Result<Box<P>>,
{
    let mut fallback = None;
    let mut last_error = None;

    for candidate in compiled_apis() {
        match open(candidate) {
            Ok(port) => {
                if port.port_count().unwrap_or(0) > 0 {
                    debug!("Selected {} backend", candidate.display_name());
                    return Ok(port);
                }
                if fallback.is_none() {
                    fallback = Some(port);
                }
            }
            Err(e) => {
                debug!("{} backend unavailable: {}", candidate.display_name(), e);
                last_error = Some(e);
            }
        }
    }

    match (fallback, last_error) {
        (Some(port), _) => Ok(port),
        (None, Some(e)) => Err(e),
        (None, None) => Err(Error::ApiUnavailable(Api::Unspecified)),
    }
}
