//! Output session: immediate, unqueued sends.

use midiport_engine::{create_output, Api, NativeOutput};
use tracing::{debug, warn};

use crate::config::OutputConfig;
use crate::error::Result;
use crate::handle::{EngineHandle, Status};
use crate::input::SessionState;
use crate::port::{Output, Port};

pub struct OutputSession {
    handle: EngineHandle<dyn NativeOutput>,
    state: SessionState,
}

impl OutputSession {
    pub fn new() -> Result<Self> {
        Self::with_config(OutputConfig::default())
    }

    pub fn with_config(config: OutputConfig) -> Result<Self> {
        config.validate()?;
        let native = create_output(config.api, &config.client_name)?;
        let session = Self {
            handle: EngineHandle::new(native),
            state: SessionState::Created,
        };
        let api = session.handle.api()?;
        debug!("Created MIDI output on {}", api.display_name());
        Ok(session)
    }

    pub fn builder() -> OutputSessionBuilder {
        OutputSessionBuilder::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }
}

impl Port for OutputSession {
    fn open_port(&mut self, index: usize, connection_name: &str) -> Result<()> {
        self.handle.open(index, connection_name)?;
        self.state = SessionState::Opened;
        Ok(())
    }

    fn open_virtual_port(&mut self, connection_name: &str) -> Result<()> {
        self.handle.open_virtual(connection_name)?;
        self.state = SessionState::Opened;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.handle.close()?;
        self.state = SessionState::Closed;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    fn port_count(&self) -> Result<usize> {
        self.handle.port_count()
    }

    fn port_name(&self, index: usize) -> Result<String> {
        self.handle.port_name(index)
    }

    fn api(&self) -> Result<Api> {
        self.handle.api()
    }

    fn status(&self) -> Status {
        self.handle.status()
    }

    fn destroy(&mut self) {
        if self.handle.is_destroyed() {
            warn!("MIDI output destroyed twice");
            return;
        }
        self.handle.destroy();
        self.state = SessionState::Destroyed;
        debug!("Destroyed MIDI output");
    }
}

impl Output for OutputSession {
    /// Empty messages are passed through to the backend unchanged.
    fn send_message(&mut self, bytes: &[u8]) -> Result<()> {
        self.handle
            .call_mut("send_message", |native| Ok(native.send_message(bytes)?))
    }
}

impl Drop for OutputSession {
    fn drop(&mut self) {
        if !self.handle.is_destroyed() {
            self.handle.destroy();
        }
    }
}

#[derive(Default)]
pub struct OutputSessionBuilder {
    config: OutputConfig,
}

impl OutputSessionBuilder {
    pub fn api(mut self, api: Api) -> Self {
        self.config.api = api;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    pub fn build(self) -> Result<OutputSession> {
        OutputSession::with_config(self.config)
    }
}
