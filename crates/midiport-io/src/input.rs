//! Input session: one engine handle configured for input.
//!
//! Messages reach the application either by polling [`Input::message`] or
//! through a handler installed with [`Input::set_callback`], never both.
//! Handlers are held by the process-wide [`CallbackRegistry`]; the engine
//! only ever sees the registration token.

use midiport_engine::{create_input, Api, IgnoreTypes, NativeInput, MAX_MESSAGE_SIZE};
use tracing::{debug, warn};

use crate::config::InputConfig;
use crate::error::Result;
use crate::handle::{EngineHandle, Status};
use crate::message::MidiMessage;
use crate::port::{Input, Port};
use crate::registry::{deliver, CallbackRegistry, CallbackToken, Handler, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Opened,
    Closed,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Unset,
    Queued,
    Callback,
}

pub struct InputSession {
    id: SessionId,
    handle: EngineHandle<dyn NativeInput>,
    state: SessionState,
    mode: DeliveryMode,
    token: Option<CallbackToken>,
    buffer: Vec<u8>,
}

impl InputSession {
    /// Opens an engine handle with the default [`InputConfig`].
    pub fn new() -> Result<Self> {
        Self::with_config(InputConfig::default())
    }

    pub fn with_config(config: InputConfig) -> Result<Self> {
        config.validate()?;
        let native = create_input(config.api, &config.client_name, config.queue_size_limit)?;
        Self::from_native(native, config.ignore)
    }

    pub(crate) fn from_native(native: Box<dyn NativeInput>, ignore: IgnoreTypes) -> Result<Self> {
        let mut session = Self {
            id: SessionId::next(),
            handle: EngineHandle::new(native),
            state: SessionState::Created,
            mode: DeliveryMode::Unset,
            token: None,
            buffer: vec![0; MAX_MESSAGE_SIZE],
        };
        session.ignore_types(ignore)?;
        let api = session.handle.api()?;
        debug!("Created MIDI input {} on {}", session.id, api.display_name());
        Ok(session)
    }

    pub fn builder() -> InputSessionBuilder {
        InputSessionBuilder::default()
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Token of the installed handler, if any.
    pub fn callback_token(&self) -> Option<CallbackToken> {
        self.token
    }

    /// Polls until the queue is empty.
    pub fn drain(&mut self) -> Result<Vec<MidiMessage>> {
        let mut messages = Vec::new();
        loop {
            let message = self.message()?;
            if message.is_empty() {
                return Ok(messages);
            }
            messages.push(message);
        }
    }

    /// Unregisters first so no delivery reaches a handler past this point,
    /// then tells the engine to stop pushing.
    fn disarm(&mut self) -> Result<()> {
        CallbackRegistry::global().unregister(self.id);
        if self.token.take().is_some() {
            // Back to polling even if the engine call below fails.
            self.mode = DeliveryMode::Queued;
            self.handle
                .call_mut("cancel_callback", |native| Ok(native.cancel_callback()?))?;
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Err(e) = self.disarm() {
            debug!("{}: cancel during teardown failed: {}", self.id, e);
        }
        if self.handle.destroy() {
            debug!("Destroyed MIDI input {}", self.id);
        }
        self.state = SessionState::Destroyed;
        self.mode = DeliveryMode::Unset;
    }
}

impl Port for InputSession {
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
        self.disarm()?;
        self.handle.close()?;
        self.state = SessionState::Closed;
        self.mode = DeliveryMode::Unset;
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
            warn!("MIDI input {} destroyed twice", self.id);
            return;
        }
        self.release();
    }
}

impl Input for InputSession {
    fn ignore_types(&mut self, ignore: IgnoreTypes) -> Result<()> {
        self.handle.call_mut("ignore_types", |native| {
            native.ignore_types(ignore);
            Ok(())
        })
    }

    /// An installed handler is swapped out in place: deliveries go to the old
    /// handler or the new one, never to the queue.
    fn set_callback(&mut self, handler: Handler) -> Result<()> {
        let registry = CallbackRegistry::global();
        let token = registry.register(self.id, handler);
        let installed = self.handle.call_mut("set_callback", |native| {
            Ok(native.replace_callback(deliver, token.into_raw())?)
        });
        if let Err(e) = installed {
            registry.release(token);
            return Err(e);
        }

        // The engine now carries the new token; the old one can only miss.
        if let Some(previous) = self.token.replace(token) {
            registry.release(previous);
        }
        self.mode = DeliveryMode::Callback;
        Ok(())
    }

    fn cancel_callback(&mut self) -> Result<()> {
        if self.token.is_none() {
            warn!("{}: no callback function was set", self.id);
            return Ok(());
        }
        self.disarm()
    }

    fn message(&mut self) -> Result<MidiMessage> {
        if self.mode == DeliveryMode::Callback {
            warn!("{}: a user callback is currently set for this port", self.id);
            return Ok(MidiMessage::empty());
        }
        let buffer = &mut self.buffer;
        let (size, delta) = self
            .handle
            .call_mut("get_message", |native| Ok(native.get_message(buffer)?))?;
        self.mode = DeliveryMode::Queued;
        Ok(MidiMessage::new(self.buffer[..size].to_vec(), delta))
    }
}

impl Drop for InputSession {
    fn drop(&mut self) {
        if !self.handle.is_destroyed() {
            self.release();
        }
    }
}

#[derive(Default)]
pub struct InputSessionBuilder {
    config: InputConfig,
}

impl InputSessionBuilder {
    pub fn api(mut self, api: Api) -> Self {
        self.config.api = api;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    pub fn queue_size_limit(mut self, limit: usize) -> Self {
        self.config.queue_size_limit = limit;
        self
    }

    pub fn ignore(mut self, ignore: IgnoreTypes) -> Self {
        self.config.ignore = ignore;
        self
    }

    pub fn build(self) -> Result<InputSession> {
        InputSession::with_config(self.config)
    }
}
