//! Session configuration.

use midiport_engine::{Api, IgnoreTypes, DEFAULT_QUEUE_SIZE_LIMIT};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub const DEFAULT_INPUT_CLIENT_NAME: &str = "midiport input client";
pub const DEFAULT_OUTPUT_CLIENT_NAME: &str = "midiport output client";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Backend to open. `Unspecified` picks the first compiled backend with ports.
    pub api: Api,
    pub client_name: String,
    /// Capacity of the inbound queue, in messages.
    pub queue_size_limit: usize,
    /// Applied right after the engine handle is created.
    pub ignore: IgnoreTypes,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            api: Api::Unspecified,
            client_name: DEFAULT_INPUT_CLIENT_NAME.to_string(),
            queue_size_limit: DEFAULT_QUEUE_SIZE_LIMIT,
            ignore: IgnoreTypes::default(),
        }
    }
}

impl InputConfig {
    pub fn validate(&self) -> Result<()> {
        if self.client_name.is_empty() {
            return Err(EngineError::invalid_config("client_name must not be empty"));
        }
        if self.queue_size_limit == 0 {
            return Err(EngineError::invalid_config(
                "queue_size_limit must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub api: Api,
    pub client_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            api: Api::Unspecified,
            client_name: DEFAULT_OUTPUT_CLIENT_NAME.to_string(),
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> Result<()> {
        if self.client_name.is_empty() {
            return Err(EngineError::invalid_config("client_name must not be empty"));
        }
        Ok(())
    }
}
