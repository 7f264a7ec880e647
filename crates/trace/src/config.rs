use std::fs;
use std::path::Path;

use kernel::MachineConfig;
use serde::{Deserialize, Serialize};

use crate::error::TraceError;

pub const DEFAULT_QUANTUM: usize = 10;
pub const DEFAULT_QUOTA: u32 = 0x40;

/// Simulation settings. Every field is optional in the TOML form.
///
/// ```toml
/// frames = 512
/// quantum = 4
/// default_quota = 0x10
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Physical frames in the machine.
    pub frames: u32,
    /// Trace lines each process runs per turn.
    pub quantum: usize,
    /// Page quota a process starts with, before any `quota` command.
    pub default_quota: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frames: MachineConfig::default().frames,
            quantum: DEFAULT_QUANTUM,
            default_quota: DEFAULT_QUOTA,
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, TraceError> {
        let text = fs::read_to_string(path).map_err(|e| TraceError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text).map_err(|e| TraceError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), TraceError> {
        if self.frames == 0 {
            return Err(TraceError::InvalidConfig("frames must be at least 1"));
        }
        if self.quantum == 0 {
            return Err(TraceError::InvalidConfig("quantum must be at least 1"));
        }
        Ok(())
    }

    pub fn machine(&self) -> MachineConfig {
        MachineConfig {
            frames: self.frames,
        }
    }
}
