//! Link configuration.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $FPGLINK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/fpglink/config.toml
//!   3. ~/.config/fpglink/config.toml
//!
//! The defaults are the wire characteristics the gateware's UART is
//! synthesized for: 115200 baud, 8 data bits, odd parity, 1 stop bit.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Serial-link and session parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Device path, e.g. /dev/ttyUSB0. Overridable per invocation.
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,

    /// Read timeout = constant + per_byte × requested length. The per-byte
    /// term keeps full 1024-byte block reads from tripping the timeout at
    /// low baud rates.
    pub read_timeout_constant_ms: u64,
    pub read_timeout_per_byte_ms: u64,
    pub write_timeout_ms: u64,

    /// Liveness probe text, echoed verbatim by the device. At most 32
    /// bytes (the Ping packet capacity).
    pub ping_text: String,

    /// Pause between session phases (link / upload / input / verify). The
    /// device needs a beat to drain its FIFOs between phases; 0 disables.
    pub settle_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            data_bits: 8,
            parity: Parity::Odd,
            stop_bits: 1,
            read_timeout_constant_ms: 50,
            read_timeout_per_byte_ms: 10,
            write_timeout_ms: 500,
            ping_text: "UART".to_string(),
            settle_ms: 1000,
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl LinkConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            LinkConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("FPGLINK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&LinkConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply FPGLINK_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("FPGLINK_PORT") {
            self.port = v;
        }
        if let Ok(v) = std::env::var("FPGLINK_BAUD_RATE") {
            if let Ok(b) = v.parse() {
                self.baud_rate = b;
            }
        }
        if let Ok(v) = std::env::var("FPGLINK_SETTLE_MS") {
            if let Ok(ms) = v.parse() {
                self.settle_ms = ms;
            }
        }
    }
}

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("fpglink")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
