//! Engine configuration loading.
//!
//! TOML is the sole config source; the only flag override is the bind
//! address.  Default config path: `/etc/scriptlink/engine.toml`.  Every
//! field is optional — the defaults produce a runnable engine on port
//! 7777 with a 4-worker pool and a 10,000-event retention cap.
//!
//! The frame size limit is part of the wire contract and deliberately
//! not configurable here.

use crate::bus::DEFAULT_MAX_EVENTS_KEPT;
use crate::server::DEFAULT_POOL_SIZE;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/scriptlink/engine.toml";
pub const DEFAULT_BIND: &str = "0.0.0.0:7777";

// ---------------------------------------------------------------------------
// Validated config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub schema_version: u32,
    pub server: ServerConfig,
    pub bus: BusConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub pool_size: usize,
}

#[derive(Debug, Clone)]
pub struct BusConfig {
    pub max_events_kept: usize,
    /// Heartbeat emission interval in milliseconds; 0 disables it.
    pub heartbeat_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            schema_version: 1,
            server: ServerConfig {
                bind: DEFAULT_BIND.to_owned(),
                pool_size: DEFAULT_POOL_SIZE,
            },
            bus: BusConfig {
                max_events_kept: DEFAULT_MAX_EVENTS_KEPT,
                heartbeat_ms: 0,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Raw TOML deserialization types (with Option for optional fields)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    schema_version: Option<u32>,
    server: Option<RawServerConfig>,
    bus: Option<RawBusConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct RawServerConfig {
    bind: Option<String>,
    pool_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBusConfig {
    max_events_kept: Option<usize>,
    heartbeat_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unsupported schema_version {0}")]
    SchemaVersion(u32),
    #[error("server.pool_size must be at least 1")]
    PoolSize,
    #[error("bus.max_events_kept must be at least 1")]
    Retention,
}

pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<EngineConfig, ConfigError> {
    validate(toml::from_str(text)?)
}

fn validate(raw: RawConfig) -> Result<EngineConfig, ConfigError> {
    let schema_version = raw.schema_version.unwrap_or(1);
    if schema_version != 1 {
        return Err(ConfigError::SchemaVersion(schema_version));
    }
    let server = raw.server.unwrap_or_default();
    let bus = raw.bus.unwrap_or_default();

    let pool_size = server.pool_size.unwrap_or(DEFAULT_POOL_SIZE);
    if pool_size == 0 {
        return Err(ConfigError::PoolSize);
    }
    let max_events_kept = bus.max_events_kept.unwrap_or(DEFAULT_MAX_EVENTS_KEPT);
    if max_events_kept == 0 {
        return Err(ConfigError::Retention);
    }

    Ok(EngineConfig {
        schema_version,
        server: ServerConfig {
            bind: server.bind.unwrap_or_else(|| DEFAULT_BIND.to_owned()),
            pool_size,
        },
        bus: BusConfig {
            max_events_kept,
            heartbeat_ms: bus.heartbeat_ms.unwrap_or(0),
        },
    })
}
