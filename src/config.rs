//! Environment-driven configuration.
//!
//! The backend is chosen here, explicitly, at process start; there is no
//! runtime registry of store constructors. Connection settings exist for
//! remote backends and are carried even by the in-memory adapter so a
//! deployment can switch backends through configuration alone.

use crate::port::MemoryGraph;
use std::env;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported graph backend {0:?}")]
    UnknownBackend(String),
}

/// Available graph backends. A bolt/Neo4j adapter would be a second
/// variant here with its own `PropertyGraphPort` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Memory,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Graph store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            uri: "bolt://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
        }
    }
}

impl StoreConfig {
    /// Read configuration from `GRAPH_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let backend = match env::var("GRAPH_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };
        Ok(Self {
            backend,
            uri: env::var("GRAPH_URI").unwrap_or(defaults.uri),
            username: env::var("GRAPH_USERNAME").unwrap_or(defaults.username),
            password: env::var("GRAPH_PASSWORD").unwrap_or(defaults.password),
            database: env::var("GRAPH_DATABASE").unwrap_or(defaults.database),
        })
    }

    /// Open the configured backend.
    pub fn open(&self) -> Result<MemoryGraph, ConfigError> {
        match self.backend {
            BackendKind::Memory => {
                info!("opening in-memory graph backend");
                Ok(MemoryGraph::new())
            }
        }
    }
}
