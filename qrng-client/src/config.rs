//! Configuration management for QRNG sessions

use crate::backend::{BackendKind, BoardType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Session configuration
///
/// For the gateway backend `device_name` is the gateway base URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Board model
    #[serde(default)]
    pub board_type: BoardType,

    /// Device identifier (device path, index string or gateway URL)
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Backend override; the board's default backend when unset
    #[serde(default)]
    pub backend: Option<BackendKind>,

    /// API key presented to an entropy gateway
    #[serde(default)]
    pub api_key: Option<String>,

    /// Bytes to fetch per gateway request
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Gateway request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum gateway attempts per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Minimum entropy, in bits per 8-byte group, for certified output
    #[serde(default = "default_min_entropy_bits")]
    pub min_entropy_bits: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            board_type: BoardType::default(),
            device_name: default_device_name(),
            backend: None,
            api_key: None,
            chunk_size: default_chunk_size(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            min_entropy_bits: default_min_entropy_bits(),
        }
    }
}

impl ClientConfig {
    /// Load and validate configuration from `QRNG_*` environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self::load_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file, with `QRNG_*` variables on top
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::load_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `QRNG_*` environment variables without validating
    ///
    /// For callers that layer further overrides before calling
    /// [`ClientConfig::validate`].
    pub fn load_env() -> Result<Self> {
        envy::prefixed("QRNG_")
            .from_env()
            .map_err(|e| Error::Config(format!("Failed to parse environment variables: {}", e)))
    }

    /// Read a YAML file plus `QRNG_*` variables without validating
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("QRNG"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(format!("Failed to load {}: {}", path.display(), e)))
    }

    /// Backend this configuration resolves to
    pub fn backend_kind(&self) -> BackendKind {
        self.backend
            .unwrap_or_else(|| self.board_type.default_backend())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.device_name.trim().is_empty() {
            return Err(Error::Config("device_name cannot be empty".to_string()));
        }

        if self.backend_kind() == BackendKind::Gateway {
            Url::parse(&self.device_name).map_err(|e| {
                Error::Config(format!("Invalid gateway URL '{}': {}", self.device_name, e))
            })?;
        }

        if self.chunk_size == 0 || self.chunk_size > crate::MAX_REQUEST_SIZE {
            return Err(Error::Config(format!(
                "chunk_size must be between 1 and {}",
                crate::MAX_REQUEST_SIZE
            )));
        }

        if self.max_retries == 0 {
            return Err(Error::Config("max_retries must be >= 1".to_string()));
        }

        if self.min_entropy_bits > 64 {
            return Err(Error::Config(
                "min_entropy_bits cannot exceed the 64 bits of a group".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

// Default value functions
fn default_device_name() -> String {
    crate::DEFAULT_DEVICE.to_string()
}

fn default_chunk_size() -> usize {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_min_entropy_bits() -> u16 {
    48
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validation() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend_kind(), BackendKind::Device);
    }

    #[test]
    fn test_gateway_requires_url() {
        let config = ClientConfig {
            board_type: BoardType::Apextreme,
            device_name: "/dev/xdma0".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            device_name: "http://localhost:7764".to_string(),
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chunk_size_bounds() {
        let config = ClientConfig {
            chunk_size: crate::MAX_REQUEST_SIZE + 1,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let config = ClientConfig {
            board_type: BoardType::VertexA1,
            device_name: "/dev/xdma1".to_string(),
            backend: Some(BackendKind::Prng),
            min_entropy_bits: 32,
            ..ClientConfig::default()
        };

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(serde_yaml::to_string(&config).unwrap().as_bytes())
            .unwrap();

        let loaded = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.board_type, BoardType::VertexA1);
        assert_eq!(loaded.device_name, "/dev/xdma1");
        assert_eq!(loaded.backend, Some(BackendKind::Prng));
        assert_eq!(loaded.min_entropy_bits, 32);
    }

    #[test]
    fn test_partial_file_loads_unvalidated() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"board_type: APEXTREME\n").unwrap();

        // Gateway board with the default device path is incomplete
        assert!(ClientConfig::from_file(file.path()).is_err());

        let mut config = ClientConfig::load_file(file.path()).unwrap();
        assert_eq!(config.board_type, BoardType::Apextreme);
        assert_eq!(config.device_name, default_device_name());

        config.device_name = "http://127.0.0.1:7764".to_string();
        assert!(config.validate().is_ok());
    }
}
