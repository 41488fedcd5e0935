// SPDX-License-Identifier: MIT
//
// QRNG Client
// Copyright (c) 2025 QRNG Client Contributors
//
// Host-side session client for Quantum Dice style QRNG boards

//! Device backends
//!
//! A [`DeviceBackend`] is the opaque provider of entropy behind a session. The
//! session only ever talks to this trait, so hardware, network appliances,
//! software generators and test doubles are interchangeable.
//!
//! Short counts are not errors at this level: a backend returns how many
//! elements it wrote and the session turns a short count into
//! [`Status::IncompleteData`](crate::Status::IncompleteData). Backends must
//! only write the prefix they report.

pub mod device;
pub mod gateway;
pub mod mock;
pub mod prng;

use crate::{config::ClientConfig, Error, Result, GROUP_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use device::DeviceFileBackend;
pub use gateway::{GatewayBackend, GatewaySettings};
pub use mock::{MockBackend, MockCounters, MockFailure};
pub use prng::PrngBackend;

/// QRNG board models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardType {
    VertexA1,
    VertexB1,
    Apextreme,
}

impl BoardType {
    /// Product name as used by the vendor tooling
    pub fn product_name(self) -> &'static str {
        match self {
            BoardType::VertexA1 => "VERTEX_A1",
            BoardType::VertexB1 => "VERTEX_B1",
            BoardType::Apextreme => "APEXTREME",
        }
    }

    /// Backend used when none is configured explicitly
    ///
    /// Vertex boards are PCIe cards exposed as character devices; the
    /// Apextreme is a network appliance.
    pub fn default_backend(self) -> BackendKind {
        match self {
            BoardType::VertexA1 | BoardType::VertexB1 => BackendKind::Device,
            BoardType::Apextreme => BackendKind::Gateway,
        }
    }
}

impl Default for BoardType {
    fn default() -> Self {
        Self::VertexB1
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.product_name())
    }
}

impl FromStr for BoardType {
    type Err = Error;

    /// Parse a product name (case-insensitive, `-` or `_` separated)
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "VERTEX_A1" | "VERTEXA1" => Ok(Self::VertexA1),
            "VERTEX_B1" | "VERTEXB1" => Ok(Self::VertexB1),
            "APEXTREME" => Ok(Self::Apextreme),
            _ => Err(Error::Config(format!("Product '{}' does not exist", s))),
        }
    }
}

/// Backend implementation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Character device (`/dev/xdma0` style path)
    Device,
    /// HTTP entropy gateway in front of a network appliance
    Gateway,
    /// Software pseudo-random generator
    Prng,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "device" => Ok(Self::Device),
            "gateway" | "net" | "network" => Ok(Self::Gateway),
            "prng" | "software" => Ok(Self::Prng),
            _ => Err(Error::Config(format!("Unknown backend '{}'", s))),
        }
    }
}

/// Certification attached to one 8-byte output group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Certification {
    /// Minimum entropy of the raw input, in bits
    pub entropy_bits: u16,
    /// Certification value in `[0, 1]`
    pub value: f32,
}

/// Opaque provider of entropy
pub trait DeviceBackend: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Bind to the device. `device` is opaque to the session.
    fn open(&mut self, board: BoardType, device: &str) -> Result<()>;

    /// Fill a prefix of `buf` with output bytes, returning its length
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Fill a prefix of `buf` with raw 16-bit entropy samples
    fn read_raw(&mut self, buf: &mut [u16]) -> Result<usize>;

    /// Produce one certified group into `group`
    ///
    /// Fails with [`Error::InsufficientEntropy`] when the group cannot be
    /// certified; `group` contents are unspecified in that case.
    fn read_certified(&mut self, group: &mut [u8; GROUP_SIZE]) -> Result<Certification>;

    /// Release the device
    fn close(&mut self);
}

/// Build the backend a board should use under `config`
pub fn connect(board: BoardType, config: &ClientConfig) -> Result<Box<dyn DeviceBackend>> {
    let kind = config.backend.unwrap_or_else(|| board.default_backend());
    let backend: Box<dyn DeviceBackend> = match kind {
        BackendKind::Device => Box::new(DeviceFileBackend::new(config.min_entropy_bits)),
        BackendKind::Gateway => Box::new(GatewayBackend::new(GatewaySettings::from(config))?),
        BackendKind::Prng => Box::new(PrngBackend::from_entropy()),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_from_product_name() {
        assert_eq!("VERTEX_A1".parse::<BoardType>().unwrap(), BoardType::VertexA1);
        assert_eq!("vertex-b1".parse::<BoardType>().unwrap(), BoardType::VertexB1);
        assert_eq!("ApeXtreme".parse::<BoardType>().unwrap(), BoardType::Apextreme);
        assert!("non-existent-product".parse::<BoardType>().is_err());
    }

    #[test]
    fn test_default_backend() {
        assert_eq!(BoardType::VertexB1.default_backend(), BackendKind::Device);
        assert_eq!(BoardType::Apextreme.default_backend(), BackendKind::Gateway);
        assert_eq!("net".parse::<BackendKind>().unwrap(), BackendKind::Gateway);
    }

    #[test]
    fn test_connect_prng() {
        let config = ClientConfig {
            backend: Some(BackendKind::Prng),
            ..ClientConfig::default()
        };
        let backend = connect(BoardType::VertexA1, &config).unwrap();
        assert_eq!(backend.name(), "prng");
    }
}
