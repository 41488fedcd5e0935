// SPDX-License-Identifier: MIT
//
// QRNG Client
// Copyright (c) 2025 QRNG Client Contributors
//
// Host-side session client for Quantum Dice style QRNG boards

//! QRNG Client Library
//!
//! Host-side session client for Quantum Dice style QRNG boards. A [`Session`]
//! binds one device backend and exposes the board API: byte streams, raw
//! entropy samples, certified 8-byte groups and scalar draws. Every call
//! records a [`Status`] that callers can poll afterwards, mirroring the
//! vendor driver's `qrng_get_status` pattern, while also returning a typed
//! [`Result`].
//!
//! # Architecture
//!
//! - `status`: closed status code set and the per-session status register
//! - `error`: unified error type, one variant per status code
//! - `backend`: device backend capability and its implementations
//! - `session`: session lifecycle and backend serialization
//! - `fetch`: buffer reads (`get`, `get_raw_ent`, `get_with_ec`)
//! - `scalar`: single value draws (`rand`, `urand`, `urand2`)
//! - `config`: environment and file based configuration
//! - `metrics`: per-session read counters and latencies
//!
//! # Buffers are never zeroed
//!
//! Reads write only the prefix the backend actually delivered. On a partial
//! read the remainder of the caller's buffer keeps its previous contents.
//!
//! ```no_run
//! use qrng_client::{BoardType, Session, Status};
//!
//! let session = Session::init_param(BoardType::VertexB1, "/dev/xdma0");
//! if session.status() != Status::Success {
//!     eprintln!("init failed: {}", session.status());
//! }
//!
//! let mut buf = vec![0u8; 1024];
//! match session.get(&mut buf) {
//!     Ok(n) => println!("read {} bytes", n),
//!     Err(e) => eprintln!("read failed: {} ({})", e, session.status()),
//! }
//! session.deinit();
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod pool;
pub mod retry;
pub mod scalar;
pub mod session;
pub mod status;

pub use backend::{BoardType, Certification, DeviceBackend};
pub use error::{Error, Result};
pub use session::{Session, SessionState};
pub use status::Status;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bytes of output per certified group
pub const GROUP_SIZE: usize = 8;

/// Maximum single network request size
pub const MAX_REQUEST_SIZE: usize = 65_536; // 64 KiB

/// Default network fetch chunk size (1 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default device identifier for the platform
#[cfg(unix)]
pub const DEFAULT_DEVICE: &str = "/dev/xdma0";

/// Default device identifier for the platform
#[cfg(not(unix))]
pub const DEFAULT_DEVICE: &str = "0";
