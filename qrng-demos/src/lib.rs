// SPDX-License-Identifier: MIT
//
// QRNG Client
// Copyright (c) 2025 QRNG Client Contributors
//
// Host-side session client for Quantum Dice style QRNG boards

//! Shared plumbing for the QRNG demo programs
//!
//! Every demo accepts the same session flags (`--board`, `--device`,
//! `--backend`, `--config`) and logging flags (`--log-level`, `--json-logs`).

use anyhow::{Context, Result};
use clap::Args;
use qrng_client::backend::BackendKind;
use qrng_client::config::ClientConfig;
use qrng_client::{BoardType, Session, Status};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// One mebibyte
pub const MIB: usize = 1 << 20;

/// Logging flags
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl LogArgs {
    /// Install the global tracing subscriber, writing to stderr
    ///
    /// `RUST_LOG` takes precedence over `--log-level`.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_writer(std::io::stderr);

        if self.json_logs {
            builder.json().init();
        } else {
            builder.init();
        }
    }
}

/// Session selection flags
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Board model (VERTEX_A1, VERTEX_B1, APEXTREME), VERTEX_B1 if unset
    #[arg(long)]
    pub board: Option<BoardType>,

    /// Device path, index or gateway URL
    #[arg(long)]
    pub device: Option<String>,

    /// Backend override (device, gateway, prng)
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl SessionArgs {
    /// Merge the file (or `QRNG_*` environment) with command-line flags
    ///
    /// Flags override loaded values. Nothing is validated yet.
    pub fn layered_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => ClientConfig::load_env()
                .context("Failed to load configuration from environment")?,
        };

        if let Some(board) = self.board {
            config.board_type = board;
        }
        if let Some(device) = &self.device {
            config.device_name = device.clone();
        }
        if self.backend.is_some() {
            config.backend = self.backend;
        }
        Ok(config)
    }

    /// Resolve and validate the client configuration
    pub fn client_config(&self) -> Result<ClientConfig> {
        let config = self.layered_config()?;
        config
            .validate()
            .context("Invalid session configuration")?;
        Ok(config)
    }

    /// Create and open a session; check [`Session::status`] for the outcome
    pub fn open_session(&self) -> Result<Session> {
        let config = self.client_config()?;
        debug!(board = %config.board_type, device = %config.device_name, "Opening session");
        let session = Session::from_config(&config);
        info!(
            "Session on {} ({:?} backend): {}",
            session.device(),
            config.backend_kind(),
            session.status()
        );
        Ok(session)
    }
}

/// Table cell rendering for [`format_data_stream`]
pub trait Cell {
    fn cell(&self) -> String;
}

impl Cell for u8 {
    fn cell(&self) -> String {
        format!("{:02x}", self)
    }
}

impl Cell for u16 {
    fn cell(&self) -> String {
        format!("{:04x}", self)
    }
}

impl Cell for f32 {
    fn cell(&self) -> String {
        format!("{:4.2}", self)
    }
}

/// Render the first `cols * rows` values of `data` as a table
pub fn format_data_stream<T: Cell>(data: &[T], cols: usize, rows: usize) -> String {
    let mut out = String::new();
    let cols = cols.max(1);
    for row in data.chunks(cols).take(rows) {
        out.push('\t');
        for value in row {
            let _ = write!(out, " {}", value.cell());
        }
        out.push('\n');
    }
    out
}

/// Print a preview of `data` with a size header
pub fn print_data_stream<T: Cell>(data: &[T], cols: usize, rows: usize) {
    println!("\t Print data, size: {}, row: {}, col: {}", data.len(), cols, rows);
    print!("{}", format_data_stream(data, cols, rows));
}

/// Status code legend, one `code description` line per status
pub fn status_legend() -> String {
    let mut out = String::from("Status description:\n");
    for status in Status::ALL.iter().rev() {
        let _ = writeln!(out, "{:>4} {}", status.code(), status.description());
    }
    out
}
