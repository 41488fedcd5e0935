// SPDX-License-Identifier: MIT
//
// QRNG Client
// Copyright (c) 2025 QRNG Client Contributors
//
// Host-side session client for Quantum Dice style QRNG boards

//! Error types for the QRNG client
//!
//! Provides a unified error taxonomy using `thiserror`. Every variant maps to
//! exactly one driver [`Status`] code via [`Error::status`].

use crate::status::Status;

pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for QRNG operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend delivered data that could not be decoded
    #[error("Wrong data format: {0}")]
    WrongDataFormat(String),

    /// Internal channel between client and backend failed
    #[error("Internal channel error: {0}")]
    InternalChannel(String),

    /// Network retry budget exhausted
    #[error("Network retries exceeded after {attempts} attempts")]
    NetRetriesExceeded { attempts: u32 },

    /// Network request timed out on every attempt
    #[error("Network timeout")]
    NetTimeout,

    /// Certified reads need whole 8-byte groups
    #[error("Size {0} is not a multiple of 8")]
    MultipleOf8Required(usize),

    /// Backend could not certify a group
    #[error("Insufficient entropy in group {group}: {bits} bits")]
    InsufficientEntropy { group: usize, bits: u16 },

    /// Internal allocation or buffer bookkeeping failed
    #[error("Internal memory error: {0}")]
    InternalMemory(String),

    /// Backend resources could not be set up
    #[error("Internal initialization error: {0}")]
    InternalInit(String),

    /// Device read failed
    #[error("Error reading device: {0}")]
    ReadingDevice(String),

    /// Fewer elements than requested were delivered
    #[error("Incomplete data: read {read} of {requested}")]
    IncompleteData { read: usize, requested: usize },

    /// Device exists but could not be opened
    #[error("Error opening device: {0}")]
    OpeningDevice(String),

    /// Session is not bound to a backend
    #[error("QRNG is not initialized")]
    NotInitialized,

    /// Session is already bound to a backend
    #[error("QRNG is already initialized")]
    AlreadyInitialized,

    /// Missing or undersized caller buffer
    #[error("Null or empty buffer: {0}")]
    NullPtr(&'static str),

    /// Device identifier does not resolve to a device
    #[error("No device found: {0}")]
    NoDeviceFound(String),

    /// Transient failure worth retrying (HTTP 429, 5xx)
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Configuration validation failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Status code recorded for this error
    pub fn status(&self) -> Status {
        match self {
            Error::WrongDataFormat(_) => Status::WrongDataFormat,
            Error::InternalChannel(_) => Status::InternalChError,
            Error::NetRetriesExceeded { .. } | Error::Transient(_) => Status::NetRetriesExceeded,
            Error::NetTimeout => Status::NetTimeout,
            Error::Network(e) if e.is_timeout() => Status::NetTimeout,
            Error::Network(_) => Status::NetRetriesExceeded,
            Error::MultipleOf8Required(_) => Status::MultipleOf8Required,
            Error::InsufficientEntropy { .. } => Status::InsufficientEntropy,
            Error::InternalMemory(_) => Status::InternalMemory,
            Error::InternalInit(_) => Status::InternalInit,
            Error::ReadingDevice(_) | Error::Io(_) => Status::ReadingDevice,
            Error::IncompleteData { .. } => Status::IncompleteData,
            Error::OpeningDevice(_) | Error::Config(_) => Status::OpeningDevice,
            Error::NotInitialized => Status::NotInitialized,
            Error::AlreadyInitialized => Status::AlreadyInitialized,
            Error::NullPtr(_) => Status::NullPtr,
            Error::NoDeviceFound(_) => Status::NoDeviceFound,
        }
    }

    /// Check if error is transient and retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Transient(_) | Error::NetTimeout
        )
    }

    /// Check if error is a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::NetTimeout => true,
            Error::Network(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Recoverable errors leave the session usable for further calls
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Error::NoDeviceFound(_)
                | Error::OpeningDevice(_)
                | Error::InternalInit(_)
                | Error::NotInitialized
        )
    }
}
