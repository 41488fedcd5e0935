// SPDX-License-Identifier: MIT
//
// QRNG Client
// Copyright (c) 2025 QRNG Client Contributors
//
// Host-side session client for Quantum Dice style QRNG boards

//! Status codes and the per-session status register
//!
//! The board API reports the outcome of every call through a status code that
//! the caller polls afterwards. Codes are negative for errors and zero for
//! success. The numeric values are part of the contract and must not change.

use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

/// Outcome of the last API call on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    WrongDataFormat = -16,
    InternalChError = -15,
    NetRetriesExceeded = -14,
    NetTimeout = -13,
    MultipleOf8Required = -11,
    InsufficientEntropy = -10,
    InternalMemory = -9,
    InternalInit = -8,
    ReadingDevice = -7,
    IncompleteData = -6,
    OpeningDevice = -5,
    NotInitialized = -4,
    AlreadyInitialized = -3,
    NullPtr = -2,
    NoDeviceFound = -1,
    Success = 0,
}

impl Status {
    /// Every status code, most severe first
    pub const ALL: [Status; 16] = [
        Status::WrongDataFormat,
        Status::InternalChError,
        Status::NetRetriesExceeded,
        Status::NetTimeout,
        Status::MultipleOf8Required,
        Status::InsufficientEntropy,
        Status::InternalMemory,
        Status::InternalInit,
        Status::ReadingDevice,
        Status::IncompleteData,
        Status::OpeningDevice,
        Status::NotInitialized,
        Status::AlreadyInitialized,
        Status::NullPtr,
        Status::NoDeviceFound,
        Status::Success,
    ];

    /// Numeric code as reported by the driver
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Driver-style constant name
    pub fn name(self) -> &'static str {
        match self {
            Status::WrongDataFormat => "WRONG_DATA_FORMAT",
            Status::InternalChError => "INTERNAL_CH_ERROR",
            Status::NetRetriesExceeded => "NET_RETRIES_EXCEEDED",
            Status::NetTimeout => "NET_TIMEOUT",
            Status::MultipleOf8Required => "MULTIPLE_OF_8_REQUIRED",
            Status::InsufficientEntropy => "INSUFFICIENT_ENTHROPY",
            Status::InternalMemory => "INTERNAL_MEMORY",
            Status::InternalInit => "INTERNAL_INIT",
            Status::ReadingDevice => "READING_DEVICE",
            Status::IncompleteData => "INCOMPLETE_DATA",
            Status::OpeningDevice => "OPENING_DEVICE",
            Status::NotInitialized => "NOT_INITIALIZED",
            Status::AlreadyInitialized => "ALREADY_INITIALIZED",
            Status::NullPtr => "NULL_PTR",
            Status::NoDeviceFound => "NO_DEVICE_FOUND",
            Status::Success => "SUCCESS",
        }
    }

    /// Human readable explanation, as printed in the status legend
    pub fn description(self) -> &'static str {
        match self {
            Status::WrongDataFormat => "Data received in an unexpected format",
            Status::InternalChError => "Internal channel error",
            Status::NetRetriesExceeded => "Network retries exceeded",
            Status::NetTimeout => "Network timeout",
            Status::MultipleOf8Required => "Requested size must be a multiple of 8",
            Status::InsufficientEntropy => "Insufficient entropy to certify output",
            Status::InternalMemory => "Internal buffer error",
            Status::InternalInit => "Internal initialization error: insufficient memory",
            Status::ReadingDevice => "Internal error reading device",
            Status::IncompleteData => "Incomplete data was received",
            Status::OpeningDevice => {
                "Unable to initialize device, could be driver issues or insufficient privileges"
            }
            Status::NotInitialized => "QRNG is not initialized",
            Status::AlreadyInitialized => "QRNG is already initialized",
            Status::NullPtr => "Null pointer error",
            Status::NoDeviceFound => {
                "No device found, could also be absence of driver or disconnected hardware"
            }
            Status::Success => "No error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl TryFrom<i32> for Status {
    type Error = i32;

    fn try_from(code: i32) -> std::result::Result<Self, i32> {
        Status::ALL
            .iter()
            .copied()
            .find(|s| s.code() == code)
            .ok_or(code)
    }
}

/// Last-status register of one session
///
/// Writes overwrite, nothing is queued. Reads are lock-free so polling the
/// status never waits on an in-flight backend call.
#[derive(Debug)]
pub struct StatusRegistry {
    last: AtomicI32,
}

impl StatusRegistry {
    pub fn new(initial: Status) -> Self {
        Self {
            last: AtomicI32::new(initial.code()),
        }
    }

    /// Record the outcome of a call
    pub fn record(&self, status: Status) {
        self.last.store(status.code(), Ordering::Release);
    }

    /// Last recorded status
    pub fn get(&self) -> Status {
        // Only values produced by `record` are ever stored.
        Status::try_from(self.last.load(Ordering::Acquire)).unwrap_or(Status::InternalChError)
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new(Status::NotInitialized)
    }
}
