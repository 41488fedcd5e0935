// SPDX-License-Identifier: MIT
//
// QRNG Client
// Copyright (c) 2025 QRNG Client Contributors
//
// Host-side session client for Quantum Dice style QRNG boards

//! Session lifecycle
//!
//! A [`Session`] is one binding between a caller and a backend. It moves
//! through `Uninitialized → Initialized → Deinitialized` and never back.
//! Data calls run only in `Initialized`; in any other state they fail with
//! [`Status::NotInitialized`] and never reach the backend.
//!
//! The backend sits behind a mutex, so concurrent calls on one session are
//! serialized. The status register lives outside that mutex: polling
//! [`Session::status`] never waits for an in-flight read.

use crate::backend::{self, BoardType, DeviceBackend};
use crate::config::ClientConfig;
use crate::metrics::Metrics;
use crate::status::{Status, StatusRegistry};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, info, warn};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Deinitialized,
}

/// QRNG session handle
pub struct Session {
    board: BoardType,
    device: String,
    status: StatusRegistry,
    metrics: Metrics,
    inner: Mutex<Inner>,
}

struct Inner {
    state: SessionState,
    backend: Option<Box<dyn DeviceBackend>>,
}

impl Session {
    /// Initialize the default board on the platform's default device
    pub fn init() -> Self {
        Self::init_param(BoardType::default(), crate::DEFAULT_DEVICE)
    }

    /// Initialize `board` on `device` using the board's default backend
    ///
    /// Always returns a session; check [`Session::status`] for the outcome.
    pub fn init_param(board: BoardType, device: &str) -> Self {
        let config = ClientConfig {
            board_type: board,
            device_name: device.to_string(),
            ..ClientConfig::default()
        };
        Self::init_with(board, device, &config)
    }

    /// Initialize from configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!("Invalid session configuration: {}", e);
            return Self::unbound(config.board_type, &config.device_name, e.status());
        }
        Self::init_with(config.board_type, &config.device_name, config)
    }

    fn init_with(board: BoardType, device: &str, config: &ClientConfig) -> Self {
        match backend::connect(board, config) {
            Ok(backend) => {
                let session = Self::with_backend(board, device, backend);
                // The outcome is left in the status register.
                let _ = session.open();
                session
            }
            Err(e) => {
                warn!("Cannot create backend for {}: {}", board, e);
                Self::unbound(board, device, e.status())
            }
        }
    }

    /// Create an unopened session over an explicit backend
    pub fn with_backend(board: BoardType, device: &str, backend: Box<dyn DeviceBackend>) -> Self {
        Self {
            board,
            device: device.to_string(),
            status: StatusRegistry::new(Status::NotInitialized),
            metrics: Metrics::new(),
            inner: Mutex::new(Inner {
                state: SessionState::Uninitialized,
                backend: Some(backend),
            }),
        }
    }

    fn unbound(board: BoardType, device: &str, status: Status) -> Self {
        Self {
            board,
            device: device.to_string(),
            status: StatusRegistry::new(status),
            metrics: Metrics::new(),
            inner: Mutex::new(Inner {
                state: SessionState::Uninitialized,
                backend: None,
            }),
        }
    }

    /// Bind the backend to the device
    ///
    /// A session opens at most once: `AlreadyInitialized` when already bound,
    /// `NotInitialized` once deinitialized. A failed open may be retried.
    pub fn open(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        let result = match inner.state {
            SessionState::Initialized => Err(Error::AlreadyInitialized),
            SessionState::Deinitialized => Err(Error::NotInitialized),
            SessionState::Uninitialized => match inner.backend.as_mut() {
                Some(backend) => backend.open(self.board, &self.device),
                None => Err(Error::NotInitialized),
            },
        };

        match &result {
            Ok(()) => {
                inner.state = SessionState::Initialized;
                info!("QRNG {} initialized on {}", self.board, self.device);
            }
            Err(e) => warn!("QRNG {} init on {} failed: {}", self.board, self.device, e),
        }

        self.finish(result)
    }

    /// Release the backend
    ///
    /// Closes the backend exactly once. On a session that is not initialized
    /// this only records `NotInitialized`.
    pub fn deinit(&self) {
        let mut inner = self.inner.lock();

        match inner.state {
            SessionState::Initialized => {
                if let Some(mut backend) = inner.backend.take() {
                    backend.close();
                }
                inner.state = SessionState::Deinitialized;
                self.status.record(Status::Success);
                info!("QRNG {} on {} deinitialized", self.board, self.device);
            }
            SessionState::Uninitialized => {
                // Never opened, nothing to close
                inner.backend = None;
                inner.state = SessionState::Deinitialized;
                self.status.record(Status::NotInitialized);
            }
            SessionState::Deinitialized => self.status.record(Status::NotInitialized),
        }
    }

    /// Status of the last call on this session
    pub fn status(&self) -> Status {
        self.status.get()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn board(&self) -> BoardType {
        self.board
    }

    /// Device identifier, as given at init
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run `op` against the bound backend and record its status
    pub(crate) fn with_backend_op<T>(
        &self,
        op: impl FnOnce(&mut dyn DeviceBackend) -> Result<T>,
    ) -> Result<T> {
        let mut inner = self.inner.lock();
        let result = match (inner.state, inner.backend.as_mut()) {
            (SessionState::Initialized, Some(backend)) => op(&mut **backend),
            _ => Err(Error::NotInitialized),
        };
        self.finish(result)
    }

    /// Record the status of `result` and pass it through
    pub(crate) fn finish<T>(&self, result: Result<T>) -> Result<T> {
        let status = match &result {
            Ok(_) => Status::Success,
            Err(e) => e.status(),
        };
        if !status.is_success() {
            debug!("QRNG call failed: {}", status);
        }
        self.status.record(status);
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.state == SessionState::Initialized {
            if let Some(backend) = inner.backend.as_mut() {
                backend.close();
            }
            inner.state = SessionState::Deinitialized;
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("board", &self.board)
            .field("device", &self.device)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockFailure};

    fn mock_session(mock: MockBackend) -> Session {
        Session::with_backend(BoardType::VertexB1, "mock0", Box::new(mock))
    }

    #[test]
    fn test_open_and_deinit() {
        let mock = MockBackend::new();
        let counters = mock.counters();
        let session = mock_session(mock);
        assert_eq!(session.state(), SessionState::Uninitialized);

        session.open().unwrap();
        assert_eq!(session.status(), Status::Success);
        assert_eq!(session.state(), SessionState::Initialized);

        session.deinit();
        assert_eq!(session.state(), SessionState::Deinitialized);
        assert_eq!(counters.closes(), 1);
    }

    #[test]
    fn test_single_init_per_handle() {
        let mock = MockBackend::new();
        let counters = mock.counters();
        let session = mock_session(mock);

        session.open().unwrap();
        assert!(matches!(session.open(), Err(Error::AlreadyInitialized)));
        assert_eq!(session.status(), Status::AlreadyInitialized);
        assert_eq!(counters.opens(), 1);
    }

    #[test]
    fn test_failed_open_keeps_status() {
        let session = mock_session(MockBackend::new().failing_open(MockFailure::NoDevice));
        assert!(session.open().is_err());
        assert_eq!(session.status(), Status::NoDeviceFound);
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn test_double_deinit_closes_once() {
        let mock = MockBackend::new();
        let counters = mock.counters();
        let session = mock_session(mock);
        session.open().unwrap();

        session.deinit();
        session.deinit();
        assert_eq!(session.status(), Status::NotInitialized);
        assert_eq!(counters.closes(), 1);

        assert!(matches!(session.open(), Err(Error::NotInitialized)));
    }

    #[test]
    fn test_drop_closes_backend() {
        let mock = MockBackend::new();
        let counters = mock.counters();
        {
            let session = mock_session(mock);
            session.open().unwrap();
        }
        assert_eq!(counters.closes(), 1);
    }

    #[test]
    fn test_deinit_unopened_session() {
        let mock = MockBackend::new();
        let counters = mock.counters();
        let session = mock_session(mock);

        session.deinit();
        assert_eq!(session.status(), Status::NotInitialized);
        assert_eq!(counters.closes(), 0);
    }

    #[test]
    fn test_init_param_missing_device() {
        let session = Session::init_param(BoardType::VertexA1, "/no/such/xdma");
        assert_eq!(session.status(), Status::NoDeviceFound);
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn test_from_invalid_config() {
        let config = ClientConfig {
            board_type: BoardType::Apextreme,
            device_name: "not a url".to_string(),
            ..ClientConfig::default()
        };
        let session = Session::from_config(&config);
        assert_eq!(session.status(), Status::OpeningDevice);
    }

    #[test]
    fn test_session_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
    }
}
