//! HTTP backend for network-attached boards
//!
//! Talks to an entropy gateway exposing `GET /api/random?bytes=N&encoding=hex`
//! and `GET /health`. Requests go out in chunks of at least `chunk_size`
//! bytes; surplus bytes wait in a [`BytePool`] for the next read. Transient
//! failures are retried under the configured [`RetryPolicy`].

use super::{BoardType, Certification, DeviceBackend};
use crate::{
    config::ClientConfig, pool::BytePool, retry::RetryPolicy, Error, Result, GROUP_SIZE,
    MAX_REQUEST_SIZE,
};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Gateway connection settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Bearer token presented to the gateway
    pub api_key: Option<String>,
    /// Minimum bytes per request
    pub chunk_size: usize,
    /// Request timeout
    pub timeout: Duration,
    /// Retry policy
    pub retry_policy: RetryPolicy,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for GatewaySettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            chunk_size: config.chunk_size,
            timeout: config.timeout(),
            retry_policy: RetryPolicy {
                max_attempts: config.max_retries,
                initial_backoff: config.initial_backoff(),
                ..RetryPolicy::default()
            },
        }
    }
}

/// Backend fetching entropy from a gateway
pub struct GatewayBackend {
    client: Client,
    settings: GatewaySettings,
    base_url: Option<Url>,
    pool: BytePool,
}

impl GatewayBackend {
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .pool_max_idle_per_host(4)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::InternalInit(format!("HTTP client: {}", e)))?;

        let pool = BytePool::new(settings.chunk_size.max(MAX_REQUEST_SIZE));

        Ok(Self {
            client,
            settings,
            base_url: None,
            pool,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_ref().ok_or(Error::NotInitialized)?;
        base.join(path)
            .map_err(|e| Error::InternalChannel(format!("Invalid endpoint {}: {}", path, e)))
    }

    fn authorized(&self, request: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.settings.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Fetch `bytes` bytes, retrying transient failures
    ///
    /// An empty result means the gateway has no entropy to serve right now.
    #[instrument(skip(self))]
    fn fetch(&self, bytes: usize) -> Result<Vec<u8>> {
        self.settings.retry_policy.execute(|| self.fetch_once(bytes))
    }

    fn fetch_once(&self, bytes: usize) -> Result<Vec<u8>> {
        let mut url = self.endpoint("api/random")?;
        url.query_pairs_mut()
            .append_pair("bytes", &bytes.to_string())
            .append_pair("encoding", "hex");

        let response = self.authorized(self.client.get(url.clone())).send()?;
        let status = response.status();

        if status == StatusCode::SERVICE_UNAVAILABLE {
            warn!("Gateway has no entropy available");
            return Ok(Vec::new());
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::OpeningDevice(format!("Gateway rejected API key ({})", status)));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(Error::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(Error::InternalChannel(format!("HTTP {} from {}", status, url)));
        }

        let body = response.text()?;
        let data = hex::decode(body.trim())
            .map_err(|e| Error::WrongDataFormat(format!("Invalid hex payload: {}", e)))?;

        if data.len() > bytes {
            return Err(Error::WrongDataFormat(format!(
                "Requested {} bytes, gateway sent {}",
                bytes,
                data.len()
            )));
        }

        debug!("Fetched {} bytes", data.len());
        Ok(data)
    }

    fn probe(&self) -> Result<()> {
        let url = self.endpoint("health")?;
        self.settings.retry_policy.execute(|| {
            let response = self.client.get(url.clone()).send()?;
            let status = response.status();
            // 503 only means the gateway buffer is low
            if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE {
                Ok(())
            } else if status.is_server_error() {
                Err(Error::Transient(format!("HTTP {}", status)))
            } else {
                Err(Error::OpeningDevice(format!("Health check returned {}", status)))
            }
        })
    }
}

impl DeviceBackend for GatewayBackend {
    fn name(&self) -> &'static str {
        "gateway"
    }

    fn open(&mut self, board: BoardType, device: &str) -> Result<()> {
        let mut base = Url::parse(device)
            .map_err(|e| Error::NoDeviceFound(format!("{}: {}", device, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        self.base_url = Some(base);

        if let Err(e) = self.probe() {
            self.base_url = None;
            return Err(match e {
                Error::Network(_) | Error::NetTimeout | Error::NetRetriesExceeded { .. } => {
                    Error::NoDeviceFound(format!("{}: {}", device, e))
                }
                other => other,
            });
        }

        info!("Connected to {} gateway at {}", board, device);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = self.pool.drain_into(buf);

        while filled < buf.len() {
            let wanted = (buf.len() - filled)
                .max(self.settings.chunk_size)
                .min(MAX_REQUEST_SIZE);

            match self.fetch(wanted) {
                Ok(data) if data.is_empty() => break,
                Ok(data) => {
                    self.pool.push(data);
                    filled += self.pool.drain_into(&mut buf[filled..]);
                }
                Err(e) if filled > 0 => {
                    warn!("Fetch failed after {} of {} bytes: {}", filled, buf.len(), e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }

    /// Gateways only serve conditioned output; samples are packed from it
    fn read_raw(&mut self, buf: &mut [u16]) -> Result<usize> {
        let mut bytes = vec![0u8; buf.len() * 2];
        let n = self.read(&mut bytes)? / 2;

        for (sample, pair) in buf.iter_mut().zip(bytes.chunks_exact(2)).take(n) {
            *sample = u16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(n)
    }

    fn read_certified(&mut self, group: &mut [u8; GROUP_SIZE]) -> Result<Certification> {
        let mut staged = [0u8; GROUP_SIZE];
        if self.read(&mut staged)? < GROUP_SIZE {
            return Err(Error::IncompleteData {
                read: 0,
                requested: GROUP_SIZE,
            });
        }

        // Gateway output is already hashed by the appliance
        group.copy_from_slice(&staged);
        Ok(Certification {
            entropy_bits: 64,
            value: 1.0,
        })
    }

    fn close(&mut self) {
        if let Some(url) = self.base_url.take() {
            info!("Disconnected from gateway {}", url);
        }
        self.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GatewaySettings {
        GatewaySettings {
            api_key: Some("test-key".to_string()),
            chunk_size: 16,
            timeout: Duration::from_secs(5),
            retry_policy: RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
                jitter: false,
                ..RetryPolicy::default()
            },
        }
    }

    fn connected(server: &mockito::ServerGuard) -> GatewayBackend {
        let mut backend = GatewayBackend::new(settings()).unwrap();
        backend.open(BoardType::Apextreme, &server.url()).unwrap();
        backend
    }

    #[test]
    fn test_read_keeps_surplus_in_pool() {
        let mut server = mockito::Server::new();
        let _health = server.mock("GET", "/health").with_status(200).create();
        let random = server
            .mock("GET", "/api/random")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("bytes".into(), "16".into()),
                mockito::Matcher::UrlEncoded("encoding".into(), "hex".into()),
            ]))
            .match_header("authorization", "Bearer test-key")
            .with_body("000102030405060708090a0b0c0d0e0f")
            .expect(1)
            .create();

        let mut backend = connected(&server);
        let mut first = [0u8; 4];
        let mut second = [0u8; 4];
        assert_eq!(backend.read(&mut first).unwrap(), 4);
        assert_eq!(backend.read(&mut second).unwrap(), 4);
        assert_eq!(first, [0, 1, 2, 3]);
        assert_eq!(second, [4, 5, 6, 7]);
        random.assert();
    }

    #[test]
    fn test_empty_gateway_is_short_read() {
        let mut server = mockito::Server::new();
        let _health = server.mock("GET", "/health").with_status(503).create();
        let _random = server
            .mock("GET", "/api/random")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create();

        let mut backend = connected(&server);
        let mut buf = [0xAAu8; 8];
        assert_eq!(backend.read(&mut buf).unwrap(), 0);
        assert_eq!(buf, [0xAA; 8]);
    }

    #[test]
    fn test_server_errors_exhaust_retries() {
        let mut server = mockito::Server::new();
        let _health = server.mock("GET", "/health").with_status(200).create();
        let random = server
            .mock("GET", "/api/random")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .expect(2)
            .create();

        let mut backend = connected(&server);
        let err = backend.read(&mut [0u8; 8]).unwrap_err();
        assert!(matches!(err, Error::NetRetriesExceeded { attempts: 2 }));
        random.assert();
    }

    #[test]
    fn test_invalid_hex_is_wrong_format() {
        let mut server = mockito::Server::new();
        let _health = server.mock("GET", "/health").with_status(200).create();
        let _random = server
            .mock("GET", "/api/random")
            .match_query(mockito::Matcher::Any)
            .with_body("not hex at all")
            .create();

        let mut backend = connected(&server);
        let err = backend.read(&mut [0u8; 8]).unwrap_err();
        assert!(matches!(err, Error::WrongDataFormat(_)));
    }

    #[test]
    fn test_unparseable_device_is_no_device() {
        let mut backend = GatewayBackend::new(settings()).unwrap();
        let err = backend.open(BoardType::Apextreme, "/dev/xdma0").unwrap_err();
        assert!(matches!(err, Error::NoDeviceFound(_)));
    }
}
