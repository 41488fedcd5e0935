//! Character device backend
//!
//! Reads from a device node such as `/dev/xdma0`. Plain reads and raw samples
//! come straight from the device. Certified groups are derived from 64 raw
//! bytes: the min-entropy of the raw input is estimated with the
//! most-common-value estimator (NIST SP 800-90B, 6.3.1) and the input is
//! conditioned with SHA-256, keeping the first 8 bytes of the digest.

use super::{BoardType, Certification, DeviceBackend};
use crate::{Error, Result, GROUP_SIZE};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use tracing::{debug, info, warn};

/// Raw input bytes consumed per certified group
pub const RAW_BYTES_PER_GROUP: usize = 64;

/// Output bits per certified group
const GROUP_BITS: f64 = (GROUP_SIZE * 8) as f64;

/// Backend reading a device node
pub struct DeviceFileBackend {
    file: Option<File>,
    path: String,
    min_entropy_bits: u16,
}

impl DeviceFileBackend {
    pub fn new(min_entropy_bits: u16) -> Self {
        Self {
            file: None,
            path: String::new(),
            min_entropy_bits,
        }
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::NotInitialized)
    }

    /// Read until `buf` is full or the device reports end-of-stream
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.file()?;
        let mut filled = 0;

        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if filled > 0 => {
                    warn!("Device read failed after {} bytes: {}", filled, e);
                    break;
                }
                Err(e) => return Err(Error::ReadingDevice(e.to_string())),
            }
        }

        Ok(filled)
    }
}

/// Estimate min-entropy of `samples` in bits, treating each byte as a sample
///
/// Uses the upper 99% confidence bound on the most common value's
/// probability, so short inputs are judged conservatively.
pub fn estimate_min_entropy(samples: &[u8]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }

    let mut counts = [0usize; 256];
    for &b in samples {
        counts[b as usize] += 1;
    }

    let n = samples.len() as f64;
    let max = counts.iter().copied().max().unwrap_or(0) as f64;
    let p_hat = max / n;
    let p_upper = (p_hat + 2.576 * (p_hat * (1.0 - p_hat) / (n - 1.0)).sqrt()).min(1.0);

    -p_upper.log2() * n
}

impl DeviceBackend for DeviceFileBackend {
    fn name(&self) -> &'static str {
        "device"
    }

    fn open(&mut self, board: BoardType, device: &str) -> Result<()> {
        let file = File::open(device).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NoDeviceFound(device.to_string()),
            _ => Error::OpeningDevice(format!("{}: {}", device, e)),
        })?;

        info!("Opened {} device {}", board, device);
        self.file = Some(file);
        self.path = device.to_string();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.read_full(buf)?;
        if n < buf.len() {
            warn!("Short read from {}: {} of {} bytes", self.path, n, buf.len());
        }
        Ok(n)
    }

    fn read_raw(&mut self, buf: &mut [u16]) -> Result<usize> {
        let mut bytes = vec![0u8; buf.len() * 2];
        let n = self.read_full(&mut bytes)? / 2;

        for (sample, pair) in buf.iter_mut().zip(bytes.chunks_exact(2)).take(n) {
            *sample = u16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(n)
    }

    fn read_certified(&mut self, group: &mut [u8; GROUP_SIZE]) -> Result<Certification> {
        let mut raw = [0u8; RAW_BYTES_PER_GROUP];
        let n = self.read_full(&mut raw)?;
        if n < raw.len() {
            return Err(Error::IncompleteData {
                read: 0,
                requested: GROUP_SIZE,
            });
        }

        let estimate = estimate_min_entropy(&raw).min(GROUP_BITS);
        let entropy_bits = estimate.floor() as u16;
        if entropy_bits < self.min_entropy_bits {
            debug!(
                "Group rejected: {} bits < {} required",
                entropy_bits, self.min_entropy_bits
            );
            return Err(Error::InsufficientEntropy {
                group: 0,
                bits: entropy_bits,
            });
        }

        let digest = Sha256::digest(raw);
        group.copy_from_slice(&digest[..GROUP_SIZE]);

        Ok(Certification {
            entropy_bits,
            value: (estimate / GROUP_BITS) as f32,
        })
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            info!("Closed device {}", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;
    use std::io::Write;

    fn device_with(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn random_bytes(n: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; n];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    #[test]
    fn test_missing_device() {
        let mut backend = DeviceFileBackend::new(48);
        let err = backend
            .open(BoardType::VertexB1, "/definitely/not/a/device")
            .unwrap_err();
        assert!(matches!(err, Error::NoDeviceFound(_)));
    }

    #[test]
    fn test_short_read_at_eof() {
        let file = device_with(&[7u8; 10]);
        let mut backend = DeviceFileBackend::new(48);
        backend.open(BoardType::VertexB1, file.path().to_str().unwrap()).unwrap();

        let mut buf = [0xEEu8; 16];
        assert_eq!(backend.read(&mut buf).unwrap(), 10);
        assert_eq!(&buf[..10], &[7u8; 10]);
        assert_eq!(&buf[10..], &[0xEE; 6]);
    }

    #[test]
    fn test_raw_samples_little_endian() {
        let file = device_with(&[0x34, 0x12, 0xCD, 0xAB, 0xFF]);
        let mut backend = DeviceFileBackend::new(48);
        backend.open(BoardType::VertexA1, file.path().to_str().unwrap()).unwrap();

        let mut samples = [0u16; 4];
        assert_eq!(backend.read_raw(&mut samples).unwrap(), 2);
        assert_eq!(&samples[..2], &[0x1234, 0xABCD]);
        assert_eq!(&samples[2..], &[0, 0]);
    }

    #[test]
    fn test_certified_group_from_random_input() {
        let file = device_with(&random_bytes(RAW_BYTES_PER_GROUP));
        let mut backend = DeviceFileBackend::new(48);
        backend.open(BoardType::VertexB1, file.path().to_str().unwrap()).unwrap();

        let mut group = [0u8; GROUP_SIZE];
        let cert = backend.read_certified(&mut group).unwrap();
        assert_eq!(cert.entropy_bits, 64);
        assert!(cert.value > 0.99 && cert.value <= 1.0);
    }

    #[test]
    fn test_constant_input_is_rejected() {
        let file = device_with(&[0u8; RAW_BYTES_PER_GROUP]);
        let mut backend = DeviceFileBackend::new(48);
        backend.open(BoardType::VertexB1, file.path().to_str().unwrap()).unwrap();

        let mut group = [0u8; GROUP_SIZE];
        let err = backend.read_certified(&mut group).unwrap_err();
        assert!(matches!(err, Error::InsufficientEntropy { bits: 0, .. }));
    }

    #[test]
    fn test_min_entropy_estimate() {
        assert_eq!(estimate_min_entropy(&[5u8; 64]), 0.0);
        let spread: Vec<u8> = (0..=255).collect();
        assert!(estimate_min_entropy(&spread) > 64.0);
    }
}
