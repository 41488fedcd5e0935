//! Buffer reads
//!
//! # Buffers are never zeroed
//!
//! Reads write only the prefix the backend delivered. When fewer elements
//! than requested arrive, the call fails with [`Error::IncompleteData`]
//! carrying the count that was written, and the rest of the caller's buffer
//! keeps its previous contents. Callers that pre-fill a sentinel pattern can
//! rely on it surviving past the reported count.
//!
//! # Certified reads
//!
//! [`Session::get_with_ec`] works in groups of 8 output bytes, each paired
//! with one entropy-bits value and one certification value. Each group is
//! staged and committed only once the backend certified it. When a group
//! fails, the groups before it stay committed and the failing group and all
//! later ones are left untouched; the error names the failing group.

use crate::session::Session;
use crate::{Error, Result, GROUP_SIZE};
use std::time::Instant;

impl Session {
    /// Fill `data` with random bytes
    ///
    /// Returns the number of bytes read, which on success is `data.len()`.
    pub fn get(&self, data: &mut [u8]) -> Result<usize> {
        if data.is_empty() {
            return self.finish(Err(Error::NullPtr("data")));
        }

        let requested = data.len();
        let start = Instant::now();
        let result = self.with_backend_op(|backend| {
            let read = backend.read(data)?.min(requested);
            complete(read, requested)
        });
        self.observe(&result, start, 1);
        result
    }

    /// Fill `data` with raw 16-bit entropy samples
    ///
    /// Returns the number of samples read.
    pub fn get_raw_ent(&self, data: &mut [u16]) -> Result<usize> {
        if data.is_empty() {
            return self.finish(Err(Error::NullPtr("data")));
        }

        let requested = data.len();
        let start = Instant::now();
        let result = self.with_backend_op(|backend| {
            let read = backend.read_raw(data)?.min(requested);
            complete(read, requested)
        });
        self.observe(&result, start, 2);
        result
    }

    /// Fill `data` with hashed output plus per-group entropy and certification
    ///
    /// `data.len()` must be a multiple of 8; `ent_bits` and `cert_val` need
    /// room for `data.len() / 8` values each. Argument errors are reported
    /// before the backend is touched and leave every buffer unmodified.
    pub fn get_with_ec(
        &self,
        data: &mut [u8],
        ent_bits: &mut [u16],
        cert_val: &mut [f32],
    ) -> Result<()> {
        if let Err(e) = check_ec_buffers(data.len(), ent_bits.len(), cert_val.len()) {
            return self.finish(Err(e));
        }

        let requested = data.len();
        let start = Instant::now();
        let result = self.with_backend_op(|backend| {
            let groups = data
                .chunks_exact_mut(GROUP_SIZE)
                .zip(ent_bits.iter_mut())
                .zip(cert_val.iter_mut())
                .enumerate();

            for (index, ((chunk, ent), cv)) in groups {
                let mut staged = [0u8; GROUP_SIZE];
                let cert = backend
                    .read_certified(&mut staged)
                    .map_err(|e| match e {
                        Error::InsufficientEntropy { bits, .. } => Error::InsufficientEntropy {
                            group: index,
                            bits,
                        },
                        Error::IncompleteData { .. } => Error::IncompleteData {
                            read: index * GROUP_SIZE,
                            requested,
                        },
                        other => other,
                    })?;

                chunk.copy_from_slice(&staged);
                *ent = cert.entropy_bits;
                *cv = cert.value;
            }
            Ok(requested)
        });

        self.observe(&result, start, 1);
        result.map(|_| ())
    }

    /// Feed the outcome of a read into the session metrics
    fn observe(&self, result: &Result<usize>, start: Instant, element_size: usize) {
        let latency = start.elapsed();
        match result {
            Ok(n) => self.metrics().record_read(n * element_size, latency),
            Err(Error::IncompleteData { read, .. }) => {
                self.metrics().record_read(read * element_size, latency);
                self.metrics().record_failure();
            }
            Err(_) => self.metrics().record_failure(),
        }
    }
}

fn complete(read: usize, requested: usize) -> Result<usize> {
    if read < requested {
        Err(Error::IncompleteData { read, requested })
    } else {
        Ok(read)
    }
}

fn check_ec_buffers(data_len: usize, eb_len: usize, cv_len: usize) -> Result<()> {
    if data_len == 0 {
        return Err(Error::NullPtr("data"));
    }
    if data_len % GROUP_SIZE != 0 {
        return Err(Error::MultipleOf8Required(data_len));
    }

    let groups = data_len / GROUP_SIZE;
    if eb_len < groups {
        return Err(Error::NullPtr("ent_bits"));
    }
    if cv_len < groups {
        return Err(Error::NullPtr("cert_val"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BoardType, MockBackend, MockCounters, MockFailure};
    use crate::Status;

    fn open_session(mock: MockBackend) -> (Session, MockCounters) {
        let counters = mock.counters();
        let session = Session::with_backend(BoardType::VertexB1, "mock0", Box::new(mock));
        session.open().unwrap();
        (session, counters)
    }

    #[test]
    fn test_get_full_read() {
        let (session, _) = open_session(MockBackend::new());
        let mut buf = vec![0u8; 64];
        assert_eq!(session.get(&mut buf).unwrap(), 64);
        assert_eq!(session.status(), Status::Success);
        assert_eq!(session.metrics().bytes_delivered(), 64);
    }

    #[test]
    fn test_get_empty_buffer_is_null_ptr() {
        let (session, counters) = open_session(MockBackend::new());
        assert!(matches!(session.get(&mut []), Err(Error::NullPtr(_))));
        assert_eq!(session.status(), Status::NullPtr);
        assert_eq!(counters.reads(), 0);
    }

    #[test]
    fn test_read_failure_status() {
        let (session, _) = open_session(MockBackend::new().failing_reads(MockFailure::Reading));
        assert!(session.get(&mut [0u8; 8]).is_err());
        assert_eq!(session.status(), Status::ReadingDevice);
        assert_eq!(session.metrics().reads_failed(), 1);
    }

    #[test]
    fn test_raw_partial_fill() {
        let (session, _) = open_session(MockBackend::new().with_supply(6));
        let mut samples = [0xBEEFu16; 8];
        let err = session.get_raw_ent(&mut samples).unwrap_err();
        assert!(matches!(err, Error::IncompleteData { read: 3, requested: 8 }));
        assert_eq!(&samples[3..], &[0xBEEF; 5]);
        assert_eq!(session.status(), Status::IncompleteData);
    }

    #[test]
    fn test_ec_fills_groups() {
        let (session, _) = open_session(MockBackend::new());
        let mut data = [0u8; 32];
        let mut bits = [0u16; 4];
        let mut cert = [0f32; 4];
        session.get_with_ec(&mut data, &mut bits, &mut cert).unwrap();
        assert_eq!(bits, [64; 4]);
        assert_eq!(cert, [1.0; 4]);
    }

    #[test]
    fn test_ec_commits_prefix_groups_only() {
        let (session, _) = open_session(MockBackend::new().with_uncertified_group(2));
        let mut data = [0xAAu8; 32];
        let mut bits = [7u16; 4];
        let mut cert = [-1f32; 4];

        let err = session.get_with_ec(&mut data, &mut bits, &mut cert).unwrap_err();
        assert!(matches!(err, Error::InsufficientEntropy { group: 2, .. }));
        assert_eq!(session.status(), Status::InsufficientEntropy);

        assert_eq!(&bits[..2], &[64, 64]);
        assert_eq!(&bits[2..], &[7, 7]);
        assert_eq!(&cert[2..], &[-1.0, -1.0]);
        assert_eq!(&data[16..], &[0xAA; 16]);
    }

    #[test]
    fn test_ec_undersized_companions() {
        let (session, counters) = open_session(MockBackend::new());
        let mut data = [0u8; 16];
        let mut bits = [0u16; 1];
        let mut cert = [0f32; 2];
        assert!(matches!(
            session.get_with_ec(&mut data, &mut bits, &mut cert),
            Err(Error::NullPtr("ent_bits"))
        ));
        assert_eq!(counters.certified_reads(), 0);
    }
}
