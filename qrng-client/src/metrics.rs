// SPDX-License-Identifier: MIT
//
// QRNG Client
// Copyright (c) 2025 QRNG Client Contributors
//
// Host-side session client for Quantum Dice style QRNG boards

//! Per-session read metrics

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const LATENCY_WINDOW: usize = 10_000;

/// Read metrics collector
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    start_time: Instant,

    reads_total: AtomicU64,
    reads_failed: AtomicU64,
    bytes_delivered: AtomicU64,
    busy_micros: AtomicU64,

    // Latency tracking (microseconds)
    read_latencies: RwLock<Vec<u64>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                start_time: Instant::now(),
                reads_total: AtomicU64::new(0),
                reads_failed: AtomicU64::new(0),
                bytes_delivered: AtomicU64::new(0),
                busy_micros: AtomicU64::new(0),
                read_latencies: RwLock::new(Vec::with_capacity(1024)),
            }),
        }
    }

    /// Record a backend call that delivered `bytes`
    pub fn record_read(&self, bytes: usize, latency: Duration) {
        let micros = latency.as_micros() as u64;
        self.inner.reads_total.fetch_add(1, Ordering::Relaxed);
        self.inner.bytes_delivered.fetch_add(bytes as u64, Ordering::Relaxed);
        self.inner.busy_micros.fetch_add(micros, Ordering::Relaxed);

        let mut latencies = self.inner.read_latencies.write();
        latencies.push(micros);
        if latencies.len() > LATENCY_WINDOW {
            latencies.drain(0..LATENCY_WINDOW / 2);
        }
    }

    pub fn record_failure(&self) {
        self.inner.reads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reads_total(&self) -> u64 {
        self.inner.reads_total.load(Ordering::Relaxed)
    }

    pub fn reads_failed(&self) -> u64 {
        self.inner.reads_failed.load(Ordering::Relaxed)
    }

    pub fn bytes_delivered(&self) -> u64 {
        self.inner.bytes_delivered.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.inner.start_time.elapsed()
    }

    /// Delivered bits per second of time spent inside backend calls
    pub fn throughput_bps(&self) -> f64 {
        let busy = self.inner.busy_micros.load(Ordering::Relaxed) as f64 / 1e6;
        if busy > 0.0 {
            self.bytes_delivered() as f64 * 8.0 / busy
        } else {
            0.0
        }
    }

    pub fn latency_percentile(&self, percentile: f64) -> Option<u64> {
        let latencies = self.inner.read_latencies.read();
        if latencies.is_empty() {
            return None;
        }

        let mut sorted = latencies.clone();
        sorted.sort_unstable();
        let index = ((sorted.len() as f64 * percentile).ceil() as usize).min(sorted.len() - 1);
        Some(sorted[index])
    }

    pub fn latency_p50(&self) -> Option<u64> {
        self.latency_percentile(0.50)
    }

    pub fn latency_p95(&self) -> Option<u64> {
        self.latency_percentile(0.95)
    }

    pub fn latency_p99(&self) -> Option<u64> {
        self.latency_percentile(0.99)
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reads: {} ({} failed), bytes: {}, throughput: {:.3} Gbps",
            self.reads_total(),
            self.reads_failed(),
            self.bytes_delivered(),
            self.throughput_bps() / 1e9
        )?;
        if let (Some(p50), Some(p99)) = (self.latency_p50(), self.latency_p99()) {
            write!(f, ", latency p50/p99: {}/{} us", p50, p99)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let metrics = Metrics::new();

        metrics.record_read(1024, Duration::from_micros(100));
        metrics.record_read(2048, Duration::from_micros(200));
        metrics.record_failure();

        assert_eq!(metrics.reads_total(), 2);
        assert_eq!(metrics.reads_failed(), 1);
        assert_eq!(metrics.bytes_delivered(), 3072);
        // 3072 bytes in 300 us
        assert!((metrics.throughput_bps() - 81_920_000.0).abs() < 1.0);
    }

    #[test]
    fn test_latency_percentiles() {
        let metrics = Metrics::new();

        for i in 1..=100 {
            metrics.record_read(100, Duration::from_micros(i));
        }

        let p50 = metrics.latency_p50().unwrap();
        assert!((45..=55).contains(&p50));

        let p99 = metrics.latency_p99().unwrap();
        assert!((95..=100).contains(&p99));
    }
}
