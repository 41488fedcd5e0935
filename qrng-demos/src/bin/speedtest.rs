// SPDX-License-Identifier: MIT
//
// QRNG Client
// Copyright (c) 2025 QRNG Client Contributors
//
// Host-side session client for Quantum Dice style QRNG boards

//! Throughput test
//!
//! Each worker thread opens its own session and repeatedly times one large
//! `get`. Workers report over a channel so the output stays line-ordered.

use anyhow::{anyhow, Result};
use clap::Parser;
use crossbeam::channel::{unbounded, Sender};
use qrng_client::Status;
use qrng_demos::{status_legend, LogArgs, SessionArgs, MIB};
use std::thread;
use std::time::{Duration, Instant};
use tracing::error;

#[derive(Parser, Debug, Clone)]
#[command(about = "Measure QRNG read throughput", long_about = None)]
struct Args {
    /// Repetitions per worker, 0 runs forever
    #[arg(default_value_t = 0)]
    runs: u64,

    /// Worker threads, one session each
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Buffer size per read, in MiB
    #[arg(long, default_value_t = 80)]
    buffer_mib: usize,

    /// Pause between reads, in seconds
    #[arg(long, default_value_t = 2)]
    interval_secs: u64,

    #[command(flatten)]
    session: SessionArgs,

    #[command(flatten)]
    log: LogArgs,
}

enum Report {
    Init { worker: String, status: Status },
    Run { worker: String, run: u64, status: Status, gbps: f64 },
    Done { worker: String, summary: String },
}

/// Gigabits per second for `bytes` read in `elapsed`
fn gbps(bytes: usize, elapsed: Duration) -> f64 {
    let nanos = elapsed.as_nanos() as f64;
    if nanos > 0.0 {
        bytes as f64 * 8.0 / nanos
    } else {
        0.0
    }
}

fn worker(name: String, args: Args, tx: Sender<Report>) -> Result<()> {
    let session = args.session.open_session()?;
    let status = session.status();
    let _ = tx.send(Report::Init { worker: name.clone(), status });
    if status != Status::Success {
        session.deinit();
        return Ok(());
    }

    let mut buf = vec![0u8; args.buffer_mib * MIB];
    let interval = Duration::from_secs(args.interval_secs);
    let mut run = 0u64;
    while args.runs == 0 || run < args.runs {
        let start = Instant::now();
        let _ = session.get(&mut buf);
        let elapsed = start.elapsed();

        let report = Report::Run {
            worker: name.clone(),
            run,
            status: session.status(),
            gbps: gbps(buf.len(), elapsed),
        };
        if tx.send(report).is_err() {
            break;
        }

        run += 1;
        if args.runs == 0 || run < args.runs {
            thread::sleep(interval);
        }
    }

    let summary = session.metrics().to_string();
    session.deinit();
    let _ = tx.send(Report::Done { worker: name, summary });
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    args.log.init();

    print!("{}", status_legend());
    println!();

    let (tx, rx) = unbounded();
    let mut handles = Vec::with_capacity(args.threads);
    for i in 0..args.threads.max(1) {
        let name = format!("Thread{}", i);
        println!(
            " Running speed test, reps: {} {}, Thread name: {}",
            args.runs,
            if args.runs == 0 { "(infinite loop)" } else { "" },
            name
        );
        let (args, tx) = (args.clone(), tx.clone());
        handles.push(thread::spawn(move || worker(name, args, tx)));
    }
    drop(tx);

    for report in rx {
        match report {
            Report::Init { worker, status } => {
                println!(" {} QRNG init function status: {}", worker, status.code());
                if status != Status::Success {
                    println!(" {} QRNG experienced ERROR [{}] during initialization", worker, status);
                }
            }
            Report::Run { worker, run, status, gbps } => {
                println!("[{:>6}]\t{}, st: {}, {:.3}gbps", run, worker, status.code(), gbps);
            }
            Report::Done { worker, summary } => println!(" {} finished: {}", worker, summary),
        }
    }

    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Worker failed: {:#}", e),
            Err(_) => return Err(anyhow!("Worker thread panicked")),
        }
    }
    Ok(())
}
