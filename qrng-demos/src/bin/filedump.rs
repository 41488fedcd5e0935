//! Dump QRNG or PRNG output to a series of files
//!
//! Raw modes write `size` bytes per file. Uniform modes write `size` values
//! per file, one `%.12f` formatted number per line.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use qrng_client::backend::PrngBackend;
use qrng_client::{Error, Session};
use qrng_demos::{LogArgs, SessionArgs, MIB};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;

const MAX_FILES: usize = 100;
const CHUNK: usize = 8 * MIB;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
enum DataType {
    /// 8 bit QRNG data
    QrngRaw,
    /// QRNG uniform distribution between 0 and 1
    QrngUdist,
    /// Pseudo-random uniform distribution between 0 and 1
    PrngUdist,
    /// Raw pseudo-random bytes
    PrngRaw,
}

impl DataType {
    fn name(self) -> &'static str {
        match self {
            DataType::QrngRaw => "qrng_raw",
            DataType::QrngUdist => "qrng_udist",
            DataType::PrngUdist => "prng_udist",
            DataType::PrngRaw => "prng_raw",
        }
    }

    fn is_raw(self) -> bool {
        matches!(self, DataType::QrngRaw | DataType::PrngRaw)
    }

    fn is_quantum(self) -> bool {
        matches!(self, DataType::QrngRaw | DataType::QrngUdist)
    }
}

#[derive(Parser, Debug)]
#[command(
    about = "Dump random data into files",
    after_help = "e.g. filedump test_data 1024 5 qrng_raw\n  dumps 1 KiB of QRNG bytes into 5 files prefixed with 'test_data'"
)]
struct Args {
    /// Output file prefix
    prefix: String,

    /// Bytes (raw types) or values (udist types) per file
    size: u64,

    /// Number of files, capped at 100
    count: usize,

    /// Data type
    data_type: DataType,

    #[command(flatten)]
    session: SessionArgs,

    #[command(flatten)]
    log: LogArgs,
}

fn output_path(prefix: &str, data_type: DataType, index: usize) -> PathBuf {
    PathBuf::from(format!("{}_{}_{}", prefix, data_type.name(), index))
}

/// Fill one file; returns the units written
fn dump_file(session: &Session, data_type: DataType, path: &Path, size: u64) -> Result<u64> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let begin = Instant::now();
    let mut buf = vec![0u8; CHUNK.min(size as usize).max(1)];

    let mut done = 0u64;
    while done < size {
        if data_type.is_raw() {
            let want = ((size - done) as usize).min(buf.len());
            let read = match session.get(&mut buf[..want]) {
                Ok(n) => n,
                Err(Error::IncompleteData { read, .. }) => read,
                Err(e) => {
                    println!("\t\tERROR! from qrng fn, error/status code: {}", session.status().code());
                    warn!("Giving up on {}: {}", path.display(), e);
                    break;
                }
            };
            if read == 0 {
                println!("\t\tERROR! from qrng fn, error/status code: {}", session.status().code());
                break;
            }
            out.write_all(&buf[..read])?;
            done += read as u64;
        } else {
            match session.urand() {
                Ok(value) => writeln!(out, "{:.12}", value)?,
                Err(e) => {
                    println!("\t\tERROR! from qrng fn, error/status code: {}", session.status().code());
                    warn!("Giving up on {}: {}", path.display(), e);
                    break;
                }
            }
            done += 1;
        }

        print!(
            "\r Progress: {:3.2} percent,  time: {:.10}s",
            done as f64 / size as f64 * 100.0,
            begin.elapsed().as_secs_f64()
        );
    }

    out.flush()?;
    Ok(done)
}

/// Session feeding `data_type`: the configured board, or a software generator
fn open_source(session_args: &SessionArgs, data_type: DataType) -> Result<Session> {
    if data_type.is_quantum() {
        let session = session_args.open_session()?;
        println!("qrng init ret: {}", session.status().code());
        return Ok(session);
    }

    // No device is touched, so the device settings are not validated
    let board = session_args.layered_config()?.board_type;
    let session = Session::with_backend(board, "prng", Box::new(PrngBackend::from_entropy()));
    session.open().context("Failed to open PRNG session")?;
    Ok(session)
}

fn main() -> Result<()> {
    let args = Args::parse();
    args.log.init();

    let session = open_source(&args.session, args.data_type)?;

    let count = args.count.min(MAX_FILES);
    println!(
        "To fetch: {} data and write to files with prefix: {}, size: {}, number of files: {}",
        args.data_type.name(),
        args.prefix,
        args.size,
        count
    );

    for index in 1..=count {
        let path = output_path(&args.prefix, args.data_type, index);
        println!("\nFile: {}, {} of {}", path.display(), index, count);
        dump_file(&session, args.data_type, &path, args.size)?;
    }

    println!();
    session.deinit();
    Ok(())
}
