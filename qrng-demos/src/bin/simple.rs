// SPDX-License-Identifier: MIT
//
// QRNG Client
// Copyright (c) 2025 QRNG Client Contributors
//
// Host-side session client for Quantum Dice style QRNG boards

//! Read a block of random bytes and print a preview

use anyhow::Result;
use clap::Parser;
use qrng_client::Status;
use qrng_demos::{print_data_stream, LogArgs, SessionArgs, MIB};

#[derive(Parser, Debug)]
#[command(about = "Fetch random bytes from a QRNG board", long_about = None)]
struct Args {
    /// Bytes to fetch
    #[arg(short, long, default_value_t = 100 * MIB)]
    size: usize,

    #[command(flatten)]
    session: SessionArgs,

    #[command(flatten)]
    log: LogArgs,
}

fn main() -> Result<()> {
    let args = Args::parse();
    args.log.init();

    let session = args.session.open_session()?;
    println!(" QRNG init function status: {}", session.status().code());

    if session.status() != Status::Success {
        println!(
            " QRNG experienced ERROR [{}] during initialization",
            session.status()
        );
        session.deinit();
        return Ok(());
    }

    let mut data = vec![0u8; args.size];
    if let Err(e) = session.get(&mut data) {
        println!(" QRNG experienced ERROR [{}] while trying to fetch data: {}", session.status(), e);
        println!(" The data returned is NOT a Quantum random number");
    }

    println!(" QRNG get function returned: {}", session.status().code());
    print_data_stream(&data, 16, 10);

    session.deinit();
    Ok(())
}
