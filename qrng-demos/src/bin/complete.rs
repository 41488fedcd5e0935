//! Walk through every call of the session API, printing each status

use anyhow::Result;
use clap::Parser;
use qrng_demos::{print_data_stream, LogArgs, SessionArgs, MIB};

#[derive(Parser, Debug)]
#[command(about = "Exercise the whole QRNG session API", long_about = None)]
struct Args {
    /// Bytes to fetch with `get`
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

    // No seeding needed
    match session.rand() {
        Ok(value) => println!(" QRNG rand function returned: {}, status: {}", value, session.status().code()),
        Err(e) => println!(" QRNG rand function failed: {}, status: {}", e, session.status().code()),
    }

    let mut data = vec![0u8; args.size];
    let _ = session.get(&mut data);
    println!(" QRNG get function returned: {}", session.status().code());
    print_data_stream(&data, 16, 10);

    match session.urand() {
        Ok(value) => println!(" QRNG urand function returned: {:.6}, status: {}", value, session.status().code()),
        Err(e) => println!(" QRNG urand function failed: {}, status: {}", e, session.status().code()),
    }

    match session.urand2() {
        Ok(value) => println!(" QRNG urand2 function returned: {:.6}, status: {}", value, session.status().code()),
        Err(e) => println!(" QRNG urand2 function failed: {}, status: {}", e, session.status().code()),
    }

    session.deinit();
    println!(" QRNG deinit status: {}", session.status().code());
    Ok(())
}
