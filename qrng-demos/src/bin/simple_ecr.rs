//! Certified output and raw entropy samples

use anyhow::Result;
use clap::Parser;
use qrng_client::GROUP_SIZE;
use qrng_demos::{print_data_stream, LogArgs, SessionArgs};

#[derive(Parser, Debug)]
#[command(about = "Fetch certified QRNG output with entropy estimates", long_about = None)]
struct Args {
    /// Hashed bytes to fetch (multiple of 8)
    #[arg(short, long, default_value_t = 32)]
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
    println!(" QRNG init ret: {}", session.status().code());

    let groups = args.size / GROUP_SIZE;
    let mut hashed = vec![0u8; args.size];
    let mut ent_bits = vec![0u16; groups];
    let mut cert_val = vec![0f32; groups];

    let result = session.get_with_ec(&mut hashed, &mut ent_bits, &mut cert_val);
    println!(" QRNG get function returned: {}", session.status().code());
    if let Err(e) = result {
        println!(" QRNG experienced ERROR [{}] while fetching data: {}", session.status(), e);
        session.deinit();
        return Ok(());
    }

    println!("- QRNG hashed data:");
    print_data_stream(&hashed, 32, 1);
    println!("- QRNG certification data:");
    print_data_stream(&cert_val, 32, 1);
    println!("- QRNG entropy bits:");
    print_data_stream(&ent_bits, 32, 1);

    let mut raw = vec![0u16; args.size];
    let result = session.get_raw_ent(&mut raw);
    println!("- QRNG raw entropy function returned: {}", session.status().code());
    match result {
        Ok(_) => print_data_stream(&raw, 32, 1),
        Err(e) => println!(" QRNG experienced ERROR [{}] while fetching data: {}", session.status(), e),
    }

    session.deinit();
    Ok(())
}
