use std::io::{self, Read, Write};

use anyhow::Result;
use clap::Parser;
use env_logger::TimestampPrecision;
use log::{error, info};

use rego6xx_lib::port::{self, DEFAULT_BAUDRATE};
use rego6xx_lib::protocol::slave::Simulator;

/// Answers Rego6xx commands on a serial port
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Skip sanity checks
    #[clap(long, short)]
    force: bool,

    /// enable debug output
    #[clap(long, short)]
    debug: bool,

    /// UART device or 'auto'
    #[clap(long, short, default_value = "auto")]
    port: String,

    /// UART baud rate
    #[clap(long, short, default_value_t = DEFAULT_BAUDRATE)]
    baudrate: u32,

    /// Text of the first display row
    #[clap(long, default_value = "Rego 600")]
    banner: String,
}

fn serve(args: &Args) -> Result<()> {
    let mut port = port::open_port(&args.port, args.baudrate, args.force)?;
    let mut sim = Simulator::new();
    sim.set_display_row(0, &args.banner);

    info!("serving on {} @ {} baud", args.port, args.baudrate);

    let mut buf = [0u8; 64];
    loop {
        let n = match port.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(e.into()),
        };

        sim.feed(&buf[..n]);
        let reply = sim.drain_output();
        if !reply.is_empty() {
            port.write_all(&reply)?;
            port.flush()?;
        }
    }
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if args.debug {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(Some(TimestampPrecision::Millis))
    .format_target(false)
    .init();

    if let Err(e) = serve(&args) {
        error!("{:#}", e);
    }
}
