pub use clap::Parser;
use clap::Subcommand;

use rego6xx_lib::port::DEFAULT_BAUDRATE;
use rego6xx_lib::regs::{FrontPanel, RegSpec};

pub fn parse_with_radix<T>(input: &str) -> Result<T, T::FromStrRadixErr>
where
    T: num::Num,
    <T as num::Num>::FromStrRadixErr: std::error::Error + Send + Sync,
{
    if input.starts_with("0x") {
        T::from_str_radix(input.trim_start_matches("0x"), 16)
    } else if input.starts_with("0b") {
        T::from_str_radix(input.trim_start_matches("0b"), 2)
    } else {
        T::from_str_radix(input, 10)
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Skip sanity checks
    #[clap(long, short)]
    pub force: bool,

    /// enable debug output
    #[clap(long, short)]
    pub debug: bool,

    /// UART device or 'auto'
    #[clap(long, short, default_value = "auto")]
    pub port: String,

    /// UART baud rate
    #[clap(long, short, default_value_t = DEFAULT_BAUDRATE)]
    pub baudrate: u32,

    /// Use json-formatted output
    #[clap(long, short)]
    pub json: bool,

    /// Talk to the built-in simulator instead of a serial port
    #[clap(long, short)]
    pub simulate: bool,

    /// Response timeout in milliseconds
    #[clap(long, short, default_value_t = 30_000)]
    pub timeout_ms: u64,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List known registers
    ListRegisters,

    /// Read register, by name or as bank/address
    Read { reg: RegSpec },

    /// Write register. Temperatures are given in degrees Celsius
    Write {
        reg: RegSpec,
        #[clap(allow_hyphen_values = true)]
        value: String,
    },

    /// Read front panel lamps
    FrontPanel { lamp: Option<FrontPanel> },

    /// Read display rows
    Display {
        #[clap(parse(try_from_str=parse_with_radix))]
        row: Option<u8>,
    },

    /// Read last error log entry
    LastError,

    /// Read previous error log entry
    PrevError,

    /// Read regulator version
    Version,

    /// Read all temperature sensors
    Sensors {
        /// Repeat every SECS seconds
        #[clap(long, short)]
        watch: Option<u64>,
    },

    /// Send one command frame and dump everything received for 4 seconds
    Raw {
        #[clap(parse(try_from_str=parse_with_radix))]
        cmd: u8,
        #[clap(parse(try_from_str=parse_with_radix))]
        address: u16,
        #[clap(default_value_t = 0, parse(try_from_str=parse_with_radix))]
        value: u16,
    },
}
