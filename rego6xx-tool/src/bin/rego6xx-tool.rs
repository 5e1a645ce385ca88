pub mod cli;

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::CommandFactory;
use clap_complete::{generate, shells::Bash};
use log::{error, info};
use num_traits::FromPrimitive;

use rego6xx_lib::port;
use rego6xx_lib::protocol::{
    encode_command, master::Controller, slave::Simulator, CmdId, Decoded, ErrorEntry,
    ResponseKind, Transport, DEV_ADDR_HEATPUMP,
};
use rego6xx_lib::regs::{
    self, Access, Bank, FrontPanel, Reg, RegSpec, Temperature, Unit, SENSORS,
};

use cli::{Cli, Commands, Parser};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const RAW_CAPTURE: Duration = Duration::from_secs(4);
const DISPLAY_ROWS: u8 = 4;

#[derive(Clone, Copy)]
enum OutputFormat {
    Plain,
    Json,
}

fn slice_to_column<T>(data: &[T]) -> String
where
    T: ToString,
{
    data.iter()
        .map(|x| x.to_string())
        .collect::<Vec<String>>()
        .join("\n")
}

/// Polls the command issued for `kind` until it completes and hands the
/// slot back. Fails unless the reply is valid and addressed to the host.
fn finish<T: Transport + ?Sized>(ctrl: &mut Controller<T>, kind: ResponseKind) -> Result<Decoded> {
    while ctrl.is_pending() {
        ctrl.poll()?;
        if ctrl.is_pending() {
            thread::sleep(POLL_INTERVAL);
        }
    }

    let rsp = ctrl.response(kind);
    let result = if ctrl.accepted(kind) {
        rsp.decode()
            .ok_or_else(|| anyhow!("{} response not decodable", kind))
    } else if rsp.is_timed_out() {
        Err(anyhow!("no {} response within {:?}", kind, ctrl.timeout()))
    } else if rsp.is_valid() {
        Err(anyhow!(
            "{} response from unexpected address {:#04x}",
            kind,
            rsp.dev_addr().unwrap_or_default()
        ))
    } else {
        Err(anyhow!("{} response checksum mismatch", kind))
    };

    ctrl.release(kind);
    result
}

fn read_value<T: Transport + ?Sized>(
    ctrl: &mut Controller<T>,
    bank: Bank,
    address: u16,
) -> Result<u16> {
    let kind = ctrl.read(bank, address)?;
    match finish(ctrl, kind)? {
        Decoded::Value(value) => Ok(value),
        other => Err(anyhow!("unexpected reply {:?}", other)),
    }
}

fn read_error<T: Transport + ?Sized>(ctrl: &mut Controller<T>, last: bool) -> Result<ErrorEntry> {
    let kind = if last {
        ctrl.read_last_error()?
    } else {
        ctrl.read_previous_error()?
    };

    match finish(ctrl, kind)? {
        Decoded::Error(entry) => Ok(entry),
        other => Err(anyhow!("unexpected reply {:?}", other)),
    }
}

fn parse_value(reg: Option<&Reg>, input: &str) -> Result<u16> {
    match reg.map(|r| r.unit) {
        Some(Unit::Temperature) => {
            let celsius: f32 = input
                .parse()
                .with_context(|| format!("Invalid temperature '{}'", input))?;
            Temperature::from_celsius(celsius)
                .map(Temperature::raw)
                .ok_or_else(|| anyhow!("Temperature {} out of range", input))
        }
        _ => cli::parse_with_radix::<u16>(input)
            .with_context(|| format!("Invalid value '{}'", input)),
    }
}

fn reg_json(name: &str, bank: Bank, address: u16, raw: u16, reg: Option<&Reg>) -> json::JsonValue {
    let mut obj = json::JsonValue::new_object();
    obj["name"] = name.into();
    obj["bank"] = bank.to_string().into();
    obj["address"] = address.into();
    obj["raw"] = raw.into();
    obj["value"] = match reg.map(|r| r.unit) {
        Some(Unit::Temperature) => Temperature::from_raw(raw).celsius().into(),
        Some(Unit::Switch) => (raw != 0).into(),
        _ => raw.into(),
    };
    obj
}

fn error_json(entry: &ErrorEntry) -> json::JsonValue {
    let mut obj = json::JsonValue::new_object();
    obj["id"] = entry.id.into();
    obj["log"] = entry.log.trim_end_matches('\0').into();
    obj["description"] = entry.description().into();
    obj
}

fn cmd_list_registers(fmt: OutputFormat) -> Result<String> {
    let regs = regs::list_registers();

    Ok(match fmt {
        OutputFormat::Plain => slice_to_column(regs.as_slice()),
        OutputFormat::Json => json::stringify(
            regs.iter()
                .map(|reg| {
                    let mut obj = json::JsonValue::new_object();
                    obj["name"] = reg.name.into();
                    obj["bank"] = reg.bank.to_string().into();
                    obj["address"] = reg.address.into();
                    obj["access"] = reg.access.to_string().into();
                    obj["description"] = reg.description.into();
                    obj
                })
                .collect::<Vec<_>>(),
        ),
    })
}

fn cmd_read<T: Transport + ?Sized>(
    ctrl: &mut Controller<T>,
    regspec: &RegSpec,
    fmt: OutputFormat,
) -> Result<String> {
    let (bank, address, reg) = regspec.resolve()?;
    let raw = read_value(ctrl, bank, address)
        .with_context(|| format!("Failed to read {}/{:#06x}", bank, address))?;

    Ok(match fmt {
        OutputFormat::Plain => match &reg {
            Some(reg) => reg.format_value(raw),
            None => raw.to_string(),
        },
        OutputFormat::Json => {
            let name = reg.map_or_else(|| format!("{}/{:#06x}", bank, address), |r| r.name.into());
            json::stringify(reg_json(&name, bank, address, raw, reg.as_ref()))
        }
    })
}

fn cmd_write<T: Transport + ?Sized>(
    ctrl: &mut Controller<T>,
    regspec: &RegSpec,
    value: &str,
    force: bool,
) -> Result<String> {
    let (bank, address, reg) = regspec.resolve()?;

    if let Some(reg) = &reg {
        if reg.access == Access::R && !force {
            return Err(anyhow!("Register {} is read-only", reg.name));
        }
    }

    let raw = parse_value(reg.as_ref(), value)?;
    let kind = ctrl.write(bank, address, raw)?;
    match finish(ctrl, kind).with_context(|| format!("Failed to write {}/{:#06x}", bank, address))? {
        Decoded::Confirmed => Ok(String::new()),
        other => Err(anyhow!("unexpected reply {:?}", other)),
    }
}

fn cmd_front_panel<T: Transport + ?Sized>(
    ctrl: &mut Controller<T>,
    lamp: Option<FrontPanel>,
    fmt: OutputFormat,
) -> Result<String> {
    let lamps = match lamp {
        Some(lamp) => vec![lamp],
        None => FrontPanel::ALL.to_vec(),
    };

    let res = lamps
        .into_iter()
        .map(|lamp| -> Result<(FrontPanel, bool)> {
            let value = read_value(ctrl, Bank::FrontPanel, lamp.address())
                .with_context(|| format!("Failed to read {} lamp", lamp))?;
            Ok((lamp, value != 0))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(match fmt {
        OutputFormat::Plain => res
            .iter()
            .map(|(lamp, on)| format!("{} {}", lamp, if *on { "on" } else { "off" }))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => {
            let mut obj = json::JsonValue::new_object();
            for (lamp, on) in res {
                obj[lamp.name()] = on.into();
            }
            json::stringify(obj)
        }
    })
}

fn cmd_display<T: Transport + ?Sized>(
    ctrl: &mut Controller<T>,
    row: Option<u8>,
    fmt: OutputFormat,
) -> Result<String> {
    let rows = match row {
        Some(row) if row < DISPLAY_ROWS => row..row + 1,
        Some(row) => return Err(anyhow!("Display row {} out of range 0..{}", row, DISPLAY_ROWS)),
        None => 0..DISPLAY_ROWS,
    };

    let lines = rows
        .map(|row| -> Result<String> {
            let kind = ctrl.read_display(row)?;
            match finish(ctrl, kind).with_context(|| format!("Failed to read display row {}", row))? {
                Decoded::Display(text) => Ok(text),
                other => Err(anyhow!("unexpected reply {:?}", other)),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(match fmt {
        OutputFormat::Plain => lines.join("\n"),
        OutputFormat::Json => json::stringify(lines),
    })
}

fn cmd_error<T: Transport + ?Sized>(
    ctrl: &mut Controller<T>,
    last: bool,
    fmt: OutputFormat,
) -> Result<String> {
    let entry = read_error(ctrl, last).context("Failed to read error log")?;

    Ok(match fmt {
        OutputFormat::Plain => entry.to_string(),
        OutputFormat::Json => json::stringify(error_json(&entry)),
    })
}

fn cmd_version<T: Transport + ?Sized>(ctrl: &mut Controller<T>, fmt: OutputFormat) -> Result<String> {
    let kind = ctrl.read_version()?;
    let version = match finish(ctrl, kind).context("Failed to read version")? {
        Decoded::Value(value) => value,
        other => return Err(anyhow!("unexpected reply {:?}", other)),
    };

    Ok(match fmt {
        OutputFormat::Plain => format!("{:#06x}", version),
        OutputFormat::Json => version.to_string(),
    })
}

fn read_sensors<T: Transport + ?Sized>(
    ctrl: &mut Controller<T>,
    fmt: OutputFormat,
) -> Result<String> {
    let res = SENSORS
        .iter()
        .filter_map(|&sensor| regs::sys_reg_info(sensor))
        .map(|reg| -> Result<(Reg, u16)> {
            let raw = read_value(ctrl, reg.bank, reg.address)
                .with_context(|| format!("Failed to read {}", reg.name))?;
            Ok((reg, raw))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(match fmt {
        OutputFormat::Plain => res
            .iter()
            .map(|(reg, raw)| format!("{:<10} {}", reg.name, reg.format_value(*raw)))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => {
            let mut obj = json::JsonValue::new_object();
            for (reg, raw) in res {
                obj[reg.name] = Temperature::from_raw(raw).celsius().into();
            }
            json::stringify(obj)
        }
    })
}

fn cmd_sensors<T: Transport + ?Sized>(
    ctrl: &mut Controller<T>,
    watch: Option<u64>,
    fmt: OutputFormat,
) -> Result<String> {
    let period = match watch {
        Some(secs) => Duration::from_secs(secs.max(1)),
        None => return read_sensors(ctrl, fmt),
    };

    loop {
        let started = Instant::now();
        println!("{}", read_sensors(ctrl, fmt)?);
        if let OutputFormat::Plain = fmt {
            println!();
        }
        thread::sleep(period.saturating_sub(started.elapsed()));
    }
}

/// Bypasses the controller: writes one frame and dumps whatever arrives.
fn cmd_raw<T: Transport + ?Sized>(port: &mut T, cmd: u8, address: u16, value: u16) -> Result<String> {
    let cmd = CmdId::from_u8(cmd).ok_or_else(|| anyhow!("Unknown command id {:#04x}", cmd))?;
    let frame = encode_command(DEV_ADDR_HEATPUMP, cmd, address, value);
    info!("send {}", hex::encode(frame));

    port.clear_input()?;
    port.write(&frame)?;

    let deadline = Instant::now() + RAW_CAPTURE;
    let mut received = Vec::new();
    while Instant::now() < deadline {
        if port.available()? > 0 {
            received.push(port.read_byte()?);
        } else {
            thread::sleep(POLL_INTERVAL);
        }
    }

    Ok(hex::encode(received))
}

fn run<T: Transport + ?Sized>(port: &mut T, cli: &Cli, fmt: OutputFormat) -> Result<String> {
    if let Commands::Raw {
        cmd,
        address,
        value,
    } = cli.command
    {
        return cmd_raw(port, cmd, address, value);
    }

    let mut ctrl = Controller::with_timeout(port, Duration::from_millis(cli.timeout_ms));
    let ctrl = &mut ctrl;

    match &cli.command {
        Commands::Read { reg } => cmd_read(ctrl, reg, fmt),
        Commands::Write { reg, value } => cmd_write(ctrl, reg, value, cli.force),
        Commands::FrontPanel { lamp } => cmd_front_panel(ctrl, *lamp, fmt),
        Commands::Display { row } => cmd_display(ctrl, *row, fmt),
        Commands::LastError => cmd_error(ctrl, true, fmt),
        Commands::PrevError => cmd_error(ctrl, false, fmt),
        Commands::Version => cmd_version(ctrl, fmt),
        Commands::Sensors { watch } => cmd_sensors(ctrl, *watch, fmt),
        _ => Err(anyhow!("unexpected command (this is a bug!)")),
    }
}

fn do_main() -> Result<String> {
    if std::env::var("GENERATE_COMPLETION").is_ok() {
        generate(
            Bash,
            &mut cli::Cli::command(),
            "rego6xx-tool",
            &mut io::stdout(),
        );

        return Ok(String::default());
    }

    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.debug {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .format_target(false)
    .init();

    let fmt = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };

    match cli.command {
        Commands::ListRegisters => cmd_list_registers(fmt),
        _ if cli.simulate => run(&mut Simulator::new(), &cli, fmt),
        _ => {
            let mut port = port::open_port(&cli.port, cli.baudrate, cli.force)?;
            run(port.as_mut(), &cli, fmt)
        }
    }
}

fn main() {
    match do_main() {
        Ok(s) => println!("{}", s),
        Err(e) => error!("{:#}", e),
    }
}
