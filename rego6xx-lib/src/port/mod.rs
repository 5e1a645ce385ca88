#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
pub use linux::is_port_open;
#[cfg(target_os = "macos")]
pub use macos::is_port_open;
#[cfg(target_os = "windows")]
pub use windows::is_port_open;

pub use serialport::SerialPort;

use anyhow::Result;
use core::time::Duration;
use log::debug;
use serialport::{self, ClearBuffer, DataBits, FlowControl, Parity, SerialPortType, StopBits};
use std::io;
use thiserror::Error;

use crate::protocol::Transport;

/// Line speed of the Rego6xx service port.
pub const DEFAULT_BAUDRATE: u32 = 19200;

#[derive(Error, Debug)]
pub enum OpenPortError {
    #[error("no compatible serial ports found")]
    NoCompatiblePort,
    #[error("{port_name:?} busy")]
    PortBusy { port_name: String },
}

#[derive(PartialEq)]
struct UsbId(u16, u16);

static COMPATIBLE_IDS: &[UsbId] = &[
    UsbId(0x0403, 0x6001), // FTDI FT232R USB UART
    UsbId(0x0403, 0x6015), // FTDI FT-X series
    UsbId(0x067b, 0x2303), // Prolific PL2303 Serial Port
    UsbId(0x10c4, 0xea60), // Silicon Labs CP210x UART Bridge
    UsbId(0x1a86, 0x7523), // QinHeng Electronics HL-340 USB-Serial adapter
];

/// Opens `port_name` at 8N1. `auto` picks the first known USB serial
/// adapter. Unless `force` is set, ports opened by another process are
/// refused.
pub fn open_port(
    port_name: &str,
    baudrate: u32,
    force: bool,
) -> Result<Box<dyn SerialPort + Send>> {
    let true_name: String = if port_name == "auto" {
        guess_port()?
    } else {
        port_name.to_string()
    };

    if !force && is_port_open(&true_name) {
        return Err(OpenPortError::PortBusy {
            port_name: true_name,
        }
        .into());
    }

    let port = serialport::new(&true_name, baudrate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(10))
        .open_native()?;

    debug!("open_port OK: {} @ {} baud", &true_name, baudrate);
    Ok(Box::new(port))
}

fn guess_port() -> Result<String> {
    serialport::available_ports()?
        .into_iter()
        .filter(|info| match &info.port_type {
            SerialPortType::UsbPort(usb_info) => {
                COMPATIBLE_IDS.contains(&UsbId(usb_info.vid, usb_info.pid))
                    && !is_port_open(&info.port_name)
            }
            SerialPortType::Unknown | SerialPortType::PciPort | SerialPortType::BluetoothPort => {
                false
            }
        })
        .map(|info| info.port_name)
        .next()
        .ok_or_else(|| OpenPortError::NoCompatiblePort.into())
}

/// Writes the whole frame; partial writes are retried rather than reported.
fn write_frame<W: io::Write + ?Sized>(port: &mut W, data: &[u8]) -> io::Result<usize> {
    port.write_all(data)?;
    port.flush()?;
    Ok(data.len())
}

impl Transport for dyn SerialPort + Send {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        write_frame(self, data)
    }

    fn available(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        io::Read::read_exact(self, &mut byte)?;
        Ok(byte[0])
    }

    fn clear_input(&mut self) -> io::Result<()> {
        Ok(self.clear(ClearBuffer::Input)?)
    }

    fn read_into(&mut self, buffer: &mut [u8]) -> io::Result<()> {
        io::Read::read_exact(self, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_command, CmdId, CMD_SIZE, DEV_ADDR_HEATPUMP};

    /// Takes at most `chunk` bytes per write call.
    struct Trickle {
        chunk: usize,
        sent: Vec<u8>,
        calls: usize,
    }

    impl io::Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            let n = buf.len().min(self.chunk);
            self.sent.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn frame_is_written_whole() {
        let frame = encode_command(DEV_ADDR_HEATPUMP, CmdId::ReadSystemReg, 0x0209, 0);
        let mut port = Trickle {
            chunk: 4,
            sent: Vec::new(),
            calls: 0,
        };

        assert_eq!(write_frame(&mut port, &frame).unwrap(), CMD_SIZE);
        assert_eq!(port.sent, frame);
        assert_eq!(port.calls, 3);
    }

    #[test]
    fn stalled_port_fails() {
        let mut port = Trickle {
            chunk: 0,
            sent: Vec::new(),
            calls: 0,
        };

        let err = write_frame(&mut port, &[0x81, 0x7f]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }
}
