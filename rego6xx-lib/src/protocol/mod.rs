mod error_log;
mod frame;
pub mod master;
mod response;
pub mod slave;

pub use anyhow::Result;
use num_derive::FromPrimitive;
use std::{fmt::Display, io};
use thiserror::Error;

pub use error_log::{describe_error, ErrorEntry, UNKNOWN_ERROR};
pub use frame::{
    checksum, decode_command, decode_text, decode_u16, encode_command, encode_text, encode_u16,
    Command, CMD_SIZE,
};
pub use response::{Decoded, Response, CONFIRM_RSP_SIZE, STD_RSP_SIZE, TEXT_RSP_SIZE};

/// Device address of the heat pump regulator.
pub const DEV_ADDR_HEATPUMP: u8 = 0x81;

/// Device address of the host. The regulator answers with this address.
pub const DEV_ADDR_HOST: u8 = 0x01;

#[derive(Error, Debug, PartialEq)]
pub enum ProtocolError {
    #[error("{0} response still pending")]
    Busy(ResponseKind),
    #[error("{0} response not released")]
    InUse(ResponseKind),
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
}

/// Command ids understood by the regulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum CmdId {
    ReadFrontPanel = 0x00,
    WriteFrontPanel = 0x01,
    ReadSystemReg = 0x02,
    WriteSystemReg = 0x03,
    ReadTimerReg = 0x04,
    WriteTimerReg = 0x05,
    ReadRegExtra = 0x06,
    WriteRegExtra = 0x07,
    ReadDisplay = 0x20,
    ReadLastError = 0x40,
    ReadPrevError = 0x42,
    ReadVersion = 0x7f,
}

impl CmdId {
    /// Shape of the reply the regulator sends for this command.
    pub fn response_kind(self) -> ResponseKind {
        match self {
            CmdId::ReadFrontPanel
            | CmdId::ReadSystemReg
            | CmdId::ReadTimerReg
            | CmdId::ReadRegExtra
            | CmdId::ReadVersion => ResponseKind::Standard,
            CmdId::WriteFrontPanel
            | CmdId::WriteSystemReg
            | CmdId::WriteTimerReg
            | CmdId::WriteRegExtra => ResponseKind::Confirmation,
            CmdId::ReadDisplay => ResponseKind::Display,
            CmdId::ReadLastError | CmdId::ReadPrevError => ResponseKind::ErrorLog,
        }
    }
}

/// Response slots owned by the controller. Doubles as the handle returned
/// when a command is issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    Standard,
    Confirmation,
    ErrorLog,
    Display,
}

impl Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseKind::Standard => "standard".fmt(f),
            ResponseKind::Confirmation => "confirmation".fmt(f),
            ResponseKind::ErrorLog => "error log".fmt(f),
            ResponseKind::Display => "display".fmt(f),
        }
    }
}

/// Byte stream connected to the regulator. The driver never opens or
/// closes it.
pub trait Transport {
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
    /// Number of received bytes that can be read without blocking.
    fn available(&mut self) -> io::Result<usize>;
    fn read_byte(&mut self) -> io::Result<u8>;
    /// Discard all received but unread bytes.
    fn clear_input(&mut self) -> io::Result<()>;

    fn read_into(&mut self, buffer: &mut [u8]) -> io::Result<()> {
        for byte in buffer.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(())
    }
}
