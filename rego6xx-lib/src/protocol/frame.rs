//! Command framing.
//!
//! ```text
//! *----------------*------------*------------------*------*----------*
//! |       1        |      1     |         3        |   3  |     1    |
//! *----------------*------------*------------------*------*----------*
//! | Device Address | Command ID | Register Address | Data | Checksum |
//! *----------------*------------*------------------*------*----------*
//! ```
//!
//! 16-bit fields are sent MSB first in 7-bit groups, e.g. 0x1234 becomes
//! `00 24 34`. The checksum is the XOR of register address and data bytes.

use num_traits::FromPrimitive;

use super::CmdId;

pub const CMD_SIZE: usize = 9;

pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |x, y| x ^ y)
}

pub fn encode_u16(value: u16) -> [u8; 3] {
    [
        ((value >> 14) & 0x03) as u8,
        ((value >> 7) & 0x7f) as u8,
        (value & 0x7f) as u8,
    ]
}

/// Inverse of [`encode_u16`].
pub fn decode_u16(bytes: &[u8; 3]) -> u16 {
    (u16::from(bytes[0] & 0x03) << 14)
        | (u16::from(bytes[1] & 0x7f) << 7)
        | u16::from(bytes[2] & 0x7f)
}

pub fn encode_command(dev_addr: u8, cmd: CmdId, reg_addr: u16, data: u16) -> [u8; CMD_SIZE] {
    let mut frame = [0u8; CMD_SIZE];

    frame[0] = dev_addr;
    frame[1] = cmd as u8;
    frame[2..5].copy_from_slice(&encode_u16(reg_addr));
    frame[5..8].copy_from_slice(&encode_u16(data));
    frame[8] = checksum(&frame[2..8]);
    frame
}

/// A command frame as seen by the regulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub dev_addr: u8,
    pub cmd_id: u8,
    pub reg_addr: u16,
    pub data: u16,
}

impl Command {
    pub fn cmd(&self) -> Option<CmdId> {
        CmdId::from_u8(self.cmd_id)
    }
}

/// Parses a command frame. Returns `None` on a length or checksum mismatch.
pub fn decode_command(frame: &[u8]) -> Option<Command> {
    if frame.len() != CMD_SIZE || checksum(&frame[2..8]) != frame[8] {
        return None;
    }

    Some(Command {
        dev_addr: frame[0],
        cmd_id: frame[1],
        reg_addr: decode_u16(&[frame[2], frame[3], frame[4]]),
        data: decode_u16(&[frame[5], frame[6], frame[7]]),
    })
}

/// Text is sent as nibble pairs: the first byte carries the character
/// table column, the second the row. Only the low nibble of each byte
/// counts. A trailing odd byte is ignored.
pub fn decode_text(nibbles: &[u8], skip_nul: bool) -> String {
    nibbles
        .chunks_exact(2)
        .map(|pair| ((pair[0] & 0x0f) << 4) | (pair[1] & 0x0f))
        .filter(|&c| !(skip_nul && c == 0))
        .map(char::from)
        .collect()
}

/// Inverse of [`decode_text`]. Characters outside Latin-1 are sent as `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .flat_map(|c| [c >> 4, c & 0x0f])
        .collect()
}
