use log::{debug, warn};
use std::{
    collections::{HashMap, VecDeque},
    io,
};

use super::{
    checksum, decode_command, encode_text, encode_u16, CmdId, Command, Transport, CMD_SIZE,
    DEV_ADDR_HEATPUMP, DEV_ADDR_HOST,
};
use crate::regs::Bank;

/// Version reported by a Rego600.
pub const REGO600_VERSION: u16 = 0x0258;

/// Value of system registers nobody has written yet.
const DEFAULT_SYS_VALUE: u16 = 240;

/// Commands kept for [`Simulator::commands`]; older ones are dropped.
pub const COMMAND_HISTORY: usize = 256;

const DISPLAY_ROWS: usize = 4;
const DISPLAY_COLS: usize = 20;

/// Error log record id 22 logged at `021009 18:21:03`.
const ERROR_RECORD: [u8; 40] = [
    0x01, 0x06, 0x03, 0x00, 0x03, 0x02, 0x03, 0x01, 0x03, 0x00, 0x03, 0x00, 0x03, 0x09, 0x02,
    0x00, 0x03, 0x01, 0x03, 0x08, 0x03, 0x0a, 0x03, 0x02, 0x03, 0x01, 0x03, 0x0a, 0x03, 0x00,
    0x03, 0x03, 0x00, 0x00, 0x00, 0x01, 0x04, 0x06, 0x00, 0x02,
];

fn bank_of(cmd: CmdId) -> Option<Bank> {
    match cmd {
        CmdId::ReadFrontPanel | CmdId::WriteFrontPanel => Some(Bank::FrontPanel),
        CmdId::ReadSystemReg | CmdId::WriteSystemReg => Some(Bank::System),
        CmdId::ReadTimerReg | CmdId::WriteTimerReg => Some(Bank::Timer),
        CmdId::ReadRegExtra | CmdId::WriteRegExtra => Some(Bank::Extra),
        _ => None,
    }
}

/// 5 byte reply carrying one value.
pub fn std_frame(value: u16) -> [u8; 5] {
    let mut frame = [DEV_ADDR_HOST, 0, 0, 0, 0];
    frame[1..4].copy_from_slice(&encode_u16(value));
    frame[4] = checksum(&frame[1..4]);
    frame
}

/// 42 byte reply: host address, 40 payload bytes, checksum.
pub fn text_frame(payload: &[u8; 40]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 2);
    frame.push(DEV_ADDR_HOST);
    frame.extend_from_slice(payload);
    frame.push(checksum(payload));
    frame
}

/// Rego6xx regulator stand-in.
///
/// Implements [`Transport`] from the master's point of view: bytes the
/// master writes are parsed as commands, replies are queued as bytes to
/// read. Register writes are remembered and returned by later reads.
#[derive(Debug, Default)]
pub struct Simulator {
    rx: VecDeque<u8>,
    partial: Vec<u8>,
    commands: Vec<Command>,
    last_frame: Option<[u8; CMD_SIZE]>,
    registers: HashMap<(Bank, u16), u16>,
    display: [String; DISPLAY_ROWS],
    mute: bool,
    clears: usize,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A muted simulator records commands but never answers.
    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn set_register(&mut self, bank: Bank, addr: u16, value: u16) {
        self.registers.insert((bank, addr), value);
    }

    /// Value stored by a write or [`Simulator::set_register`].
    pub fn register(&self, bank: Bank, addr: u16) -> Option<u16> {
        self.registers.get(&(bank, addr)).copied()
    }

    /// Text shown on display row 0..=3, cut to 20 characters.
    pub fn set_display_row(&mut self, row: u8, text: &str) {
        if let Some(line) = self.display.get_mut(usize::from(row)) {
            *line = text.chars().take(DISPLAY_COLS).collect();
        }
    }

    /// Most recent commands received, oldest first.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn last_command_frame(&self) -> Option<[u8; CMD_SIZE]> {
        self.last_frame
    }

    /// How often the master discarded its input.
    pub fn input_clears(&self) -> usize {
        self.clears
    }

    /// Bytes queued for the master.
    pub fn pending_bytes(&self) -> usize {
        self.rx.len()
    }

    /// Queue arbitrary bytes for the master.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Takes all queued reply bytes.
    pub fn drain_output(&mut self) -> Vec<u8> {
        self.rx.drain(..).collect()
    }

    /// Feeds bytes sent by the master. Complete frames are answered;
    /// undecodable data is skipped one byte at a time until a frame lines up.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.partial.extend_from_slice(bytes);

        while self.partial.len() >= CMD_SIZE {
            let cmd = match decode_command(&self.partial[..CMD_SIZE]) {
                Some(cmd) if cmd.dev_addr == DEV_ADDR_HEATPUMP => cmd,
                _ => {
                    warn!("skipping {:#04x}", self.partial[0]);
                    self.partial.remove(0);
                    continue;
                }
            };

            let mut frame = [0u8; CMD_SIZE];
            frame.copy_from_slice(&self.partial[..CMD_SIZE]);
            self.partial.drain(..CMD_SIZE);
            debug!("recv {:02X?}", frame);

            self.last_frame = Some(frame);
            if self.commands.len() == COMMAND_HISTORY {
                self.commands.remove(0);
            }
            self.commands.push(cmd);

            let reply = self.respond(&cmd);
            if self.mute {
                debug!("muted, not answering");
            } else {
                debug!("send {:02X?}", reply);
                self.rx.extend(reply);
            }
        }
    }

    fn respond(&mut self, cmd: &Command) -> Vec<u8> {
        let id = match cmd.cmd() {
            Some(id) => id,
            None => {
                warn!("unknown command {:#04x}", cmd.cmd_id);
                return std_frame(0).to_vec();
            }
        };

        match id {
            CmdId::WriteFrontPanel
            | CmdId::WriteSystemReg
            | CmdId::WriteTimerReg
            | CmdId::WriteRegExtra => {
                if let Some(bank) = bank_of(id) {
                    self.registers.insert((bank, cmd.reg_addr), cmd.data);
                }
                vec![DEV_ADDR_HOST]
            }
            CmdId::ReadFrontPanel
            | CmdId::ReadSystemReg
            | CmdId::ReadTimerReg
            | CmdId::ReadRegExtra => {
                let value = bank_of(id)
                    .and_then(|bank| self.register(bank, cmd.reg_addr))
                    .unwrap_or(match id {
                        CmdId::ReadFrontPanel => 1,
                        CmdId::ReadSystemReg => DEFAULT_SYS_VALUE,
                        _ => 0,
                    });
                std_frame(value).to_vec()
            }
            CmdId::ReadDisplay => {
                let text = self
                    .display
                    .get(usize::from(cmd.reg_addr))
                    .map(String::as_str)
                    .unwrap_or_default();
                let mut payload = [0u8; 40];
                let nibbles = encode_text(text);
                payload[..nibbles.len()].copy_from_slice(&nibbles);
                text_frame(&payload)
            }
            CmdId::ReadLastError | CmdId::ReadPrevError => text_frame(&ERROR_RECORD),
            CmdId::ReadVersion => std_frame(REGO600_VERSION).to_vec(),
        }
    }
}

impl Transport for Simulator {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.feed(data);
        Ok(data.len())
    }

    fn available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.rx
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no data"))
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.rx.clear();
        self.clears += 1;
        Ok(())
    }
}
