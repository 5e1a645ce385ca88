use log::{debug, warn};
use std::{
    io,
    time::{Duration, Instant},
};

use super::{checksum, decode_text, decode_u16, ErrorEntry, ResponseKind, Transport};

pub const STD_RSP_SIZE: usize = 5;
pub const CONFIRM_RSP_SIZE: usize = 1;
pub const TEXT_RSP_SIZE: usize = 42;

const ERROR_ID_IDX: usize = 1;
const ERROR_LOG_IDX: usize = 3;
const ERROR_LOG_LEN: usize = 30;
const DISPLAY_IDX: usize = 1;
const DISPLAY_LEN: usize = 40;

#[derive(Debug, Clone)]
enum Payload {
    Standard([u8; STD_RSP_SIZE]),
    Confirmation([u8; CONFIRM_RSP_SIZE]),
    ErrorLog([u8; TEXT_RSP_SIZE]),
    Display([u8; TEXT_RSP_SIZE]),
}

impl Payload {
    fn new(kind: ResponseKind) -> Self {
        match kind {
            ResponseKind::Standard => Payload::Standard([0; STD_RSP_SIZE]),
            ResponseKind::Confirmation => Payload::Confirmation([0; CONFIRM_RSP_SIZE]),
            ResponseKind::ErrorLog => Payload::ErrorLog([0; TEXT_RSP_SIZE]),
            ResponseKind::Display => Payload::Display([0; TEXT_RSP_SIZE]),
        }
    }

    fn kind(&self) -> ResponseKind {
        match self {
            Payload::Standard(_) => ResponseKind::Standard,
            Payload::Confirmation(_) => ResponseKind::Confirmation,
            Payload::ErrorLog(_) => ResponseKind::ErrorLog,
            Payload::Display(_) => ResponseKind::Display,
        }
    }

    fn buffer(&self) -> &[u8] {
        match self {
            Payload::Standard(b) => b,
            Payload::Confirmation(b) => b,
            Payload::ErrorLog(b) | Payload::Display(b) => b,
        }
    }

    fn buffer_mut(&mut self) -> &mut [u8] {
        match self {
            Payload::Standard(b) => b,
            Payload::Confirmation(b) => b,
            Payload::ErrorLog(b) | Payload::Display(b) => b,
        }
    }

    // Confirmations are a single address byte without checksum.
    fn checksum_ok(&self) -> bool {
        match self {
            Payload::Confirmation(_) => true,
            Payload::Standard(b) => trailing_checksum_ok(b),
            Payload::ErrorLog(b) | Payload::Display(b) => trailing_checksum_ok(b),
        }
    }

    fn decode(&self) -> Decoded {
        match self {
            Payload::Standard(b) => Decoded::Value(decode_u16(&[b[1], b[2], b[3]])),
            Payload::Confirmation(_) => Decoded::Confirmed,
            Payload::ErrorLog(b) => Decoded::Error(ErrorEntry {
                id: ((b[ERROR_ID_IDX] & 0x0f) << 4) | (b[ERROR_ID_IDX + 1] & 0x0f),
                log: decode_text(&b[ERROR_LOG_IDX..ERROR_LOG_IDX + ERROR_LOG_LEN], false),
            }),
            Payload::Display(b) => {
                Decoded::Display(decode_text(&b[DISPLAY_IDX..DISPLAY_IDX + DISPLAY_LEN], true))
            }
        }
    }
}

/// Checksum over everything between the address byte and the last byte.
fn trailing_checksum_ok(frame: &[u8]) -> bool {
    let last = frame.len() - 1;
    frame[last] == checksum(&frame[1..last])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// `deadline` is armed on the first poll after the command was sent.
    Pending { deadline: Option<Instant> },
    Complete,
    TimedOut,
}

/// Decoded payload of a valid response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Value(u16),
    Confirmed,
    Error(ErrorEntry),
    Display(String),
}

/// Reusable response slot.
///
/// A slot is `used` from the moment a command is issued for it until the
/// caller releases it, and `pending` until a complete frame arrived or the
/// response timed out. Decoded content is only available when the slot is
/// not pending and [`Response::is_valid`] holds.
#[derive(Debug, Clone)]
pub struct Response {
    payload: Payload,
    used: bool,
    state: State,
}

impl Response {
    pub(crate) fn new(kind: ResponseKind) -> Self {
        Self {
            payload: Payload::new(kind),
            used: false,
            state: State::Idle,
        }
    }

    pub fn kind(&self) -> ResponseKind {
        self.payload.kind()
    }

    pub fn size(&self) -> usize {
        self.payload.buffer().len()
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        self.state == State::TimedOut
    }

    pub fn is_valid(&self) -> bool {
        self.state == State::Complete && self.payload.checksum_ok()
    }

    /// Address byte of a valid response. The regulator echoes the host
    /// address; checking it is up to the caller.
    pub fn dev_addr(&self) -> Option<u8> {
        self.is_valid().then(|| self.payload.buffer()[0])
    }

    /// Raw response bytes. All zero after a timeout.
    pub fn raw(&self) -> &[u8] {
        self.payload.buffer()
    }

    pub fn decode(&self) -> Option<Decoded> {
        self.is_valid().then(|| self.payload.decode())
    }

    pub fn value(&self) -> Option<u16> {
        match self.decode()? {
            Decoded::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.decode(), Some(Decoded::Confirmed))
    }

    pub fn error(&self) -> Option<ErrorEntry> {
        match self.decode()? {
            Decoded::Error(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<String> {
        match self.decode()? {
            Decoded::Display(text) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn acquire(&mut self) {
        self.payload.buffer_mut().fill(0);
        self.used = true;
        self.state = State::Pending { deadline: None };
    }

    pub(crate) fn release(&mut self) {
        debug_assert!(!self.is_pending());
        self.used = false;
        self.state = State::Idle;
    }

    /// Advances the receive state machine by one tick.
    pub(crate) fn receive<T>(
        &mut self,
        port: &mut T,
        now: Instant,
        timeout: Duration,
    ) -> io::Result<()>
    where
        T: Transport + ?Sized,
    {
        let deadline = match self.state {
            State::Pending { deadline } => deadline,
            _ => return Ok(()),
        };

        let size = self.size();
        match deadline {
            None => {
                self.state = State::Pending {
                    deadline: Some(now + timeout),
                };
            }
            Some(deadline) if now >= deadline => {
                warn!("{} response timed out", self.kind());
                self.payload.buffer_mut().fill(0);
                self.state = State::TimedOut;
                port.clear_input()?;
            }
            Some(_) => {
                if port.available()? >= size {
                    if let Err(e) = port.read_into(self.payload.buffer_mut()) {
                        warn!("{} response read failed: {}", self.kind(), e);
                        self.payload.buffer_mut().fill(0);
                        self.state = State::TimedOut;
                        return Err(e);
                    }
                    debug!("recv {:02X?}", self.payload.buffer());
                    self.state = State::Complete;
                }
            }
        }
        Ok(())
    }
}
