use log::{debug, warn};
use std::time::{Duration, Instant};

use super::{
    encode_command, CmdId, ProtocolError, Response, ResponseKind, Result, Transport, CMD_SIZE,
    DEV_ADDR_HEATPUMP, DEV_ADDR_HOST,
};
use crate::regs::{Bank, FrontPanel, SysReg};

/// Time the regulator gets to answer, counted from the first poll.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Rego6xx master.
///
/// Sends one command at a time and collects the reply into one of four
/// reusable response slots. Nothing blocks: after issuing a command the
/// caller keeps calling [`Controller::poll`] until the slot is no longer
/// pending, reads it and hands it back with [`Controller::release`].
pub struct Controller<'a, T: Transport + ?Sized> {
    port: &'a mut T,
    timeout: Duration,
    current: Option<ResponseKind>,
    std_rsp: Response,
    confirm_rsp: Response,
    error_rsp: Response,
    display_rsp: Response,
}

impl<'a, T: Transport + ?Sized> Controller<'a, T> {
    pub fn new(port: &'a mut T) -> Self {
        Self::with_timeout(port, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(port: &'a mut T, timeout: Duration) -> Self {
        Self {
            port,
            timeout,
            current: None,
            std_rsp: Response::new(ResponseKind::Standard),
            confirm_rsp: Response::new(ResponseKind::Confirmation),
            error_rsp: Response::new(ResponseKind::ErrorLog),
            display_rsp: Response::new(ResponseKind::Display),
        }
    }

    pub fn port(&self) -> &T {
        &*self.port
    }

    pub fn port_mut(&mut self) -> &mut T {
        &mut *self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn response(&self, kind: ResponseKind) -> &Response {
        match kind {
            ResponseKind::Standard => &self.std_rsp,
            ResponseKind::Confirmation => &self.confirm_rsp,
            ResponseKind::ErrorLog => &self.error_rsp,
            ResponseKind::Display => &self.display_rsp,
        }
    }

    fn response_mut(&mut self, kind: ResponseKind) -> &mut Response {
        match kind {
            ResponseKind::Standard => &mut self.std_rsp,
            ResponseKind::Confirmation => &mut self.confirm_rsp,
            ResponseKind::ErrorLog => &mut self.error_rsp,
            ResponseKind::Display => &mut self.display_rsp,
        }
    }

    /// Whether a command is still waiting for its reply.
    pub fn is_pending(&self) -> bool {
        self.current
            .map_or(false, |kind| self.response(kind).is_pending())
    }

    /// The slot written by the most recent command, until it is released.
    pub fn current(&self) -> Option<ResponseKind> {
        self.current
    }

    /// Complete, valid and addressed to the host.
    pub fn accepted(&self, kind: ResponseKind) -> bool {
        let rsp = self.response(kind);
        !rsp.is_pending() && rsp.is_valid() && rsp.dev_addr() == Some(DEV_ADDR_HOST)
    }

    pub fn read_register(&mut self, addr: u16) -> Result<ResponseKind> {
        self.read(Bank::System, addr)
    }

    pub fn write_register(&mut self, addr: u16, value: u16) -> Result<ResponseKind> {
        self.write(Bank::System, addr, value)
    }

    pub fn read_sys_reg(&mut self, reg: SysReg) -> Result<ResponseKind> {
        self.read(Bank::System, reg.address())
    }

    pub fn write_sys_reg(&mut self, reg: SysReg, value: u16) -> Result<ResponseKind> {
        self.write(Bank::System, reg.address(), value)
    }

    pub fn read_front_panel(&mut self, lamp: FrontPanel) -> Result<ResponseKind> {
        self.read(Bank::FrontPanel, lamp.address())
    }

    pub fn write_front_panel(&mut self, addr: u16, value: u16) -> Result<ResponseKind> {
        self.write(Bank::FrontPanel, addr, value)
    }

    pub fn read(&mut self, bank: Bank, addr: u16) -> Result<ResponseKind> {
        self.issue(bank.read_cmd(), addr, 0)
    }

    pub fn write(&mut self, bank: Bank, addr: u16, value: u16) -> Result<ResponseKind> {
        self.issue(bank.write_cmd(), addr, value)
    }

    /// Reads one display row (0..=3).
    pub fn read_display(&mut self, row: u8) -> Result<ResponseKind> {
        self.issue(CmdId::ReadDisplay, row.into(), 0)
    }

    pub fn read_last_error(&mut self) -> Result<ResponseKind> {
        self.issue(CmdId::ReadLastError, 0, 0)
    }

    pub fn read_previous_error(&mut self) -> Result<ResponseKind> {
        self.issue(CmdId::ReadPrevError, 0, 0)
    }

    /// A Rego600 answers 0x0258.
    pub fn read_version(&mut self) -> Result<ResponseKind> {
        self.issue(CmdId::ReadVersion, 0, 0)
    }

    /// Sends `cmd` and marks the matching slot pending.
    ///
    /// Refused with [`ProtocolError::Busy`] while any reply is outstanding
    /// and with [`ProtocolError::InUse`] while the slot has not been
    /// released. A refused command touches neither the slots nor the port.
    pub fn issue(&mut self, cmd: CmdId, addr: u16, data: u16) -> Result<ResponseKind> {
        if let Some(kind) = self.current.filter(|&kind| self.response(kind).is_pending()) {
            return Err(ProtocolError::Busy(kind).into());
        }

        let kind = cmd.response_kind();
        if self.response(kind).is_used() {
            return Err(ProtocolError::InUse(kind).into());
        }

        let frame = encode_command(DEV_ADDR_HEATPUMP, cmd, addr, data);
        debug!("{:?} {:#06x} {:#06x}", cmd, addr, data);
        debug!("send {:02X?}", frame);

        let written = self.port.write(&frame)?;
        if written != CMD_SIZE {
            return Err(ProtocolError::ShortWrite {
                written,
                expected: CMD_SIZE,
            }
            .into());
        }

        self.response_mut(kind).acquire();
        self.current = Some(kind);
        Ok(kind)
    }

    pub fn poll(&mut self) -> Result<()> {
        self.poll_at(Instant::now())
    }

    /// Advances the pending response, if any, as of `now`.
    pub fn poll_at(&mut self, now: Instant) -> Result<()> {
        let kind = match self.current {
            Some(kind) => kind,
            None => return Ok(()),
        };

        let rsp = match kind {
            ResponseKind::Standard => &mut self.std_rsp,
            ResponseKind::Confirmation => &mut self.confirm_rsp,
            ResponseKind::ErrorLog => &mut self.error_rsp,
            ResponseKind::Display => &mut self.display_rsp,
        };
        rsp.receive(&mut *self.port, now, self.timeout)?;
        Ok(())
    }

    /// Hands a slot back. A slot that is still pending cannot be released.
    pub fn release(&mut self, kind: ResponseKind) {
        if self.response(kind).is_pending() {
            warn!("cannot release pending {} response", kind);
            return;
        }

        self.response_mut(kind).release();
        if self.current == Some(kind) {
            self.current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::slave::Simulator;
    use crate::protocol::{Decoded, STD_RSP_SIZE};
    use std::io;

    fn protocol_error(err: anyhow::Error) -> Option<ProtocolError> {
        err.downcast::<ProtocolError>().ok()
    }

    /// Polls until the current response completes; two ticks suffice when
    /// the simulator answers immediately.
    fn complete<T: Transport + ?Sized>(ctrl: &mut Controller<T>, now: Instant) {
        ctrl.poll_at(now).unwrap();
        ctrl.poll_at(now).unwrap();
    }

    /// Accepts only the first `limit` bytes of every write.
    struct ShortLink {
        limit: usize,
        writes: usize,
    }

    impl Transport for ShortLink {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            Ok(data.len().min(self.limit))
        }

        fn available(&mut self) -> io::Result<usize> {
            Ok(0)
        }

        fn read_byte(&mut self) -> io::Result<u8> {
            Err(io::Error::from(io::ErrorKind::WouldBlock))
        }

        fn clear_input(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn read_gt1() {
        let mut sim = Simulator::new();
        let mut ctrl = Controller::new(&mut sim);
        let now = Instant::now();

        let kind = ctrl.read_sys_reg(SysReg::Gt1).unwrap();
        assert_eq!(kind, ResponseKind::Standard);
        assert!(ctrl.is_pending());
        assert_eq!(
            ctrl.port().last_command_frame(),
            Some([0x81, 0x02, 0x00, 0x04, 0x09, 0x00, 0x00, 0x00, 0x0D])
        );

        complete(&mut ctrl, now);
        assert!(!ctrl.is_pending());
        assert!(ctrl.accepted(kind));
        assert_eq!(ctrl.response(kind).value(), Some(240));

        ctrl.release(kind);
        assert_eq!(ctrl.current(), None);
        assert!(!ctrl.response(kind).is_used());
    }

    #[test]
    fn read_version() {
        let mut sim = Simulator::new();
        let mut ctrl = Controller::new(&mut sim);

        let kind = ctrl.read_version().unwrap();
        complete(&mut ctrl, Instant::now());
        assert_eq!(ctrl.response(kind).value(), Some(0x0258));
    }

    #[test]
    fn second_command_is_refused_while_pending() {
        let mut sim = Simulator::new();
        sim.set_mute(true);
        let mut ctrl = Controller::new(&mut sim);
        let now = Instant::now();

        let first = ctrl.read_register(0x0209).unwrap();
        ctrl.poll_at(now).unwrap();
        let raw_before = ctrl.response(first).raw().to_vec();

        for err in [
            ctrl.read_register(0x020a).unwrap_err(),
            ctrl.write_register(0x002b, 485).unwrap_err(),
            ctrl.read_last_error().unwrap_err(),
            ctrl.read_display(0).unwrap_err(),
        ] {
            assert_eq!(protocol_error(err), Some(ProtocolError::Busy(ResponseKind::Standard)));
        }

        assert_eq!(ctrl.port().commands().len(), 1);
        assert_eq!(ctrl.current(), Some(first));
        assert!(ctrl.response(first).is_pending());
        assert_eq!(ctrl.response(first).raw(), raw_before.as_slice());
        assert!(!ctrl.response(ResponseKind::Confirmation).is_used());
    }

    #[test]
    fn unreleased_slot_is_refused() {
        let mut sim = Simulator::new();
        let mut ctrl = Controller::new(&mut sim);

        let kind = ctrl.read_version().unwrap();
        complete(&mut ctrl, Instant::now());

        let err = ctrl.read_register(0x0209).unwrap_err();
        assert_eq!(protocol_error(err), Some(ProtocolError::InUse(ResponseKind::Standard)));
        assert_eq!(ctrl.response(kind).value(), Some(0x0258));

        // A different slot is free once nothing is pending.
        let other = ctrl.write_register(0x002b, 485).unwrap();
        assert_eq!(other, ResponseKind::Confirmation);
    }

    #[test]
    fn release_pending_is_ignored() {
        let mut sim = Simulator::new();
        sim.set_mute(true);
        let mut ctrl = Controller::new(&mut sim);

        let kind = ctrl.read_version().unwrap();
        ctrl.release(kind);
        assert!(ctrl.response(kind).is_used());
        assert!(ctrl.response(kind).is_pending());
        assert_eq!(ctrl.current(), Some(kind));
    }

    #[test]
    fn timeout() {
        let mut sim = Simulator::new();
        sim.set_mute(true);
        let mut ctrl = Controller::new(&mut sim);
        let start = Instant::now();

        let kind = ctrl.read_register(0x0209).unwrap();
        ctrl.poll_at(start).unwrap();
        ctrl.poll_at(start + Duration::from_millis(29_999)).unwrap();
        assert!(ctrl.is_pending());

        ctrl.poll_at(start + DEFAULT_TIMEOUT).unwrap();
        assert!(!ctrl.is_pending());
        assert!(!ctrl.response(kind).is_valid());
        assert!(!ctrl.accepted(kind));
        assert_eq!(ctrl.response(kind).raw(), &[0u8; STD_RSP_SIZE]);
        assert_eq!(ctrl.port().input_clears(), 1);

        // Late bytes stay in the port; the timed out slot ignores them.
        ctrl.port_mut().inject(&[0x01, 0x00, 0x01, 0x70, 0x71]);
        for n in 2..6 {
            ctrl.poll_at(start + DEFAULT_TIMEOUT * n).unwrap();
        }
        assert_eq!(ctrl.port().input_clears(), 1);
        assert_eq!(ctrl.port().pending_bytes(), STD_RSP_SIZE);
        assert!(!ctrl.response(kind).is_valid());
    }

    #[test]
    fn timeout_counts_from_first_poll() {
        let mut sim = Simulator::new();
        sim.set_mute(true);
        let mut ctrl = Controller::with_timeout(&mut sim, Duration::from_millis(100));
        let start = Instant::now();

        ctrl.read_version().unwrap();
        ctrl.poll_at(start + Duration::from_secs(60)).unwrap();
        assert!(ctrl.is_pending());

        ctrl.poll_at(start + Duration::from_millis(60_099)).unwrap();
        assert!(ctrl.is_pending());
        ctrl.poll_at(start + Duration::from_millis(60_100)).unwrap();
        assert!(!ctrl.is_pending());
    }

    #[test]
    fn release_then_reacquire() {
        let mut sim = Simulator::new();
        let mut ctrl = Controller::new(&mut sim);
        let now = Instant::now();

        let kind = ctrl.read_version().unwrap();
        complete(&mut ctrl, now);
        assert_eq!(ctrl.response(kind).value(), Some(0x0258));
        ctrl.release(kind);

        ctrl.port_mut().set_mute(true);
        let kind = ctrl.read_register(0x0209).unwrap();
        assert_eq!(ctrl.response(kind).value(), None);
        ctrl.poll_at(now).unwrap();
        assert_eq!(ctrl.response(kind).value(), None);

        ctrl.port_mut().inject(&[0x01, 0x00, 0x00, 0x07, 0x07]);
        ctrl.poll_at(now).unwrap();
        assert_eq!(ctrl.response(kind).value(), Some(7));
    }

    #[test]
    fn write_register_confirmed() {
        let mut sim = Simulator::new();
        let mut ctrl = Controller::new(&mut sim);

        let kind = ctrl.write_sys_reg(SysReg::Gt3Target, 485).unwrap();
        complete(&mut ctrl, Instant::now());
        assert!(ctrl.accepted(kind));
        assert!(ctrl.response(kind).is_confirmed());
        assert_eq!(ctrl.port().register(Bank::System, 0x002b), Some(485));
    }

    #[test]
    fn last_error() {
        let mut sim = Simulator::new();
        let mut ctrl = Controller::new(&mut sim);

        let kind = ctrl.read_last_error().unwrap();
        assert_eq!(kind, ResponseKind::ErrorLog);
        complete(&mut ctrl, Instant::now());

        let entry = ctrl.response(kind).error().unwrap();
        assert_eq!(entry.id, 22);
        assert_eq!(entry.log, "021009 18:21:03");
    }

    #[test]
    fn display_row() {
        let mut sim = Simulator::new();
        sim.set_display_row(1, "GT1 24.0");
        let mut ctrl = Controller::new(&mut sim);

        let kind = ctrl.read_display(1).unwrap();
        complete(&mut ctrl, Instant::now());
        assert_eq!(
            ctrl.response(kind).decode(),
            Some(Decoded::Display("GT1 24.0".to_string()))
        );
    }

    #[test]
    fn front_panel() {
        let mut sim = Simulator::new();
        let mut ctrl = Controller::new(&mut sim);

        let kind = ctrl.read_front_panel(FrontPanel::Power).unwrap();
        complete(&mut ctrl, Instant::now());
        assert_eq!(ctrl.response(kind).value(), Some(1));
        assert_eq!(
            ctrl.port().commands().last().map(|cmd| cmd.reg_addr),
            Some(0x0012)
        );
    }

    #[test]
    fn foreign_sender_is_not_accepted() {
        let mut sim = Simulator::new();
        sim.set_mute(true);
        let mut ctrl = Controller::new(&mut sim);
        let now = Instant::now();

        let kind = ctrl.read_version().unwrap();
        ctrl.poll_at(now).unwrap();
        ctrl.port_mut().inject(&[0x02, 0x00, 0x04, 0x58, 0x5C]);
        ctrl.poll_at(now).unwrap();

        assert!(ctrl.response(kind).is_valid());
        assert_eq!(ctrl.response(kind).dev_addr(), Some(0x02));
        assert!(!ctrl.accepted(kind));
    }

    #[test]
    fn poll_without_command() {
        let mut sim = Simulator::new();
        let mut ctrl = Controller::new(&mut sim);

        ctrl.poll().unwrap();
        assert!(!ctrl.is_pending());
        assert_eq!(ctrl.port().input_clears(), 0);
    }

    #[test]
    fn short_write_leaves_slot_free() {
        let mut link = ShortLink {
            limit: 4,
            writes: 0,
        };
        let mut ctrl = Controller::new(&mut link);

        let err = ctrl.read_sys_reg(SysReg::Gt1).unwrap_err();
        assert_eq!(
            protocol_error(err),
            Some(ProtocolError::ShortWrite {
                written: 4,
                expected: CMD_SIZE
            })
        );
        assert_eq!(ctrl.current(), None);
        assert!(!ctrl.is_pending());
        assert!(!ctrl.response(ResponseKind::Standard).is_used());

        // Nothing is held back, so the next command goes out.
        ctrl.port_mut().limit = CMD_SIZE;
        assert_eq!(ctrl.read_version().unwrap(), ResponseKind::Standard);
        assert_eq!(ctrl.port().writes, 2);
    }
}
