mod db;
mod temperature;

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

use crate::protocol::CmdId;
use db::REGS;
pub use temperature::Temperature;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    R,
    W,
    RW,
}

impl Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::R => "R".fmt(f),
            Access::W => "W".fmt(f),
            Access::RW => "RW".fmt(f),
        }
    }
}

/// How the raw 16-bit register value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Signed tenths of a degree Celsius.
    Temperature,
    /// Tenths of a percent.
    Percent,
    /// 0 = off, anything else = on.
    Switch,
    Raw,
}

/// Register banks, each read and written with its own pair of commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bank {
    FrontPanel,
    System,
    Timer,
    Extra,
}

impl Bank {
    pub fn read_cmd(self) -> CmdId {
        match self {
            Bank::FrontPanel => CmdId::ReadFrontPanel,
            Bank::System => CmdId::ReadSystemReg,
            Bank::Timer => CmdId::ReadTimerReg,
            Bank::Extra => CmdId::ReadRegExtra,
        }
    }

    pub fn write_cmd(self) -> CmdId {
        match self {
            Bank::FrontPanel => CmdId::WriteFrontPanel,
            Bank::System => CmdId::WriteSystemReg,
            Bank::Timer => CmdId::WriteTimerReg,
            Bank::Extra => CmdId::WriteRegExtra,
        }
    }
}

impl Display for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bank::FrontPanel => "panel".fmt(f),
            Bank::System => "sys".fmt(f),
            Bank::Timer => "timer".fmt(f),
            Bank::Extra => "extra".fmt(f),
        }
    }
}

impl FromStr for Bank {
    type Err = RegSpecError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "panel" => Ok(Bank::FrontPanel),
            "sys" => Ok(Bank::System),
            "timer" => Ok(Bank::Timer),
            "extra" => Ok(Bank::Extra),
            _ => Err(RegSpecError::BadBank(input.to_string())),
        }
    }
}

/// Front panel lamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontPanel {
    Power = 0x0012,
    Pump = 0x0013,
    AdditionalHeat = 0x0014,
    Boiler = 0x0015,
    Alarm = 0x0016,
}

impl FrontPanel {
    pub const ALL: [FrontPanel; 5] = [
        FrontPanel::Power,
        FrontPanel::Pump,
        FrontPanel::AdditionalHeat,
        FrontPanel::Boiler,
        FrontPanel::Alarm,
    ];

    pub const fn address(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            FrontPanel::Power => "power",
            FrontPanel::Pump => "pump",
            FrontPanel::AdditionalHeat => "heating",
            FrontPanel::Boiler => "boiler",
            FrontPanel::Alarm => "alarm",
        }
    }
}

impl Display for FrontPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name().fmt(f)
    }
}

impl FromStr for FrontPanel {
    type Err = RegSpecError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        FrontPanel::ALL
            .iter()
            .copied()
            .find(|lamp| lamp.name().eq_ignore_ascii_case(input))
            .ok_or_else(|| RegSpecError::UnknownRegister(input.to_string()))
    }
}

/// System register addresses of the Rego600.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysReg {
    // Settings
    HeatCurve = 0x0000,
    HeatCurveFineAdj = 0x0001,
    HeatCurveDiff = 0x0002,
    CurveAdjM35 = 0x0008,
    CurveAdjM30 = 0x000a,
    CurveAdjM25 = 0x000c,
    CurveAdjM20 = 0x000e,
    CurveAdjM15 = 0x0010,
    CurveAdjM10 = 0x0012,
    CurveAdjM5 = 0x0014,
    CurveAdj0 = 0x0016,
    CurveAdj5 = 0x0018,
    CurveAdj10 = 0x001a,
    CurveAdj15 = 0x001c,
    CurveAdj20 = 0x001e,
    IndoorTemp = 0x0021,
    Curve = 0x0022,

    // Control data
    Gt3Target = 0x002b,
    AddHeatPower = 0x006c,
    Gt4Target = 0x006d,
    Gt1Target = 0x006e,
    Gt1On = 0x006f,
    Gt1Off = 0x0070,
    Gt3On = 0x0073,
    Gt3Off = 0x0074,

    // Device values
    P3 = 0x01fd,
    Compressor = 0x01fe,
    AddHeat3kw = 0x01ff,
    AddHeat6kw = 0x0200,
    P1 = 0x0203,
    P2 = 0x0204,
    Vxv = 0x0205,
    Alarm = 0x0206,

    // Sensor values
    Gt1 = 0x0209,
    Gt2 = 0x020a,
    Gt3 = 0x020b,
    Gt4 = 0x020c,
    Gt5 = 0x020d,
    Gt6 = 0x020e,
    Gt8 = 0x020f,
    Gt9 = 0x0210,
    Gt10 = 0x0211,
    Gt11 = 0x0212,
    Gt3x = 0x0213,
}

impl SysReg {
    pub const fn address(self) -> u16 {
        self as u16
    }
}

/// Temperatures read by one sensor sweep, in reading order.
pub static SENSORS: &[SysReg] = &[
    SysReg::Gt1,
    SysReg::Gt2,
    SysReg::Gt3,
    SysReg::Gt4,
    SysReg::Gt5,
    SysReg::Gt6,
    SysReg::Gt8,
    SysReg::Gt9,
    SysReg::Gt10,
    SysReg::Gt11,
    SysReg::Gt3x,
    SysReg::Gt3Target,
    SysReg::Gt3On,
    SysReg::Gt3Off,
];

#[derive(Debug, Clone, Copy)]
pub struct Reg {
    pub name: &'static str,
    pub bank: Bank,
    pub address: u16,
    pub access: Access,
    pub unit: Unit,
    pub description: &'static str,
}

impl Reg {
    pub const fn new(
        name: &'static str,
        bank: Bank,
        address: u16,
        access: Access,
        unit: Unit,
        description: &'static str,
    ) -> Self {
        Reg {
            name,
            bank,
            address,
            access,
            unit,
            description,
        }
    }

    /// Renders a raw value in the register's unit.
    pub fn format_value(&self, raw: u16) -> String {
        match self.unit {
            Unit::Temperature => Temperature::from_raw(raw).to_string(),
            Unit::Percent => format!("{}.{}", raw / 10, raw % 10),
            Unit::Switch => (if raw != 0 { "on" } else { "off" }).to_string(),
            Unit::Raw => raw.to_string(),
        }
    }
}

impl Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<5} {:#06x} {:<2} {:<14} {}",
            self.bank, self.address, self.access, self.name, self.description
        )
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum RegSpecError {
    #[error("invalid register specification '{0}'")]
    BadRegSpec(String),
    #[error("unknown register bank '{0}'")]
    BadBank(String),
    #[error("unknown register '{0}'")]
    UnknownRegister(String),
}

/// Register given by catalogue name (`gt1`) or by `bank/address`
/// (`sys/0x0209`, `panel/18`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegSpec {
    Named(String),
    Address { bank: Bank, address: u16 },
}

impl RegSpec {
    /// Bank, address and, if catalogued, the register description.
    pub fn resolve(&self) -> Result<(Bank, u16, Option<Reg>), RegSpecError> {
        match self {
            RegSpec::Named(name) => find_register(name)
                .map(|reg| (reg.bank, reg.address, Some(reg)))
                .ok_or_else(|| RegSpecError::UnknownRegister(name.clone())),
            RegSpec::Address { bank, address } => {
                Ok((*bank, *address, find_by_address(*bank, *address)))
            }
        }
    }
}

impl FromStr for RegSpec {
    type Err = RegSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref ADDR_RE: Regex =
                Regex::new(r"^([[:alpha:]]+)/(?:0x([[:xdigit:]]{1,4})|(\d{1,5}))$").unwrap();
            static ref NAME_RE: Regex = Regex::new(r"^[-_[:alnum:]]+$").unwrap();
        }

        if let Some(cap) = ADDR_RE.captures(s) {
            let bank = cap[1].parse::<Bank>()?;
            let address = match (cap.get(2), cap.get(3)) {
                (Some(hex), _) => u16::from_str_radix(hex.as_str(), 16),
                (_, Some(dec)) => dec.as_str().parse::<u16>(),
                _ => return Err(RegSpecError::BadRegSpec(s.to_string())),
            }
            .map_err(|_| RegSpecError::BadRegSpec(s.to_string()))?;
            Ok(RegSpec::Address { bank, address })
        } else if NAME_RE.is_match(s) {
            Ok(RegSpec::Named(s.to_string()))
        } else {
            Err(RegSpecError::BadRegSpec(s.to_string()))
        }
    }
}

pub fn list_registers() -> Vec<Reg> {
    REGS.iter()
        .cloned()
        .sorted_by_key(|reg| (reg.bank, reg.address))
        .collect()
}

pub fn find_register(name: &str) -> Option<Reg> {
    REGS.iter()
        .cloned()
        .find(|reg| reg.name.eq_ignore_ascii_case(name))
}

pub fn find_by_address(bank: Bank, address: u16) -> Option<Reg> {
    REGS.iter()
        .cloned()
        .find(|reg| reg.bank == bank && reg.address == address)
}

pub fn sys_reg_info(reg: SysReg) -> Option<Reg> {
    find_by_address(Bank::System, reg.address())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_named() {
        assert_eq!(
            "gt3Target".parse::<RegSpec>(),
            Ok(RegSpec::Named("gt3Target".to_string()))
        );
    }

    #[test]
    fn parse_address() {
        assert_eq!(
            "sys/0x0209".parse::<RegSpec>(),
            Ok(RegSpec::Address {
                bank: Bank::System,
                address: 0x0209
            })
        );
        assert_eq!(
            "panel/18".parse::<RegSpec>(),
            Ok(RegSpec::Address {
                bank: Bank::FrontPanel,
                address: 0x0012
            })
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            "boiler/1".parse::<RegSpec>(),
            Err(RegSpecError::BadBank("boiler".to_string()))
        );
        assert_eq!(
            "sys/70000".parse::<RegSpec>(),
            Err(RegSpecError::BadRegSpec("sys/70000".to_string()))
        );
        assert!("gt 1".parse::<RegSpec>().is_err());
    }

    #[test]
    fn resolve() {
        let (bank, address, reg) = RegSpec::Named("GT1".to_string()).resolve().unwrap();
        assert_eq!((bank, address), (Bank::System, 0x0209));
        assert_eq!(reg.unwrap().unit, Unit::Temperature);

        let (_, _, reg) = "timer/0x0001".parse::<RegSpec>().unwrap().resolve().unwrap();
        assert!(reg.is_none());

        assert_eq!(
            RegSpec::Named("gt7".to_string()).resolve().unwrap_err(),
            RegSpecError::UnknownRegister("gt7".to_string())
        );
    }

    #[test]
    fn front_panel_lamps() {
        assert_eq!("Heating".parse::<FrontPanel>(), Ok(FrontPanel::AdditionalHeat));
        assert_eq!(FrontPanel::Alarm.address(), 0x0016);
        assert!("fan".parse::<FrontPanel>().is_err());
        assert_eq!(find_register("alarm").unwrap().bank, Bank::System);
        assert_eq!(find_register("lamp_alarm").unwrap().address, 0x0016);
    }

    #[test]
    fn every_sensor_is_catalogued() {
        for reg in SENSORS {
            let info = sys_reg_info(*reg).unwrap();
            assert_eq!(info.unit, Unit::Temperature);
        }
    }

    #[test]
    fn names_are_unique() {
        let regs = list_registers();
        assert_eq!(regs.iter().map(|reg| reg.name.to_lowercase()).unique().count(), regs.len());
        assert!(regs
            .windows(2)
            .all(|w| (w[0].bank, w[0].address) <= (w[1].bank, w[1].address)));
    }

    #[test]
    fn format_values() {
        let gt2 = sys_reg_info(SysReg::Gt2).unwrap();
        assert_eq!(gt2.format_value(0xfe1d), "-48.3");
        let p1 = sys_reg_info(SysReg::P1).unwrap();
        assert_eq!(p1.format_value(1), "on");
        assert_eq!(p1.format_value(0), "off");
    }
}
