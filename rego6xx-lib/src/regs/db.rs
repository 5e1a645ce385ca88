use super::{
    Access::{R, RW},
    Bank, FrontPanel, Reg, SysReg,
    Unit::{Percent, Raw, Switch, Temperature},
};

const fn panel(name: &'static str, lamp: FrontPanel, description: &'static str) -> Reg {
    Reg::new(name, Bank::FrontPanel, lamp.address(), R, Switch, description)
}

const fn sys(
    name: &'static str,
    reg: SysReg,
    access: super::Access,
    unit: super::Unit,
    description: &'static str,
) -> Reg {
    Reg::new(name, Bank::System, reg.address(), access, unit, description)
}

#[rustfmt::skip]
pub(super) static REGS: &[Reg] = &[
    panel("lamp_power",    FrontPanel::Power,          "Power lamp"),
    panel("lamp_pump",     FrontPanel::Pump,           "Pump lamp"),
    panel("lamp_heating",  FrontPanel::AdditionalHeat, "Additional heat lamp"),
    panel("lamp_boiler",   FrontPanel::Boiler,         "Boiler lamp"),
    panel("lamp_alarm",    FrontPanel::Alarm,          "Alarm lamp"),

    sys("heatCurve",       SysReg::HeatCurve,        RW, Raw,         "Heat curve"),
    sys("heatCurveFine",   SysReg::HeatCurveFineAdj, RW, Temperature, "Heat curve fine adjustment"),
    sys("heatCurveDiff",   SysReg::HeatCurveDiff,    RW, Temperature, "Heat curve coupling difference"),
    sys("curveAdjM35",     SysReg::CurveAdjM35,      RW, Temperature, "Adjust curve at -35"),
    sys("curveAdjM30",     SysReg::CurveAdjM30,      RW, Temperature, "Adjust curve at -30"),
    sys("curveAdjM25",     SysReg::CurveAdjM25,      RW, Temperature, "Adjust curve at -25"),
    sys("curveAdjM20",     SysReg::CurveAdjM20,      RW, Temperature, "Adjust curve at -20"),
    sys("curveAdjM15",     SysReg::CurveAdjM15,      RW, Temperature, "Adjust curve at -15"),
    sys("curveAdjM10",     SysReg::CurveAdjM10,      RW, Temperature, "Adjust curve at -10"),
    sys("curveAdjM5",      SysReg::CurveAdjM5,       RW, Temperature, "Adjust curve at -5"),
    sys("curveAdj0",       SysReg::CurveAdj0,        RW, Temperature, "Adjust curve at 0"),
    sys("curveAdj5",       SysReg::CurveAdj5,        RW, Temperature, "Adjust curve at +5"),
    sys("curveAdj10",      SysReg::CurveAdj10,       RW, Temperature, "Adjust curve at +10"),
    sys("curveAdj15",      SysReg::CurveAdj15,       RW, Temperature, "Adjust curve at +15"),
    sys("curveAdj20",      SysReg::CurveAdj20,       RW, Temperature, "Adjust curve at +20"),
    sys("indoorTemp",      SysReg::IndoorTemp,       RW, Temperature, "Indoor temperature setting"),
    sys("curve",           SysReg::Curve,            RW, Temperature, "Curve influence by indoor temperature"),

    sys("gt3Target",       SysReg::Gt3Target,        RW, Temperature, "GT3 target value"),
    sys("addHeatPower",    SysReg::AddHeatPower,     R,  Percent,     "Additional heat power"),
    sys("gt4Target",       SysReg::Gt4Target,        R,  Temperature, "GT4 target value"),
    sys("gt1Target",       SysReg::Gt1Target,        R,  Temperature, "GT1 target value"),
    sys("gt1On",           SysReg::Gt1On,            R,  Temperature, "GT1 on value"),
    sys("gt1Off",          SysReg::Gt1Off,           R,  Temperature, "GT1 off value"),
    sys("gt3On",           SysReg::Gt3On,            RW, Temperature, "GT3 on value"),
    sys("gt3Off",          SysReg::Gt3Off,           RW, Temperature, "GT3 off value"),

    sys("p3",              SysReg::P3,               R,  Switch,      "Ground loop pump (P3)"),
    sys("compressor",      SysReg::Compressor,       R,  Switch,      "Compressor"),
    sys("addHeat3kW",      SysReg::AddHeat3kw,       R,  Switch,      "Additional heat 3 kW"),
    sys("addHeat6kW",      SysReg::AddHeat6kw,       R,  Switch,      "Additional heat 6 kW"),
    sys("p1",              SysReg::P1,               R,  Switch,      "Radiator pump (P1)"),
    sys("p2",              SysReg::P2,               R,  Switch,      "Heat carrier pump (P2)"),
    sys("vxv",             SysReg::Vxv,              R,  Switch,      "Three-way valve (VXV)"),
    sys("alarm",           SysReg::Alarm,            R,  Switch,      "Alarm"),

    sys("gt1",             SysReg::Gt1,              R,  Temperature, "Radiator return (GT1)"),
    sys("gt2",             SysReg::Gt2,              R,  Temperature, "Outdoor (GT2)"),
    sys("gt3",             SysReg::Gt3,              R,  Temperature, "Hot water (GT3)"),
    sys("gt4",             SysReg::Gt4,              R,  Temperature, "Forward (GT4)"),
    sys("gt5",             SysReg::Gt5,              R,  Temperature, "Room (GT5)"),
    sys("gt6",             SysReg::Gt6,              R,  Temperature, "Compressor (GT6)"),
    sys("gt8",             SysReg::Gt8,              R,  Temperature, "Heat fluid out (GT8)"),
    sys("gt9",             SysReg::Gt9,              R,  Temperature, "Heat fluid in (GT9)"),
    sys("gt10",            SysReg::Gt10,             R,  Temperature, "Cold fluid in (GT10)"),
    sys("gt11",            SysReg::Gt11,             R,  Temperature, "Cold fluid out (GT11)"),
    sys("gt3x",            SysReg::Gt3x,             R,  Temperature, "External hot water (GT3X)"),
];
