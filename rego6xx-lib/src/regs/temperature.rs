use std::fmt::Display;

/// Temperature as stored in a register: signed tenths of a degree Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Temperature(i16);

impl Temperature {
    pub const MIN_CELSIUS: f32 = -100.0;
    pub const MAX_CELSIUS: f32 = 100.0;

    pub fn from_raw(raw: u16) -> Self {
        Self(raw as i16)
    }

    pub fn raw(self) -> u16 {
        self.0 as u16
    }

    pub fn tenths(self) -> i16 {
        self.0
    }

    /// `None` outside -100..=100 degrees.
    pub fn from_celsius(celsius: f32) -> Option<Self> {
        (Self::MIN_CELSIUS..=Self::MAX_CELSIUS)
            .contains(&celsius)
            .then(|| Self((celsius * 10.0).round() as i16))
    }

    pub fn celsius(self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw() {
        assert_eq!(Temperature::from_raw(0x0138).to_string(), "31.2");
        assert_eq!(Temperature::from_raw(0xfe1d).to_string(), "-48.3");
        assert_eq!(Temperature::from_raw(0xfffb).to_string(), "-0.5");
        assert!((Temperature::from_raw(0xfe1d).celsius() + 48.3).abs() < 1e-4);
    }

    #[test]
    fn from_celsius() {
        assert_eq!(Temperature::from_celsius(31.2).map(Temperature::raw), Some(0x0138));
        assert_eq!(Temperature::from_celsius(-48.3).map(Temperature::raw), Some(0xfe1d));
        assert_eq!(Temperature::from_celsius(100.0).map(Temperature::tenths), Some(1000));
    }

    #[test]
    fn out_of_range() {
        assert_eq!(Temperature::from_celsius(100.1), None);
        assert_eq!(Temperature::from_celsius(-100.5), None);
        assert_eq!(Temperature::from_celsius(f32::NAN), None);
    }
}
