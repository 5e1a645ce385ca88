use std::fmt::Display;

/// Description used for error ids outside the known table.
pub const UNKNOWN_ERROR: &str = "?";

static DESCRIPTIONS: &[&str] = &[
    "Sensor radiator return (GT1)",
    "Outdoor sensor (GT2)",
    "Sensor hot water (GT3)",
    "Mixing valve sensor (GT4)",
    "Room sensor (GT5)",
    "Sensor compressor (GT6)",
    "Sensor heat tran fluid out (GT8)",
    "Sensor heat tran fluid in (GT9)",
    "Sensor cold tran fluid in (GT10)",
    "Sensor cold tran fluid out (GT11)",
    "Compressor circuit switch",
    "Electrical cassette",
    "HTF C=pump switch (MB2)",
    "Low pressure switch (LP)",
    "High pressure switch (HP)",
    "High return HP (GT9)",
    "HTF out max (GT8)",
    "HTF in under limit (GT10)",
    "HTF out under limit (GT11)",
    "Compressor superheat (GT6)",
    "3-phase incorrect order",
    "Power failure",
    "Varmetr. delta high",
];

pub fn describe_error(id: u8) -> &'static str {
    DESCRIPTIONS
        .get(usize::from(id))
        .copied()
        .unwrap_or(UNKNOWN_ERROR)
}

/// One line of the regulator error log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub id: u8,
    /// Raw log text, usually the `YYMMDD HH:MM:SS` time of the error.
    pub log: String,
}

impl ErrorEntry {
    pub fn description(&self) -> &'static str {
        describe_error(self.id)
    }
}

impl Display for ErrorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:2} {} {}", self.id, self.log, self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids() {
        assert_eq!(describe_error(0), "Sensor radiator return (GT1)");
        assert_eq!(describe_error(21), "Power failure");
        assert_eq!(describe_error(22), "Varmetr. delta high");
    }

    #[test]
    fn unknown_ids() {
        assert_eq!(describe_error(23), UNKNOWN_ERROR);
        assert_eq!(describe_error(0xff), UNKNOWN_ERROR);
    }

    #[test]
    fn entry_display() {
        let entry = ErrorEntry {
            id: 21,
            log: "021009 18:21:03".to_string(),
        };
        assert_eq!(entry.to_string(), "21 021009 18:21:03 Power failure");
    }
}
