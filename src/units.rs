//! # Units for readings the measurements crate doesn't cover

use std::fmt;

/// Represents a relative humidity reading, always between 0 and 100 percent
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RelativeHumidity {
    value: f64,
}

impl RelativeHumidity {
    /// Values outside 0..=100 are clamped.
    pub fn from_percent(pc: f64) -> RelativeHumidity {
        RelativeHumidity {
            value: pc.max(0.0).min(100.0),
        }
    }

    pub fn as_percent(&self) -> f64 {
        self.value
    }
}

impl fmt::Display for RelativeHumidity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.1}%", self.as_percent())
    }
}

/// Represents the resistance of the gas sensing plate. Cleaner air reads higher.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GasResistance {
    ohms: u32,
}

impl GasResistance {
    pub fn from_ohms(ohms: u32) -> GasResistance {
        GasResistance { ohms }
    }

    pub fn as_ohms(&self) -> u32 {
        self.ohms
    }

    pub fn as_kiloohms(&self) -> f64 {
        f64::from(self.ohms) / 1000.0
    }
}

impl fmt::Display for GasResistance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} Ω", self.ohms)
    }
}


// End of file
