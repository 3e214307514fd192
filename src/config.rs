//! * Measurement settings and one-off device setup
//!
//! Covers soft reset, chip identification, oversampling, the IIR filter and
//! the gas heater pre-configuration.

use std::thread;
use std::time::Duration;

use log::{debug, info};

use super::bus::RegisterBus;
use super::registers::*;
use super::{DeviceError, DeviceResult};

/// Time the chip needs after a soft reset before it answers again.
pub const RESET_DELAY: Duration = Duration::from_millis(5);

/// Oversampling factor for one of the temperature, pressure or humidity channels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Oversampling {
    /// Channel is not measured.
    Skipped,
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl Oversampling {
    /// Look up the setting for a factor of 0, 1, 2, 4, 8 or 16.
    pub fn from_factor<E>(factor: u8) -> DeviceResult<Oversampling, E> {
        match factor {
            0 => Ok(Oversampling::Skipped),
            1 => Ok(Oversampling::X1),
            2 => Ok(Oversampling::X2),
            4 => Ok(Oversampling::X4),
            8 => Ok(Oversampling::X8),
            16 => Ok(Oversampling::X16),
            _ => Err(DeviceError::InvalidOversampling(factor)),
        }
    }

    /// Register encoding, three bits wide.
    pub fn bits(self) -> u8 {
        match self {
            Oversampling::Skipped => 0b000,
            Oversampling::X1 => 0b001,
            Oversampling::X2 => 0b010,
            Oversampling::X4 => 0b011,
            Oversampling::X8 => 0b100,
            Oversampling::X16 => 0b101,
        }
    }
}

/// IIR filter coefficient applied to temperature and pressure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterCoefficient {
    Off,
    C1,
    C3,
    C7,
    C15,
    C31,
    C63,
    C127,
}

impl FilterCoefficient {
    /// Look up the setting for a coefficient of 0, 1, 3, 7, 15, 31, 63 or 127.
    pub fn from_coefficient<E>(coefficient: u8) -> DeviceResult<FilterCoefficient, E> {
        match coefficient {
            0 => Ok(FilterCoefficient::Off),
            1 => Ok(FilterCoefficient::C1),
            3 => Ok(FilterCoefficient::C3),
            7 => Ok(FilterCoefficient::C7),
            15 => Ok(FilterCoefficient::C15),
            31 => Ok(FilterCoefficient::C31),
            63 => Ok(FilterCoefficient::C63),
            127 => Ok(FilterCoefficient::C127),
            _ => Err(DeviceError::InvalidFilter(coefficient)),
        }
    }

    /// Register encoding, three bits wide.
    pub fn bits(self) -> u8 {
        match self {
            FilterCoefficient::Off => 0b000,
            FilterCoefficient::C1 => 0b001,
            FilterCoefficient::C3 => 0b010,
            FilterCoefficient::C7 => 0b011,
            FilterCoefficient::C15 => 0b100,
            FilterCoefficient::C31 => 0b101,
            FilterCoefficient::C63 => 0b110,
            FilterCoefficient::C127 => 0b111,
        }
    }
}

/// How often a fresh measurement may be taken.
///
/// Reads issued more often than the interval are served from the last
/// measurement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PowerMode {
    /// One measurement every 33 seconds.
    UltraLowPower,
    /// One measurement every 3.3 seconds.
    LowPower,
    /// One measurement every second.
    Continuous,
}

impl PowerMode {
    pub fn interval(self) -> Duration {
        match self {
            PowerMode::UltraLowPower => Duration::from_secs(33),
            PowerMode::LowPower => Duration::from_millis(3300),
            PowerMode::Continuous => Duration::from_secs(1),
        }
    }
}

/// Settings written by [`configure`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub temperature: Oversampling,
    pub pressure: Oversampling,
    pub humidity: Oversampling,
    pub filter: FilterCoefficient,
    pub power_mode: PowerMode,
}

impl Default for DeviceConfig {
    fn default() -> DeviceConfig {
        DeviceConfig {
            temperature: Oversampling::X1,
            pressure: Oversampling::X4,
            humidity: Oversampling::X8,
            filter: FilterCoefficient::C3,
            power_mode: PowerMode::Continuous,
        }
    }
}

impl DeviceConfig {
    /// Value for the `ctrl_meas` register, with the mode bits left in sleep.
    pub fn ctrl_meas(&self) -> u8 {
        (self.temperature.bits() << 5) | (self.pressure.bits() << 2)
    }

    /// Value for the `ctrl_hum` register.
    pub fn ctrl_hum(&self) -> u8 {
        self.humidity.bits()
    }

    /// Value for the `config` register.
    pub fn filter_bits(&self) -> u8 {
        self.filter.bits() << 2
    }
}

/// Soft-reset the chip and wait for it to come back.
pub fn reset<B: RegisterBus>(bus: &mut B) -> DeviceResult<(), B::Error> {
    bus.write_register(REG_SOFT_RESET, &[SOFT_RESET_CMD])
        .map_err(DeviceError::Bus)?;
    thread::sleep(RESET_DELAY);
    Ok(())
}

/// Fails with [`DeviceError::NotPresent`] unless the chip reports itself as a BME680.
pub fn verify_identity<B: RegisterBus>(bus: &mut B) -> DeviceResult<(), B::Error> {
    let found = bus.read_byte(REG_CHIP_ID).map_err(DeviceError::Bus)?;
    if found != CHIP_ID {
        return Err(DeviceError::NotPresent { found });
    }
    Ok(())
}

/// Write the heater resistance targets.
pub fn enable_heater<B: RegisterBus>(bus: &mut B) -> DeviceResult<(), B::Error> {
    bus.write_register(REG_RES_HEAT_0, &HEATER_PROFILE)
        .map_err(DeviceError::Bus)?;
    Ok(())
}

/// Program oversampling, gas and filter settings, then leave the chip asleep.
///
/// Safe to call again to change settings. If a write fails part-way the chip
/// holds a mix of old and new settings until `configure` succeeds.
pub fn configure<B>(bus: &mut B, config: &DeviceConfig) -> DeviceResult<(), B::Error>
where
    B: RegisterBus,
{
    let writes = [
        (REG_CTRL_MEAS, config.ctrl_meas()),
        (REG_CTRL_HUM, config.ctrl_hum()),
        (REG_CTRL_GAS_1, RUN_GAS),
        (REG_CONFIG, config.filter_bits()),
    ];
    for (register, value) in writes.iter() {
        bus.write_register(*register, &[*value])
            .map_err(DeviceError::Bus)?;
    }

    let mode = bus.read_byte(REG_CTRL_MEAS).map_err(DeviceError::Bus)?;
    bus.write_register(REG_CTRL_MEAS, &[(mode & !MODE_MASK) | MODE_SLEEP])
        .map_err(DeviceError::Bus)?;

    debug!("configured {:?}", config);
    info!("measurement interval {:?}", config.power_mode.interval());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn oversampling_factors() {
        let factors = [0u8, 1, 2, 4, 8, 16];
        for (bits, factor) in factors.iter().enumerate() {
            let os = Oversampling::from_factor::<Infallible>(*factor).unwrap();
            assert_eq!(os.bits(), bits as u8);
        }
    }

    #[test]
    fn bad_oversampling_factor() {
        for factor in [3u8, 5, 32, 255].iter() {
            match Oversampling::from_factor::<Infallible>(*factor) {
                Err(DeviceError::InvalidOversampling(f)) => assert_eq!(f, *factor),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn filter_coefficients() {
        let coefficients = [0u8, 1, 3, 7, 15, 31, 63, 127];
        for (bits, coefficient) in coefficients.iter().enumerate() {
            let filter = FilterCoefficient::from_coefficient::<Infallible>(*coefficient).unwrap();
            assert_eq!(filter.bits(), bits as u8);
        }
    }

    #[test]
    fn bad_filter_coefficient() {
        assert!(FilterCoefficient::from_coefficient::<Infallible>(2).is_err());
        assert!(FilterCoefficient::from_coefficient::<Infallible>(128).is_err());
    }

    #[test]
    fn power_mode_intervals() {
        assert_eq!(PowerMode::UltraLowPower.interval(), Duration::from_secs(33));
        assert_eq!(PowerMode::LowPower.interval(), Duration::from_millis(3300));
        assert_eq!(PowerMode::Continuous.interval(), Duration::from_secs(1));
    }

    #[test]
    fn default_register_values() {
        let config = DeviceConfig::default();
        assert_eq!(config.ctrl_meas(), 0b0010_1100);
        assert_eq!(config.ctrl_hum(), 0b100);
        assert_eq!(config.filter_bits(), 0b0000_1000);
    }
}
