//! # A forced-mode driver for the Bosch BME680
//!
//! The [BME680](https://www.bosch-sensortec.com/products/environmental-sensors/gas-sensors/bme680/)
//! is a combined pressure, temperature, humidity and gas sensor on an I2C
//! bus. This driver takes on-demand ("forced mode") measurements and turns
//! the raw codes into physical units with the calibration stored in each chip.
//!
//! Supported readings:
//!
//! * Temperature, in degrees Celsius
//! * Pressure, in hectopascals, and the altitude derived from it
//! * Relative humidity, in percent
//! * Gas resistance, in ohms
//!
//! Readings taken closer together than the [`PowerMode`] interval are served
//! from the previous measurement without touching the bus.
//!
//! The driver blocks the caller for every bus transfer, and for up to about
//! 100 ms while waiting for a measurement. It does no locking of its own.

extern crate byteorder;
extern crate i2cdev;
extern crate log;
extern crate measurements;

mod bus;
mod calibration;
mod compensation;
mod config;
mod measurement;
mod registers;
mod units;

pub use measurements::Length;
pub use measurements::Pressure;
pub use measurements::Temperature;
pub use units::{GasResistance, RelativeHumidity};

pub use bus::RegisterBus;
pub use calibration::{load_calibration, CalibrationSet};
pub use compensation::CompensationError;
pub use config::{configure, enable_heater, reset, verify_identity};
pub use config::{DeviceConfig, FilterCoefficient, Oversampling, PowerMode};
pub use measurement::{MeasurementController, MeasurementState, RawSnapshot};

use std::fmt;
use std::time::{Duration, Instant};

use log::info;

/// Address of the chip with SDO pulled high.
pub const DEFAULT_ADDRESS: u16 = 0x77;
/// Address of the chip with SDO pulled low.
pub const SECONDARY_ADDRESS: u16 = 0x76;
/// Standard atmosphere at sea level.
pub const SEA_LEVEL_HPA: f64 = 1013.25;

/// Errors that this crate can return
#[derive(Debug)]
pub enum DeviceError<E> {
    /// The chip ID register did not read back as a BME680.
    NotPresent { found: u8 },
    /// Gas range outside 0..=15, which means a corrupted read.
    InvalidGasRange(u8),
    /// A compensation formula hit a zero divisor.
    UndefinedResult,
    InvalidOversampling(u8),
    InvalidFilter(u8),
    /// The bus transfer failed.
    Bus(E),
}

/// A shortcut for Results that can return `T` or `DeviceError<E>`
pub type DeviceResult<T, E> = Result<T, DeviceError<E>>;

impl<E: fmt::Debug> fmt::Display for DeviceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotPresent { found } => {
                write!(f, "BME680 not present (chip id {:#04x})", found)
            }
            DeviceError::InvalidGasRange(range) => write!(f, "invalid gas range {}", range),
            DeviceError::UndefinedResult => write!(f, "compensation result is undefined"),
            DeviceError::InvalidOversampling(factor) => {
                write!(f, "no oversampling setting for x{}", factor)
            }
            DeviceError::InvalidFilter(coefficient) => {
                write!(f, "no filter setting for coefficient {}", coefficient)
            }
            DeviceError::Bus(err) => write!(f, "bus error: {:?}", err),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for DeviceError<E> {}

impl<E> From<CompensationError> for DeviceError<E> {
    fn from(err: CompensationError) -> DeviceError<E> {
        match err {
            CompensationError::InvalidGasRange(range) => DeviceError::InvalidGasRange(range),
            CompensationError::DivisionByZero => DeviceError::UndefinedResult,
        }
    }
}

/// Represents one BME680
pub struct Bme680<T: RegisterBus> {
    bus: T,
    calibration: CalibrationSet,
    config: DeviceConfig,
    controller: MeasurementController,
    sea_level_pressure: Pressure,
}

impl<T> Bme680<T>
where
    T: RegisterBus,
{
    /// Reset the chip, check it is a BME680, read its calibration and apply
    /// the default settings.
    ///
    /// `sea_level_hpa` is only used for [`get_altitude`](Self::get_altitude).
    pub fn initialize(
        bus: T,
        sea_level_hpa: f64,
        heater: bool,
    ) -> DeviceResult<Bme680<T>, T::Error> {
        Bme680::with_config(bus, sea_level_hpa, heater, DeviceConfig::default())
    }

    /// As [`initialize`](Self::initialize), with explicit settings.
    pub fn with_config(
        mut bus: T,
        sea_level_hpa: f64,
        heater: bool,
        config: DeviceConfig,
    ) -> DeviceResult<Bme680<T>, T::Error> {
        reset(&mut bus)?;
        let calibration = load_calibration(&mut bus)?;
        if heater {
            enable_heater(&mut bus)?;
        }
        configure(&mut bus, &config)?;
        info!("BME680 ready, heater {}", if heater { "on" } else { "off" });

        Ok(Bme680 {
            bus,
            calibration,
            config,
            controller: MeasurementController::new(config.power_mode.interval()),
            sea_level_pressure: Pressure::from_hectopascals(sea_level_hpa),
        })
    }

    /// Apply new settings. On error the chip may hold a mix of old and new
    /// settings, so call this again.
    pub fn reconfigure(&mut self, config: DeviceConfig) -> DeviceResult<(), T::Error> {
        configure(&mut self.bus, &config)?;
        self.config = config;
        self.controller.set_interval(config.power_mode.interval());
        Ok(())
    }

    /// Change how often a fresh measurement may be taken. No bus traffic.
    pub fn set_power_mode(&mut self, mode: PowerMode) {
        self.config.power_mode = mode;
        self.controller.set_interval(mode.interval());
    }

    /// Change how long a measurement is polled for before it is read anyway.
    pub fn set_poll_policy(&mut self, max_attempts: u32, poll_interval: Duration) {
        self.controller.set_poll_policy(max_attempts, poll_interval);
    }

    /// Check the chip still answers as a BME680.
    pub fn verify_identity(&mut self) -> DeviceResult<(), T::Error> {
        verify_identity(&mut self.bus)
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn calibration(&self) -> &CalibrationSet {
        &self.calibration
    }

    pub fn sea_level_pressure(&self) -> Pressure {
        self.sea_level_pressure
    }

    pub fn set_sea_level_pressure(&mut self, pressure: Pressure) {
        self.sea_level_pressure = pressure;
    }

    /// Measure if the power-mode interval has passed, and return the latest snapshot.
    pub fn measure(&mut self) -> DeviceResult<&RawSnapshot, T::Error> {
        self.controller
            .one_shot(&mut self.bus, &self.calibration, Instant::now())?;
        Ok(self.controller.snapshot())
    }

    /// True when the latest snapshot was read without the chip flagging new
    /// data, so it may repeat an earlier measurement.
    pub fn is_stale(&self) -> bool {
        self.controller.snapshot().is_stale()
    }

    /// Returns a Temperature reading.
    pub fn get_temperature(&mut self) -> DeviceResult<Temperature, T::Error> {
        let snapshot = self.measure()?;
        Ok(Temperature::from_celsius(compensation::temperature(snapshot)))
    }

    /// Returns a Pressure reading.
    pub fn get_pressure(&mut self) -> DeviceResult<Pressure, T::Error> {
        self.measure()?;
        let hpa = compensation::pressure(self.controller.snapshot(), &self.calibration)?;
        Ok(Pressure::from_hectopascals(hpa))
    }

    /// Returns a RelativeHumidity value in percent between 0 and 100
    pub fn get_humidity(&mut self) -> DeviceResult<RelativeHumidity, T::Error> {
        self.measure()?;
        let percent = compensation::humidity(self.controller.snapshot(), &self.calibration);
        Ok(RelativeHumidity::from_percent(percent))
    }

    /// Returns the resistance of the gas sensing plate.
    pub fn get_gas(&mut self) -> DeviceResult<GasResistance, T::Error> {
        self.measure()?;
        let ohms = compensation::gas_resistance(self.controller.snapshot(), &self.calibration)?;
        Ok(GasResistance::from_ohms(ohms))
    }

    /// Returns the altitude above the level where the pressure equals the
    /// configured sea-level pressure.
    pub fn get_altitude(&mut self) -> DeviceResult<Length, T::Error> {
        let pressure = self.get_pressure()?;
        Ok(altitude(pressure, self.sea_level_pressure))
    }

    /// Give back the bus.
    pub fn into_inner(self) -> T {
        self.bus
    }
}

/// International barometric formula.
pub fn altitude(pressure: Pressure, sea_level: Pressure) -> Length {
    let ratio = pressure.as_hectopascals() / sea_level.as_hectopascals();
    Length::from_meters(44330.0 * (1.0 - ratio.powf(1.0 / 5.255)))
}


// End of file
