//! * Factory calibration for the BME680
//!
//! Every chip carries its own compensation coefficients in two non-contiguous
//! blocks of its register map (0x89..0xA1 and 0xE1..0xF1), plus three heater
//! related bytes near the bottom of the map.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use super::bus::RegisterBus;
use super::config;
use super::registers::*;
use super::{DeviceError, DeviceResult};

/// Total length of both calibration windows.
pub const CALIB_LEN: usize = CALIB_A_LEN + CALIB_B_LEN;

#[derive(Debug, Copy, Clone)]
enum Field {
    I8,
    U8,
    I16,
    U16,
}

impl Field {
    fn width(self) -> usize {
        match self {
            Field::I8 | Field::U8 => 1,
            Field::I16 | Field::U16 => 2,
        }
    }

    fn decode(self, buf: &[u8]) -> f64 {
        match self {
            Field::I8 => f64::from(buf[0] as i8),
            Field::U8 => f64::from(buf[0]),
            Field::I16 => f64::from(LittleEndian::read_i16(buf)),
            Field::U16 => f64::from(LittleEndian::read_u16(buf)),
        }
    }
}

/// Layout of bytes `1..39` of the concatenated calibration windows.
const SCHEMA: [Field; 27] = [
    Field::I16,
    Field::I8,
    Field::U8,
    Field::U16,
    Field::I16,
    Field::I8,
    Field::U8,
    Field::I16,
    Field::I16,
    Field::I8,
    Field::I8,
    Field::U16,
    Field::I16,
    Field::I16,
    Field::U8,
    Field::U8,
    Field::U8,
    Field::U16,
    Field::I8,
    Field::I8,
    Field::I8,
    Field::U8,
    Field::I8,
    Field::U16,
    Field::I16,
    Field::I8,
    Field::I8,
];

const SCHEMA_OFFSET: usize = 1;

// Schema indices feeding each coefficient vector, in formula order.
const TEMPERATURE_FIELDS: [usize; 3] = [23, 0, 1];
const PRESSURE_FIELDS: [usize; 10] = [3, 4, 5, 7, 8, 10, 9, 12, 13, 14];
const HUMIDITY_FIELDS: [usize; 7] = [17, 16, 18, 19, 20, 21, 22];
const GAS_FIELDS: [usize; 3] = [25, 24, 26];

/// Calibration coefficients read from one device.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSet {
    pub(crate) temperature: [f64; 3],
    pub(crate) pressure: [f64; 10],
    pub(crate) humidity: [f64; 7],
    pub(crate) gas: [f64; 3],
    pub(crate) heat_range: f64,
    pub(crate) heat_value: f64,
    pub(crate) sw_err: f64,
}

fn select<const N: usize>(fields: &[f64; 27], indices: [usize; N]) -> [f64; N] {
    let mut out = [0.0; N];
    for (slot, index) in out.iter_mut().zip(indices.iter()) {
        *slot = fields[*index];
    }
    out
}

/// Splits the nibble-shared humidity pair.
///
/// `h2` gains the low nibble of `h1` and `h1` is scaled down by 16.
pub fn unpack_humidity(h1: f64, h2: f64) -> (f64, f64) {
    (h1 / 16.0, h2 * 16.0 + h1 % 16.0)
}

impl CalibrationSet {
    /// Decode the two calibration windows plus the three heater bytes
    /// (registers 0x02, 0x00 and 0x04).
    pub fn from_bytes(
        raw: &[u8; CALIB_LEN],
        heat_range: u8,
        heat_value: u8,
        sw_err: u8,
    ) -> CalibrationSet {
        let mut fields = [0.0; 27];
        let mut offset = SCHEMA_OFFSET;
        for (value, field) in fields.iter_mut().zip(SCHEMA.iter()) {
            *value = field.decode(&raw[offset..offset + field.width()]);
            offset += field.width();
        }

        let mut humidity = select(&fields, HUMIDITY_FIELDS);
        let (h1, h2) = unpack_humidity(humidity[0], humidity[1]);
        humidity[0] = h1;
        humidity[1] = h2;

        CalibrationSet {
            temperature: select(&fields, TEMPERATURE_FIELDS),
            pressure: select(&fields, PRESSURE_FIELDS),
            humidity,
            gas: select(&fields, GAS_FIELDS),
            heat_range: f64::from(heat_range & 0x30) / 16.0,
            heat_value: f64::from(heat_value),
            sw_err: f64::from(sw_err & 0xf0) / 16.0,
        }
    }

    pub fn temperature(&self) -> &[f64; 3] {
        &self.temperature
    }

    pub fn pressure(&self) -> &[f64; 10] {
        &self.pressure
    }

    pub fn humidity(&self) -> &[f64; 7] {
        &self.humidity
    }

    pub fn gas(&self) -> &[f64; 3] {
        &self.gas
    }

    /// Heater resistance range, 0..=3.
    pub fn heat_range(&self) -> f64 {
        self.heat_range
    }

    /// Heater resistance correction byte.
    pub fn heat_value(&self) -> f64 {
        self.heat_value
    }

    /// Range switching error, used by the gas resistance formula.
    pub fn sw_err(&self) -> f64 {
        self.sw_err
    }
}

/// Check the chip identity, then read and decode the calibration.
pub fn load_calibration<B>(bus: &mut B) -> DeviceResult<CalibrationSet, B::Error>
where
    B: RegisterBus,
{
    config::verify_identity(bus)?;

    let mut raw = [0u8; CALIB_LEN];
    let (window_a, window_b) = raw.split_at_mut(CALIB_A_LEN);
    bus.read_register(REG_CALIB_A, window_a).map_err(DeviceError::Bus)?;
    bus.read_register(REG_CALIB_B, window_b).map_err(DeviceError::Bus)?;

    let heat_range = bus.read_byte(REG_RES_HEAT_RANGE).map_err(DeviceError::Bus)?;
    let heat_value = bus.read_byte(REG_RES_HEAT_VAL).map_err(DeviceError::Bus)?;
    let sw_err = bus.read_byte(REG_RANGE_SW_ERR).map_err(DeviceError::Bus)?;

    let calibration = CalibrationSet::from_bytes(&raw, heat_range, heat_value, sw_err);
    debug!("calibration loaded: {:?}", calibration);
    Ok(calibration)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Reference calibration dump, both windows back to back.
    pub(crate) const SAMPLE: [u8; CALIB_LEN] = [
        0x3d, 0x6b, 0x66, 0x03, 0x00, 0x1a, 0x8f, 0x9a, 0xd6, 0x58, 0x00, 0xd8, 0x1c, 0xa8, 0xff,
        0x21, 0x1e, 0x00, 0x00, 0x36, 0xfe, 0x11, 0xf5, 0x1e, 0x00, 0x3e, 0x3f, 0x2c, 0x00, 0x2d,
        0x14, 0x78, 0x9c, 0x6d, 0x66, 0x52, 0xe7, 0xe2, 0x12, 0x31, 0x1c,
    ];

    pub(crate) fn sample() -> CalibrationSet {
        CalibrationSet::from_bytes(&SAMPLE, 0x16, 0x30, 0x20)
    }

    #[test]
    fn decodes_regression_vector() {
        let cal = sample();
        assert_eq!(cal.temperature(), &[26221.0, 26219.0, 3.0]);
        assert_eq!(
            cal.pressure(),
            &[36634.0, -10598.0, 88.0, 7384.0, -88.0, 30.0, 33.0, -458.0, -2799.0, 30.0]
        );
        assert_eq!(
            cal.humidity(),
            &[707.9375, 1007.0, 0.0, 45.0, 20.0, 120.0, -100.0]
        );
        assert_eq!(cal.gas(), &[-30.0, -6318.0, 18.0]);
        assert_eq!(cal.heat_range(), 1.0);
        assert_eq!(cal.heat_value(), 48.0);
        assert_eq!(cal.sw_err(), 2.0);
    }

    #[test]
    fn humidity_nibbles_for_every_shared_byte() {
        for shared in 0..=255u8 {
            let mut raw = SAMPLE;
            raw[26] = shared;
            let cal = CalibrationSet::from_bytes(&raw, 0, 0, 0);
            let h1 = (f64::from(raw[27]) * 256.0 + f64::from(shared)) / 16.0;
            let h2 = f64::from(raw[25]) * 16.0 + f64::from(shared & 0x0f);
            assert_eq!(cal.humidity()[0], h1, "h1 for {:#04x}", shared);
            assert_eq!(cal.humidity()[1], h2, "h2 for {:#04x}", shared);
        }
    }

    #[test]
    fn heater_bytes_use_top_nibble() {
        let cal = CalibrationSet::from_bytes(&SAMPLE, 0xff, 0xff, 0xff);
        assert_eq!(cal.heat_range(), 3.0);
        assert_eq!(cal.heat_value(), 255.0);
        assert_eq!(cal.sw_err(), 15.0);
    }

    #[test]
    fn schema_covers_38_bytes() {
        let total: usize = SCHEMA.iter().map(|f| f.width()).sum();
        assert_eq!(total, 38);
    }
}
