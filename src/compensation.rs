//! * Conversion of raw ADC codes into physical units
//!
//! These are the floating point renditions of the datasheet's integer
//! compensation formulas. Each is a pure function of a raw snapshot and the
//! device calibration.

use std::fmt;

use super::calibration::CalibrationSet;
use super::measurement::RawSnapshot;

/// Base compensation per gas range.
pub const GAS_RANGE_CONST_1: [f64; 16] = [
    2147483647.0,
    2147483647.0,
    2147483647.0,
    2147483647.0,
    2147483647.0,
    2126008810.0,
    2147483647.0,
    2130303777.0,
    2147483647.0,
    2147483647.0,
    2143188679.0,
    2136746228.0,
    2147483647.0,
    2126008810.0,
    2147483647.0,
    2147483647.0,
];

/// ADC to ohms scaling per gas range.
pub const GAS_RANGE_CONST_2: [f64; 16] = [
    4096000000.0,
    2048000000.0,
    1024000000.0,
    512000000.0,
    255744255.0,
    127110228.0,
    64000000.0,
    32258064.0,
    16016016.0,
    8000000.0,
    4000000.0,
    2000000.0,
    1000000.0,
    500000.0,
    250000.0,
    125000.0,
];

pub const MAX_GAS_RANGE: u8 = 15;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompensationError {
    /// Gas range index outside 0..=15.
    InvalidGasRange(u8),
    /// An intermediate divisor came out as zero.
    DivisionByZero,
}

impl fmt::Display for CompensationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompensationError::InvalidGasRange(range) => {
                write!(f, "gas range {} out of 0..=15", range)
            }
            CompensationError::DivisionByZero => write!(f, "compensation divisor is zero"),
        }
    }
}

/// Fine temperature shared by every other formula.
pub fn fine_temperature(temp_adc: u32, cal: &CalibrationSet) -> i32 {
    let t = &cal.temperature;
    let var1 = (f64::from(temp_adc) / 8.0) - (t[0] * 2.0);
    let var2 = (var1 * t[1]) / 2048.0;
    let var3 = ((var1 / 2.0) * (var1 / 2.0)) / 4096.0;
    let var3 = (var3 * t[2] * 16.0) / 16384.0;
    (var2 + var3) as i32
}

/// Temperature in centi-degrees, the scale the humidity formula works in.
fn centi_celsius(t_fine: i32) -> f64 {
    ((f64::from(t_fine) * 5.0) + 128.0) / 256.0
}

/// Temperature in degrees Celsius.
pub fn temperature(snapshot: &RawSnapshot) -> f64 {
    centi_celsius(snapshot.t_fine) / 100.0
}

/// Pressure in hectopascals.
pub fn pressure(snapshot: &RawSnapshot, cal: &CalibrationSet) -> Result<f64, CompensationError> {
    let p = &cal.pressure;

    let mut var1 = (f64::from(snapshot.t_fine) / 2.0) - 64000.0;
    let mut var2 = ((var1 / 4.0) * (var1 / 4.0)) / 2048.0;
    var2 = (var2 * p[5]) / 4.0;
    var2 += var1 * p[4] * 2.0;
    var2 = (var2 / 4.0) + (p[3] * 65536.0);
    var1 = ((((var1 / 4.0) * (var1 / 4.0)) / 8192.0) * (p[2] * 32.0) / 8.0) + ((p[1] * var1) / 2.0);
    var1 /= 262144.0;
    var1 = ((32768.0 + var1) * p[0]) / 32768.0;
    if var1 == 0.0 {
        return Err(CompensationError::DivisionByZero);
    }

    let mut pres = 1048576.0 - f64::from(snapshot.press_adc);
    pres = (pres - (var2 / 4096.0)) * 3125.0;
    pres = (pres / var1) * 2.0;

    let var1 = (p[8] * (((pres / 8.0) * (pres / 8.0)) / 8192.0)) / 4096.0;
    let var2 = ((pres / 4.0) * p[7]) / 8192.0;
    let var3 = ((pres / 256.0).powi(3) * p[9]) / 131072.0;
    pres += (var1 + var2 + var3 + (p[6] * 128.0)) / 16.0;

    Ok(pres / 100.0)
}

/// Relative humidity in percent, always within 0..=100.
pub fn humidity(snapshot: &RawSnapshot, cal: &CalibrationSet) -> f64 {
    let h = &cal.humidity;
    let temp = centi_celsius(snapshot.t_fine);

    let var1 = (f64::from(snapshot.hum_adc) - (h[0] * 16.0)) - ((temp * h[2]) / 200.0);
    let var2 = (h[1]
        * (((temp * h[3]) / 100.0) + (((temp * ((temp * h[4]) / 100.0)) / 64.0) / 100.0) + 16384.0))
        / 1024.0;
    let var3 = var1 * var2;
    let var4 = ((h[5] * 128.0) + ((temp * h[6]) / 100.0)) / 16.0;
    let var5 = ((var3 / 16384.0) * (var3 / 16384.0)) / 1024.0;
    let var6 = (var4 * var5) / 2.0;
    let hum = ((((var3 + var6) / 1024.0) * 1000.0) / 4096.0) / 1000.0;

    clamp_percent(hum)
}

fn clamp_percent(value: f64) -> f64 {
    if value > 100.0 {
        100.0
    } else if value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Gas resistance in ohms for a raw code and range.
pub fn gas_resistance_from_raw(
    gas_adc: u16,
    gas_range: u8,
    cal: &CalibrationSet,
) -> Result<u32, CompensationError> {
    if gas_range > MAX_GAS_RANGE {
        return Err(CompensationError::InvalidGasRange(gas_range));
    }
    let range = usize::from(gas_range);

    let var1 = ((1340.0 + (5.0 * cal.sw_err)) * GAS_RANGE_CONST_1[range]) / 65536.0;
    let var2 = ((f64::from(gas_adc) * 32768.0) - 16777216.0) + var1;
    if var2 == 0.0 {
        return Err(CompensationError::DivisionByZero);
    }
    let var3 = (GAS_RANGE_CONST_2[range] * var1) / 512.0;
    // var1 exceeds 2^24 for every range, so var2 and gas stay positive.
    let gas = (var3 + (var2 / 2.0)) / var2;

    Ok(gas.trunc() as u32)
}

/// Gas resistance in ohms.
pub fn gas_resistance(
    snapshot: &RawSnapshot,
    cal: &CalibrationSet,
) -> Result<u32, CompensationError> {
    gas_resistance_from_raw(snapshot.gas_adc, snapshot.gas_range, cal)
}
