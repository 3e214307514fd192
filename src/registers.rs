//! Registers for the BME680 gas sensor
pub const REG_RES_HEAT_VAL: u8 = 0x00;
pub const REG_RES_HEAT_RANGE: u8 = 0x02;
pub const REG_RANGE_SW_ERR: u8 = 0x04;
pub const REG_MEAS_STATUS: u8 = 0x1d;
pub const REG_RES_HEAT_0: u8 = 0x5a;
pub const REG_CTRL_GAS_1: u8 = 0x71;
pub const REG_CTRL_HUM: u8 = 0x72;
pub const REG_CTRL_MEAS: u8 = 0x74;
pub const REG_CONFIG: u8 = 0x75;
pub const REG_CALIB_A: u8 = 0x89;
pub const REG_CHIP_ID: u8 = 0xd0;
pub const REG_SOFT_RESET: u8 = 0xe0;
pub const REG_CALIB_B: u8 = 0xe1;

pub const CALIB_A_LEN: usize = 25;
pub const CALIB_B_LEN: usize = 16;
/// Status register plus the pressure, temperature, humidity and gas outputs.
pub const MEAS_DATA_LEN: usize = 15;

pub const CHIP_ID: u8 = 0x61;
pub const SOFT_RESET_CMD: u8 = 0xb6;
pub const RUN_GAS: u8 = 0x10;
pub const NEW_DATA: u8 = 0x80;

pub const MODE_MASK: u8 = 0x03;
pub const MODE_SLEEP: u8 = 0x00;
pub const MODE_FORCED: u8 = 0x01;

/// Heater resistance targets written from `REG_RES_HEAT_0` when the heater is enabled.
pub const HEATER_PROFILE: [u8; 3] = [0x73, 0x64, 0x65];
