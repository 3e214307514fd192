//! * Register-level access to the sensor over I2C
//!
//! The driver only ever needs two bus primitives: read a run of registers
//! starting at an address, and write a run of registers starting at an
//! address. Any `i2cdev` device provides both.

use i2cdev::core::I2CDevice;

/// A bus that can read and write device registers.
pub trait RegisterBus {
    /// Transport error, passed through to the caller unchanged.
    type Error;

    /// Fill `buf` from consecutive registers starting at `address`.
    fn read_register(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `data[i]` to register `address + i` for every byte in `data`.
    fn write_register(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read a single register.
    fn read_byte(&mut self, address: u8) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.read_register(address, &mut buf)?;
        Ok(buf[0])
    }
}

/// Builds the write frame for `data` starting at `address`.
///
/// The BME680 does not auto-increment on write, so every data byte is preceded
/// by its own register address: `[addr, b0, addr + 1, b1, ...]`.
pub fn write_frame(address: u8, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len() * 2);
    for (offset, value) in data.iter().enumerate() {
        frame.push(address.wrapping_add(offset as u8));
        frame.push(*value);
    }
    frame
}

impl<T> RegisterBus for T
where
    T: I2CDevice + Sized,
{
    type Error = T::Error;

    fn read_register(&mut self, address: u8, buf: &mut [u8]) -> Result<(), T::Error> {
        self.write(&[address])?;
        self.read(buf)
    }

    fn write_register(&mut self, address: u8, data: &[u8]) -> Result<(), T::Error> {
        self.write(&write_frame(address, data))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::calibration::test::SAMPLE;
    use crate::registers::*;
    use std::io;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Transfer {
        Read(u8, usize),
        Write(u8, Vec<u8>),
    }

    /// Register file standing in for a BME680 on the bus.
    ///
    /// Writes land in the register file and never change the status register,
    /// so whatever is scripted there is what every poll sees.
    pub(crate) struct ScriptedBus {
        pub(crate) regs: [u8; 256],
        pub(crate) log: Vec<Transfer>,
        pub(crate) fail: bool,
        /// Bytes dropped from the end of every read.
        pub(crate) short_by: usize,
    }

    /// Status register onwards: new data, pressure, temperature, humidity, gas.
    pub(crate) const MEASUREMENT: [u8; MEAS_DATA_LEN] = [
        0x80, 0x00, 0x5a, 0x3c, 0x70, 0x78, 0xf6, 0x00, 0x61, 0xa8, 0x00, 0x00, 0x00, 0xaf, 0x4a,
    ];

    impl ScriptedBus {
        pub(crate) fn new() -> ScriptedBus {
            let mut regs = [0u8; 256];
            regs[REG_CHIP_ID as usize] = CHIP_ID;
            let a = REG_CALIB_A as usize;
            let b = REG_CALIB_B as usize;
            regs[a..a + CALIB_A_LEN].copy_from_slice(&SAMPLE[..CALIB_A_LEN]);
            regs[b..b + CALIB_B_LEN].copy_from_slice(&SAMPLE[CALIB_A_LEN..]);
            regs[REG_RES_HEAT_VAL as usize] = 0x30;
            regs[REG_RES_HEAT_RANGE as usize] = 0x16;
            regs[REG_RANGE_SW_ERR as usize] = 0x20;
            let m = REG_MEAS_STATUS as usize;
            regs[m..m + MEAS_DATA_LEN].copy_from_slice(&MEASUREMENT);
            ScriptedBus {
                regs,
                log: Vec::new(),
                fail: false,
                short_by: 0,
            }
        }

        /// Forced-mode commands seen so far.
        pub(crate) fn triggers(&self) -> usize {
            self.log
                .iter()
                .filter(|t| match t {
                    Transfer::Write(REG_CTRL_MEAS, data) => data[0] & MODE_MASK == MODE_FORCED,
                    _ => false,
                })
                .count()
        }

        /// Single-byte reads of the status register.
        pub(crate) fn polls(&self) -> usize {
            self.count(&Transfer::Read(REG_MEAS_STATUS, 1))
        }

        /// Burst reads of the measurement block.
        pub(crate) fn captures(&self) -> usize {
            self.count(&Transfer::Read(REG_MEAS_STATUS, MEAS_DATA_LEN))
        }

        fn count(&self, transfer: &Transfer) -> usize {
            self.log.iter().filter(|t| *t == transfer).count()
        }

        pub(crate) fn clear_log(&mut self) {
            self.log.clear();
        }
    }

    impl RegisterBus for ScriptedBus {
        type Error = io::Error;

        fn read_register(&mut self, address: u8, buf: &mut [u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Other, "bus down"));
            }
            self.log.push(Transfer::Read(address, buf.len()));
            let start = address as usize;
            // A short transfer leaves the tail of `buf` untouched.
            let len = buf.len().saturating_sub(self.short_by);
            buf[..len].copy_from_slice(&self.regs[start..start + len]);
            Ok(())
        }

        fn write_register(&mut self, address: u8, data: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Other, "bus down"));
            }
            self.log.push(Transfer::Write(address, data.to_vec()));
            for (offset, value) in data.iter().enumerate() {
                self.regs[address as usize + offset] = *value;
            }
            Ok(())
        }
    }

    #[test]
    fn frame_for_single_byte() {
        assert_eq!(write_frame(0xE0, &[0xB6]), vec![0xE0, 0xB6]);
    }

    #[test]
    fn frame_addresses_every_byte() {
        assert_eq!(
            write_frame(0x5A, &[0x73, 0x64, 0x65]),
            vec![0x5A, 0x73, 0x5B, 0x64, 0x5C, 0x65]
        );
    }

    #[test]
    fn frame_for_nothing_is_empty() {
        assert!(write_frame(0x74, &[]).is_empty());
    }
}
