//! * Forced-mode measurement cycle
//!
//! A forced measurement is one trigger of the mode bits, a poll of the status
//! register until the new-data flag shows up, and one burst read of the ADC
//! outputs. The chip drops back to sleep on its own afterwards.

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::bus::RegisterBus;
use super::calibration::CalibrationSet;
use super::compensation;
use super::registers::*;
use super::{DeviceError, DeviceResult};

/// Poll attempts before a measurement is read regardless.
pub const MAX_POLL_ATTEMPTS: u32 = 100;
/// Pause between two polls of the status register.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Raw ADC output of the latest forced measurement.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct RawSnapshot {
    pub(crate) press_adc: u32,
    pub(crate) temp_adc: u32,
    pub(crate) hum_adc: u16,
    pub(crate) gas_adc: u16,
    pub(crate) gas_range: u8,
    pub(crate) t_fine: i32,
    pub(crate) stale: bool,
}

impl RawSnapshot {
    /// Decode the 15 bytes read from the status register onwards.
    pub fn decode(data: &[u8; MEAS_DATA_LEN], cal: &CalibrationSet, stale: bool) -> RawSnapshot {
        let press_adc =
            (u32::from(data[2]) << 12) | (u32::from(data[3]) << 4) | (u32::from(data[4]) >> 4);
        let temp_adc =
            (u32::from(data[5]) << 12) | (u32::from(data[6]) << 4) | (u32::from(data[7]) >> 4);
        let hum_adc = (u16::from(data[8]) << 8) | u16::from(data[9]);
        let gas_adc = (u16::from(data[13]) << 2) | (u16::from(data[14]) >> 6);
        let gas_range = data[14] & 0x0f;

        RawSnapshot {
            press_adc,
            temp_adc,
            hum_adc,
            gas_adc,
            gas_range,
            t_fine: compensation::fine_temperature(temp_adc, cal),
            stale,
        }
    }

    pub fn press_adc(&self) -> u32 {
        self.press_adc
    }

    pub fn temp_adc(&self) -> u32 {
        self.temp_adc
    }

    pub fn hum_adc(&self) -> u16 {
        self.hum_adc
    }

    pub fn gas_adc(&self) -> u16 {
        self.gas_adc
    }

    pub fn gas_range(&self) -> u8 {
        self.gas_range
    }

    pub fn t_fine(&self) -> i32 {
        self.t_fine
    }

    /// True when the chip never flagged new data before this snapshot was
    /// read, so the values may belong to an earlier measurement.
    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MeasurementState {
    Idle,
    Measuring,
}

/// Drives forced measurements and throttles them to the power-mode interval.
///
/// Holds no bus of its own; every operation borrows the caller's.
#[derive(Debug, Clone)]
pub struct MeasurementController {
    state: MeasurementState,
    snapshot: RawSnapshot,
    data_ready: bool,
    last_measurement: Option<Instant>,
    interval: Duration,
    max_attempts: u32,
    poll_interval: Duration,
}

impl MeasurementController {
    pub fn new(interval: Duration) -> MeasurementController {
        MeasurementController {
            state: MeasurementState::Idle,
            snapshot: RawSnapshot::default(),
            data_ready: false,
            last_measurement: None,
            interval,
            max_attempts: MAX_POLL_ATTEMPTS,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Change the poll budget used by [`one_shot`](Self::one_shot).
    pub fn set_poll_policy(&mut self, max_attempts: u32, poll_interval: Duration) {
        self.max_attempts = max_attempts;
        self.poll_interval = poll_interval;
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> MeasurementState {
        self.state
    }

    pub fn snapshot(&self) -> &RawSnapshot {
        &self.snapshot
    }

    /// Completion time of the latest measurement.
    pub fn last_measurement(&self) -> Option<Instant> {
        self.last_measurement
    }

    /// Put the chip into forced mode.
    ///
    /// Calling this while a measurement is still running sends the command again.
    pub fn trigger<B: RegisterBus>(&mut self, bus: &mut B) -> DeviceResult<(), B::Error> {
        if self.state == MeasurementState::Measuring {
            debug!("trigger while measuring, resending");
        }
        let mode = bus.read_byte(REG_CTRL_MEAS).map_err(DeviceError::Bus)?;
        bus.write_register(REG_CTRL_MEAS, &[(mode & !MODE_MASK) | MODE_FORCED])
            .map_err(DeviceError::Bus)?;
        self.state = MeasurementState::Measuring;
        self.data_ready = false;
        Ok(())
    }

    /// Poll for the new-data flag.
    ///
    /// Returns `false` when the budget runs out. That is not an error: the
    /// following capture proceeds and marks its snapshot stale.
    pub fn await_completion<B: RegisterBus>(
        &mut self,
        bus: &mut B,
        max_attempts: u32,
        poll_interval: Duration,
    ) -> DeviceResult<bool, B::Error> {
        let mut ready = false;
        for _ in 0..max_attempts {
            let status = bus.read_byte(REG_MEAS_STATUS).map_err(DeviceError::Bus)?;
            if status & NEW_DATA != 0 {
                ready = true;
                break;
            }
            thread::sleep(poll_interval);
        }
        if !ready {
            warn!("no new data after {} polls, reading anyway", max_attempts);
        }
        self.state = MeasurementState::Idle;
        self.data_ready = ready;
        Ok(ready)
    }

    /// Burst-read the ADC outputs and derive the fine temperature.
    pub fn capture_snapshot<B: RegisterBus>(
        &mut self,
        bus: &mut B,
        cal: &CalibrationSet,
    ) -> DeviceResult<&RawSnapshot, B::Error> {
        let mut buf = [0u8; MEAS_DATA_LEN];
        bus.read_register(REG_MEAS_STATUS, &mut buf).map_err(DeviceError::Bus)?;
        self.snapshot = RawSnapshot::decode(&buf, cal, !self.data_ready);
        Ok(&self.snapshot)
    }

    /// Whether a fresh measurement is allowed at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_measurement {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Measure if the interval since the previous measurement has passed,
    /// otherwise keep the cached snapshot. Returns whether a measurement ran.
    ///
    /// The completion time is recorded on the same clock as `now`.
    pub fn one_shot<B: RegisterBus>(
        &mut self,
        bus: &mut B,
        cal: &CalibrationSet,
        now: Instant,
    ) -> DeviceResult<bool, B::Error> {
        if !self.is_due(now) {
            return Ok(false);
        }
        let started = Instant::now();
        self.trigger(bus)?;
        let (max_attempts, poll_interval) = (self.max_attempts, self.poll_interval);
        self.await_completion(bus, max_attempts, poll_interval)?;
        self.capture_snapshot(bus, cal)?;
        self.last_measurement = Some(now + started.elapsed());
        debug!("new snapshot {:?}", self.snapshot);
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::test::ScriptedBus;
    use crate::calibration::test::sample;

    #[test]
    fn decode_measurement_block() {
        let data = [
            0x80, 0x00, 0x5a, 0x3c, 0x70, 0x78, 0xf6, 0x00, 0x61, 0xa8, 0x00, 0x00, 0x00, 0xaf,
            0x4a,
        ];
        let snap = RawSnapshot::decode(&data, &sample(), false);
        assert_eq!(snap.press_adc(), 0x5_a3c7);
        assert_eq!(snap.temp_adc(), 0x7_8f60);
        assert_eq!(snap.hum_adc(), 0x61a8);
        assert_eq!(snap.gas_adc(), 0x2bd);
        assert_eq!(snap.gas_range(), 0x0a);
        assert_eq!(snap.t_fine(), 121_509);
        assert!(!snap.is_stale());
    }

    fn controller() -> MeasurementController {
        let mut controller = MeasurementController::new(Duration::from_secs(1));
        controller.set_poll_policy(MAX_POLL_ATTEMPTS, Duration::from_millis(0));
        controller
    }

    #[test]
    fn cached_within_interval_on_callers_clock() {
        let mut bus = ScriptedBus::new();
        let cal = sample();
        let mut controller = controller();
        let start = Instant::now() + Duration::from_secs(10);

        assert!(controller.one_shot(&mut bus, &cal, start).unwrap());
        assert!(!controller
            .one_shot(&mut bus, &cal, start + Duration::from_millis(500))
            .unwrap());
        assert_eq!(bus.triggers(), 1);
        assert_eq!(bus.captures(), 1);
        assert!(controller.last_measurement().unwrap() >= start);

        assert!(controller
            .one_shot(&mut bus, &cal, start + Duration::from_millis(1500))
            .unwrap());
        assert_eq!(bus.captures(), 2);
    }

    #[test]
    fn trigger_while_measuring_resends() {
        let mut bus = ScriptedBus::new();
        let mut controller = controller();
        controller.trigger(&mut bus).unwrap();
        controller.trigger(&mut bus).unwrap();
        assert_eq!(bus.triggers(), 2);
        assert_eq!(controller.state(), MeasurementState::Measuring);
    }

    #[test]
    fn short_capture_leaves_zeros() {
        let mut bus = ScriptedBus::new();
        bus.short_by = 1;
        let mut controller = controller();
        let snap = controller.capture_snapshot(&mut bus, &sample()).unwrap();
        assert_eq!(snap.temp_adc(), 0x7_8f60);
        // Last byte missing: gas LSBs and range read as zero.
        assert_eq!(snap.gas_adc(), 0x2bc);
        assert_eq!(snap.gas_range(), 0);
    }

    #[test]
    fn due_without_history() {
        let controller = MeasurementController::new(Duration::from_secs(1));
        assert!(controller.is_due(Instant::now()));
        assert_eq!(controller.state(), MeasurementState::Idle);
    }
}
