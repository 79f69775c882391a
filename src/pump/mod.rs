//! The pump state machine: gating windows, pump on/off commands, and the
//! handlers the timer wheel drives (`tick`, `scheduled_run`, `desinfect`).

pub mod relay;

use crate::config::PumpConfig;
use crate::error::{CorrectiveActions, PumpFailure};
use crate::indicator::{Indicator, Status};
use crate::pump_fail;
use crate::time_util::Clock;
use crate::timetable::Timetable;
use log::{debug, warn};

/// Exclusive owner of the pump relay GPIO pin.
pub trait PumpRelay {
    fn try_set_pump(&mut self, on: bool) -> Result<(), PumpFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveResult {
    Started,
    SuppressedWaiting,
    Stopped,
    NoOp,
}

/// Wall-clock bookkeeping behind the gates.
#[derive(Debug, Clone)]
pub struct PumpState {
    pub last_pump_start: i64,
    pub last_warm_water_demand: i64,
    pub last_scheduled_run: i64,
    pub outside_waiting_time: bool,
    pub outside_quiet_time: bool,
    pub outside_scheduled_run: bool,
    pub holiday: bool,
    pub running: bool,
    pub sanity_failed: Option<i64>,
}

impl PumpState {
    /// Seeds timestamps so every gate is open on the first tick —
    /// including the holiday gate: `last_warm_water_demand` is backdated
    /// only as far as `QUIET_TIME` requires, not `HOLIDAY_TIME`, so a
    /// freshly booted controller is not immediately in holiday mode.
    fn initial(now: i64, config: &PumpConfig) -> Self {
        let secs = |d: std::time::Duration| d.as_secs() as i64;
        PumpState {
            last_pump_start: now - secs(config.waiting_time) - 1,
            last_warm_water_demand: now - secs(config.quiet_time) - 1,
            last_scheduled_run: now - secs(config.quiet_time) - 1,
            outside_waiting_time: true,
            outside_quiet_time: true,
            outside_scheduled_run: true,
            holiday: false,
            running: false,
            sanity_failed: None,
        }
    }
}

pub struct PumpController {
    state: PumpState,
    config: PumpConfig,
}

impl PumpController {
    pub fn new(now: i64, config: PumpConfig) -> Self {
        PumpController {
            state: PumpState::initial(now, &config),
            config,
        }
    }

    pub fn state(&self) -> &PumpState {
        &self.state
    }

    /// Sanity-clamp regressed timestamps, recompute derived gate
    /// booleans, reflect on the indicator. `set_status` itself is
    /// synchronous - only the blink/flash pulses need the executor.
    pub fn update_state(&mut self, now: i64, indicator: &mut dyn Indicator) {
        let mut clamped = false;
        for ts in [
            &mut self.state.last_pump_start,
            &mut self.state.last_warm_water_demand,
            &mut self.state.last_scheduled_run,
        ] {
            if *ts > now {
                warn!("Clock regression detected: timestamp {} is after now {}", ts, now);
                *ts = now;
                clamped = true;
            }
        }
        if clamped {
            self.state.sanity_failed = Some(now);
        }

        let secs = |d: std::time::Duration| d.as_secs() as i64;
        self.state.outside_waiting_time =
            self.state.last_pump_start + secs(self.config.waiting_time) < now;
        self.state.outside_quiet_time =
            self.state.last_warm_water_demand + secs(self.config.quiet_time) < now;
        self.state.outside_scheduled_run =
            self.state.last_scheduled_run + secs(self.config.quiet_time) < now;
        self.state.holiday =
            self.state.last_warm_water_demand + secs(self.config.holiday_time) < now;

        indicator.set_status(self.indicator_status());
    }

    fn indicator_status(&self) -> Status {
        if self.state.holiday {
            Status::YellowBlink
        } else if self.state.running {
            Status::RedSolid
        } else if !self.state.outside_waiting_time
            || !self.state.outside_quiet_time
            || !self.state.outside_scheduled_run
        {
            Status::RedBlink
        } else {
            Status::Off
        }
    }

    /// Does not mutate state; the caller records the demand timestamp
    /// only if it goes on to call `drive`.
    pub fn is_demand(&self, rising: bool) -> bool {
        rising && self.state.outside_quiet_time && self.state.outside_scheduled_run
    }

    pub fn drive(
        &mut self,
        want_on: bool,
        now: i64,
        relay: &mut dyn PumpRelay,
    ) -> Result<DriveResult, PumpFailure> {
        if want_on && !self.state.running {
            if self.state.outside_waiting_time {
                relay.try_set_pump(true).map_err(|e| {
                    pump_fail!(
                        format!("Failed to start pump: {}", e),
                        CorrectiveActions::unknown_pump_relay()
                    )
                })?;
                self.state.running = true;
                self.state.last_pump_start = now;
                return Ok(DriveResult::Started);
            }
            return Ok(DriveResult::SuppressedWaiting);
        }

        if !want_on
            && self.state.running
            && now >= self.state.last_pump_start + self.config.running_time.as_secs() as i64
        {
            relay.try_set_pump(false).map_err(|e| {
                pump_fail!(
                    format!("Failed to stop pump: {}", e),
                    CorrectiveActions::unknown_pump_relay()
                )
            })?;
            self.state.running = false;
            return Ok(DriveResult::Stopped);
        }

        Ok(DriveResult::NoOp)
    }

    /// The 1Hz heartbeat. `rising` comes from `RisingDetector::sample`
    /// fed with the latest temperature reading.
    pub async fn tick(
        &mut self,
        now: i64,
        rising: bool,
        clock: &dyn Clock,
        relay: &mut dyn PumpRelay,
        indicator: &mut dyn Indicator,
        timetable: &mut Timetable,
    ) -> Result<DriveResult, PumpFailure> {
        self.update_state(now, indicator);

        let result = if self.is_demand(rising) {
            self.state.last_warm_water_demand = now;
            let result = self.drive(true, now, relay)?;
            // A demand inside the waiting window still gets recorded so
            // learning proceeds, even though the pump itself does not start.
            timetable.record(clock, now, true);
            result
        } else {
            self.drive(false, now, relay)?
        };

        indicator.blink_heartbeat().await;
        Ok(result)
    }

    /// Fired by the timer wheel's one-shot timer, primed `QUIET_TIME` ahead
    /// of a learned slot.
    pub fn scheduled_run(
        &mut self,
        now: i64,
        clock: &dyn Clock,
        relay: &mut dyn PumpRelay,
        indicator: &mut dyn Indicator,
        timetable: &mut Timetable,
    ) -> Result<DriveResult, PumpFailure> {
        self.state.last_scheduled_run = now;
        self.update_state(now, indicator);

        if self.state.holiday {
            debug!("Skipping scheduled run: in holiday mode");
            return Ok(DriveResult::NoOp);
        }

        let decrement_at = now
            + self.config.quiet_time.as_secs() as i64
            + self.config.slot_buffer.as_secs() as i64;
        timetable.record(clock, decrement_at, false);

        self.drive(true, now, relay)
    }

    /// Hygienic 3-day periodic run, also the safety net when both sensors
    /// and timetable are broken. Always flushes the timetable to disk,
    /// per spec: "In all cases, flash the indicator and Timetable.persist".
    pub async fn desinfect(
        &mut self,
        now: i64,
        relay: &mut dyn PumpRelay,
        indicator: &mut dyn Indicator,
        timetable: &Timetable,
        timetable_path: impl AsRef<std::path::Path>,
    ) -> Result<DriveResult, PumpFailure> {
        let result = if timetable.is_empty() || self.state.holiday {
            self.state.last_scheduled_run = now;
            self.update_state(now, indicator);
            self.drive(true, now, relay)?
        } else {
            DriveResult::NoOp
        };
        timetable.persist(timetable_path);
        indicator.flash_ack().await;
        Ok(result)
    }
}
