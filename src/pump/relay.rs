//! GPIO-backed `PumpRelay` (default pin 20, active-low).

use crate::error::{CorrectiveActions, PumpFailure};
use crate::io::gpio::{GPIOError, GPIOManager, GPIOMode, GPIOState};
use crate::pump::PumpRelay;
use crate::pump_fail;
use log::debug;

pub struct GpioPumpRelay<G: GPIOManager> {
    gpio: G,
    pin: usize,
    active_low: bool,
}

impl<G: GPIOManager> GpioPumpRelay<G> {
    pub fn create(mut gpio: G, pin: usize, active_low: bool) -> Result<Self, GPIOError> {
        gpio.setup(pin, &GPIOMode::Output)?;
        Ok(GpioPumpRelay {
            gpio,
            pin,
            active_low,
        })
    }

    fn on_state(&self) -> GPIOState {
        if self.active_low {
            GPIOState::Low
        } else {
            GPIOState::High
        }
    }

    fn off_state(&self) -> GPIOState {
        if self.active_low {
            GPIOState::High
        } else {
            GPIOState::Low
        }
    }
}

impl<G: GPIOManager> PumpRelay for GpioPumpRelay<G> {
    fn try_set_pump(&mut self, on: bool) -> Result<(), PumpFailure> {
        debug!("Setting pump relay to {}", if on { "On" } else { "Off" });
        let state = if on { self.on_state() } else { self.off_state() };
        self.gpio.set_pin(self.pin, &state).map_err(|e| {
            pump_fail!(
                format!("Failed to set pump relay pin: {}", e),
                CorrectiveActions::unknown_pump_relay()
            )
        })
    }
}

#[cfg(test)]
impl<G: GPIOManager> GpioPumpRelay<G> {
    fn gpio(&self) -> &G {
        &self.gpio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gpio::dummy::Dummy;

    #[test]
    fn active_low_relay_drives_low_for_on() {
        let mut relay = GpioPumpRelay::create(Dummy::new(), 20, true).unwrap();
        relay.try_set_pump(true).unwrap();
        assert_eq!(relay.gpio().get(20), Some(GPIOState::Low));

        relay.try_set_pump(false).unwrap();
        assert_eq!(relay.gpio().get(20), Some(GPIOState::High));
    }

    #[test]
    fn active_high_relay_drives_high_for_on() {
        let mut relay = GpioPumpRelay::create(Dummy::new(), 20, false).unwrap();
        relay.try_set_pump(true).unwrap();
        assert_eq!(relay.gpio().get(20), Some(GPIOState::High));
    }
}
