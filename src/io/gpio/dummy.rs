use crate::io::gpio::{GPIOError, GPIOManager, GPIOMode, GPIOState};
use std::collections::HashMap;
use tracing::trace;

/// A GPIO manager that just remembers what was written, for tests and
/// bench operation without hardware attached.
#[derive(Default)]
pub struct Dummy {
    map: HashMap<usize, GPIOState>,
}

impl Dummy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pin: usize) -> Option<GPIOState> {
        self.map.get(&pin).copied()
    }
}

impl GPIOManager for Dummy {
    fn setup(&mut self, _pin: usize, _mode: &GPIOMode) -> Result<(), GPIOError> {
        Ok(())
    }

    fn set_pin(&mut self, pin_id: usize, state: &GPIOState) -> Result<(), GPIOError> {
        trace!("Setting pin {} to {:?}", pin_id, state);
        self.map.insert(pin_id, *state);
        Ok(())
    }

    fn get_pin(&self, pin: usize) -> Result<GPIOState, GPIOError> {
        self.map.get(&pin).copied().ok_or(GPIOError::PinNotSetup)
    }
}
