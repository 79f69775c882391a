//! Collaborator wiring for the orchestrator: a single struct owning the
//! three hardware-facing collaborators so `main`/`Orchestrator` construct
//! it once from config and pass it down rather than threading three trait
//! objects separately.

pub mod gpio;

use crate::indicator::Indicator;
use crate::pump::PumpRelay;
use crate::sensor::TempSensor;

pub struct IOBundle {
    sensor: Box<dyn TempSensor + Send>,
    relay: Box<dyn PumpRelay + Send>,
    indicator: Box<dyn Indicator + Send>,
}

impl IOBundle {
    pub fn new(
        sensor: impl TempSensor + Send + 'static,
        relay: impl PumpRelay + Send + 'static,
        indicator: impl Indicator + Send + 'static,
    ) -> IOBundle {
        IOBundle {
            sensor: Box::new(sensor),
            relay: Box::new(relay),
            indicator: Box::new(indicator),
        }
    }

    pub fn sensor(&mut self) -> &mut dyn TempSensor {
        &mut *self.sensor
    }

    pub fn relay(&mut self) -> &mut dyn PumpRelay {
        &mut *self.relay
    }

    pub fn indicator(&mut self) -> &mut dyn Indicator {
        &mut *self.indicator
    }

    /// Disjoint-field borrow so callers that need both at once (every
    /// `PumpController` handler) don't trip the borrow checker going
    /// through `relay()` and `indicator()` separately.
    pub fn relay_and_indicator(&mut self) -> (&mut dyn PumpRelay, &mut dyn Indicator) {
        (&mut *self.relay, &mut *self.indicator)
    }
}
