//! Status indicator: the NeoPixel status colour and the onboard heartbeat
//! LED, behind one trait so `PumpController` and the backup button share a
//! single collaborator.
//!
//! `GPIOManager` only drives a pin high or low, so the WS2812 data line
//! here is treated as a single on/off signal rather than a full
//! three-wire colour protocol - driving real WS2812 colour requires
//! bit-banged timing outside what `sysfs_gpio` can give us, so `Status`'s
//! colour is carried in firmware state and the pin itself just tracks
//! "lit or not, blinking or steady".

pub mod dummy;

use crate::io::gpio::{GPIOManager, GPIOMode, GPIOState};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Off,
    RedSolid,
    RedBlink,
    YellowBlink,
}

/// `blink_heartbeat`/`flash_ack` hold their pulse for a short duration via
/// `tokio::time::sleep`, never `std::thread::sleep`: these run on the
/// orchestrator's current-thread runtime alongside the tick/scheduled-run
/// timers and the button watcher's poll loop, so a blocking sleep here
/// would stall the whole cooperative scheduler. `spec.md` §5 permits
/// exactly one blocking wait (the sensor's ~750ms conversion), which is
/// why that one is pushed onto `spawn_blocking` instead - this one simply
/// isn't on the thread at all.
#[async_trait]
pub trait Indicator {
    /// Reflects the controller's current gate state. Called once per
    /// `update_state`, so a `*Blink` status toggles the pin on every call
    /// rather than running its own timer.
    fn set_status(&mut self, status: Status);

    /// A brief onboard-LED pulse, once per tick, independent of `Status`.
    async fn blink_heartbeat(&mut self);

    /// Brief flash used by `desinfect` and backup-button acknowledgement.
    async fn flash_ack(&mut self);
}

const HEARTBEAT_PULSE: Duration = Duration::from_millis(20);
const ACK_FLASH: Duration = Duration::from_millis(50);

/// Real indicator driving the NeoPixel data pin and the onboard LED
/// through a `GPIOManager` (default pins 23 and 25).
pub struct GpioIndicator<G: GPIOManager> {
    gpio: G,
    neopixel_pin: usize,
    onboard_led_pin: usize,
    current: Status,
    blink_phase: bool,
}

impl<G: GPIOManager> GpioIndicator<G> {
    pub fn new(mut gpio: G, neopixel_pin: usize, onboard_led_pin: usize) -> Result<Self, crate::io::gpio::GPIOError> {
        gpio.setup(neopixel_pin, &GPIOMode::Output)?;
        gpio.setup(onboard_led_pin, &GPIOMode::Output)?;
        gpio.set_pin(neopixel_pin, &GPIOState::Low)?;
        gpio.set_pin(onboard_led_pin, &GPIOState::Low)?;
        Ok(GpioIndicator {
            gpio,
            neopixel_pin,
            onboard_led_pin,
            current: Status::Off,
            blink_phase: false,
        })
    }

    fn write_neopixel(&mut self, on: bool) {
        let state = if on { GPIOState::High } else { GPIOState::Low };
        if let Err(e) = self.gpio.set_pin(self.neopixel_pin, &state) {
            log::warn!("Failed to write NeoPixel pin: {}", e);
        }
    }

    fn write_onboard(&mut self, on: bool) {
        let state = if on { GPIOState::High } else { GPIOState::Low };
        if let Err(e) = self.gpio.set_pin(self.onboard_led_pin, &state) {
            log::warn!("Failed to write onboard LED pin: {}", e);
        }
    }
}

#[async_trait]
impl<G: GPIOManager + Send> Indicator for GpioIndicator<G> {
    fn set_status(&mut self, status: Status) {
        if status != self.current {
            self.current = status;
            self.blink_phase = false;
        } else if matches!(status, Status::RedBlink | Status::YellowBlink) {
            self.blink_phase = !self.blink_phase;
        }

        match status {
            Status::Off => self.write_neopixel(false),
            Status::RedSolid => self.write_neopixel(true),
            Status::RedBlink | Status::YellowBlink => self.write_neopixel(self.blink_phase),
        }
    }

    async fn blink_heartbeat(&mut self) {
        self.write_onboard(true);
        tokio::time::sleep(HEARTBEAT_PULSE).await;
        self.write_onboard(false);
    }

    async fn flash_ack(&mut self) {
        self.write_neopixel(true);
        self.write_onboard(true);
        tokio::time::sleep(ACK_FLASH).await;
        self.write_neopixel(self.current == Status::RedSolid);
        self.write_onboard(false);
    }
}
