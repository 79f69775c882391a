//! GPIO abstraction shared by the pump relay, onboard LED, NeoPixel and
//! backup button: a small `GPIOManager` trait, plus a `PinUpdate` value
//! pushed out over an mpsc channel every time a pin changes. That channel
//! is the interrupt -> main-context mailbox the backup button depends on.

pub mod dummy;
pub mod sysfs_gpio;

use std::io;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GPIOState {
    High,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GPIOMode {
    Input,
    Output,
}

pub trait GPIOManager {
    fn setup(&mut self, pin: usize, mode: &GPIOMode) -> Result<(), GPIOError>;

    fn set_pin(&mut self, pin: usize, state: &GPIOState) -> Result<(), GPIOError>;

    fn get_pin(&self, pin: usize) -> Result<GPIOState, GPIOError>;
}

#[derive(Debug)]
pub enum GPIOError {
    PinNotSetup,
    PinInIncorrectMode { required_mode: GPIOMode },
    Io(io::Error),
    Other(String),
}

impl std::fmt::Display for GPIOError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GPIOError::PinNotSetup => write!(f, "pin not set up"),
            GPIOError::PinInIncorrectMode { required_mode } => {
                write!(f, "pin is not in required mode {:?}", required_mode)
            }
            GPIOError::Io(e) => write!(f, "io error: {}", e),
            GPIOError::Other(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for GPIOError {}

/// Emitted whenever a pin transitions, so an interrupt-context write can be
/// observed from the main execution context without the handler itself
/// doing anything but a non-blocking send.
#[derive(Clone, Debug)]
pub struct PinUpdate {
    pub pin: usize,
    pub to: GPIOState,
}

impl PinUpdate {
    pub fn new(pin: usize, to: GPIOState) -> Self {
        PinUpdate { pin, to }
    }
}
