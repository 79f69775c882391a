//! Temperature sensing: a live 1-wire driver and a scripted stand-in
//! behind one trait.

pub mod mock;
pub mod onewire;

use crate::error::PumpFailure;
use async_trait::async_trait;

/// The DS18B20 conversion wait is the one blocking call the core
/// tolerates. `read_celsius` is async precisely so real drivers can push
/// that wait onto a blocking thread instead of stalling the executor.
#[async_trait]
pub trait TempSensor {
    async fn read_celsius(&mut self) -> Result<f32, PumpFailure>;
}

pub use mock::MockSensor;
pub use onewire::OneWireSensor;
