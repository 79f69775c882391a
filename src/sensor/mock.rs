use crate::error::PumpFailure;
use crate::pump_fail;
use crate::sensor::TempSensor;
use async_trait::async_trait;
use std::collections::VecDeque;

/// A constant or scripted sensor for bench operation and tests.
pub struct MockSensor {
    constant: f32,
    script: VecDeque<f32>,
    is_scripted: bool,
}

impl MockSensor {
    pub fn constant(value: f32) -> Self {
        MockSensor {
            constant: value,
            script: VecDeque::new(),
            is_scripted: false,
        }
    }

    pub fn scripted(values: impl IntoIterator<Item = f32>) -> Self {
        MockSensor {
            constant: 0.0,
            script: values.into_iter().collect(),
            is_scripted: true,
        }
    }
}

#[async_trait]
impl TempSensor for MockSensor {
    async fn read_celsius(&mut self) -> Result<f32, PumpFailure> {
        if !self.is_scripted {
            return Ok(self.constant);
        }
        self.script
            .pop_front()
            .ok_or_else(|| pump_fail!("scripted sensor exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn constant_sensor_always_returns_same_value() {
        let mut sensor = MockSensor::constant(21.5);
        assert_eq!(sensor.read_celsius().await.unwrap(), 21.5);
        assert_eq!(sensor.read_celsius().await.unwrap(), 21.5);
    }

    #[tokio::test]
    async fn scripted_sensor_plays_back_in_order() {
        let mut sensor = MockSensor::scripted([20.0, 20.1, 20.3]);
        assert_eq!(sensor.read_celsius().await.unwrap(), 20.0);
        assert_eq!(sensor.read_celsius().await.unwrap(), 20.1);
        assert_eq!(sensor.read_celsius().await.unwrap(), 20.3);
    }
}
