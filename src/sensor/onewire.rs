use crate::error::PumpFailure;
use crate::pump_fail;
use crate::sensor::TempSensor;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::spawn_blocking;

/// ~750ms, the DS18B20's worst-case 12-bit conversion time, and the only
/// blocking wait the core allows.
const CONVERSION_WAIT: Duration = Duration::from_millis(750);

/// Reads a DS18B20 over the kernel's `w1` sysfs interface. The conversion
/// wait is pushed onto a blocking thread via `tokio::task::spawn_blocking`
/// so the current-thread executor is never stalled by it.
pub struct OneWireSensor {
    device_path: PathBuf,
}

impl OneWireSensor {
    pub fn new(device_path: impl Into<PathBuf>) -> Self {
        OneWireSensor {
            device_path: device_path.into(),
        }
    }
}

#[async_trait]
impl TempSensor for OneWireSensor {
    async fn read_celsius(&mut self) -> Result<f32, PumpFailure> {
        let path = self.device_path.clone();
        spawn_blocking(move || read_w1_slave(&path))
            .await
            .map_err(|e| pump_fail!(format!("1-wire read task panicked: {}", e)))?
    }
}

fn read_w1_slave(path: &std::path::Path) -> Result<f32, PumpFailure> {
    std::thread::sleep(CONVERSION_WAIT);
    let contents = std::fs::read_to_string(path)
        .map_err(|e| pump_fail!(format!("failed to read 1-wire sensor at {:?}: {}", path, e)))?;
    parse_w1_slave(&contents)
        .ok_or_else(|| pump_fail!(format!("unparsable or bad-CRC 1-wire reading at {:?}", path)))
}

/// Parses the two-line `w1_slave` format the kernel `w1_therm` driver
/// exposes, e.g.:
/// ```text
/// 5d 01 4b 46 7f ff 0c 10 41 : crc=41 YES
/// 5d 01 4b 46 7f ff 0c 10 41 t=21812
/// ```
/// Returns `None` if the CRC line doesn't say `YES` or the `t=` field is
/// missing, so callers treat a corrupted read the same as a hardware fault.
fn parse_w1_slave(contents: &str) -> Option<f32> {
    let mut lines = contents.lines();
    let crc_line = lines.next()?;
    if !crc_line.trim_end().ends_with("YES") {
        return None;
    }
    let data_line = lines.next()?;
    let millidegrees: i32 = data_line.rsplit("t=").next()?.trim().parse().ok()?;
    Some(millidegrees as f32 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_good_reading() {
        let contents = "5d 01 4b 46 7f ff 0c 10 41 : crc=41 YES\n5d 01 4b 46 7f ff 0c 10 41 t=21812\n";
        assert_eq!(parse_w1_slave(contents), Some(21.812));
    }

    #[test]
    fn rejects_bad_crc() {
        let contents = "5d 01 4b 46 7f ff 0c 10 41 : crc=41 NO\n5d 01 4b 46 7f ff 0c 10 41 t=21812\n";
        assert_eq!(parse_w1_slave(contents), None);
    }

    #[test]
    fn rejects_missing_temperature_field() {
        let contents = "5d 01 4b 46 7f ff 0c 10 41 : crc=41 YES\ngarbage\n";
        assert_eq!(parse_w1_slave(contents), None);
    }
}
