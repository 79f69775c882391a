//! The backup button: a debounced GPIO input that flushes the learned
//! timetable to disk on demand.
//!
//! The debounce decision itself is kept separate from anything
//! IO-shaped, in the same spirit as `detector::RisingDetector` - plain data
//! in, `bool` out - so the "was this press acted upon" question can be
//! tested without spinning up a runtime or a GPIO stub.

use crate::indicator::Indicator;
use crate::io::gpio::{GPIOError, GPIOManager, GPIOMode, GPIOState};
use crate::timetable::Timetable;
use log::{info, warn};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub const DEBOUNCE: Duration = Duration::from_secs(2);

/// Polls the button pin for falling edges and forwards them into the main
/// event mailbox. `sysfs_gpio` has no true edge-interrupt API, so this
/// stands in for interrupt context: the poll loop itself does nothing but
/// read a pin and `try_send` - the debounce check and the actual flush
/// happen later, on the main context, in `BackupButton`.
const POLL_PERIOD: Duration = Duration::from_millis(20);

pub struct ButtonWatcher<G: GPIOManager> {
    gpio: G,
    pin: usize,
}

impl<G: GPIOManager> ButtonWatcher<G> {
    pub fn new(mut gpio: G, pin: usize) -> Result<Self, GPIOError> {
        gpio.setup(pin, &GPIOMode::Input)?;
        Ok(ButtonWatcher { gpio, pin })
    }

    pub fn spawn(mut self, sender: Sender<()>) -> JoinHandle<()>
    where
        G: Send + 'static,
    {
        tokio::spawn(async move {
            let mut was_low = false;
            loop {
                tokio::time::sleep(POLL_PERIOD).await;
                let low = matches!(self.gpio.get_pin(self.pin), Ok(GPIOState::Low));
                if low && !was_low && sender.send(()).await.is_err() {
                    return;
                }
                was_low = low;
            }
        })
    }
}

/// Debounce state for the backup button. A press arriving less than
/// `DEBOUNCE` after the previously *acted-upon* press is silently dropped -
/// this is expected operator behaviour, not a fault.
pub struct BackupButton {
    last_acted: Option<i64>,
    debounce: Duration,
}

impl BackupButton {
    pub fn new(debounce: Duration) -> Self {
        BackupButton {
            last_acted: None,
            debounce,
        }
    }

    /// Returns `true` if this press clears the debounce window and should
    /// be acted on.
    fn should_act(&mut self, now: i64) -> bool {
        let debounce_secs = self.debounce.as_secs() as i64;
        match self.last_acted {
            Some(last) if now - last < debounce_secs => false,
            _ => {
                self.last_acted = Some(now);
                true
            }
        }
    }

    /// Handles one press event on the main execution context - the
    /// debounce check and the flush itself never run in interrupt context.
    /// Flushes the timetable, blinks the indicator, and logs the action
    /// when it isn't dropped by the debounce window.
    ///
    /// `log_file` is an append-only sink written only here, on an
    /// acted-upon press, when a file sink is configured (`None` means
    /// stdout-only logging is in effect).
    pub async fn handle_press(
        &mut self,
        now: i64,
        timetable: &Timetable,
        timetable_path: impl AsRef<std::path::Path>,
        log_file: Option<&Path>,
        indicator: &mut dyn Indicator,
    ) -> bool {
        if !self.should_act(now) {
            return false;
        }

        let persisted = timetable.persist(timetable_path);
        let message = format!(
            "Backup button pressed: flushed timetable ({})",
            if persisted { "written" } else { "nothing to write" }
        );
        info!("{}", message);
        if let Some(path) = log_file {
            append_log_line(path, now, &message);
        }
        indicator.flash_ack().await;
        true
    }
}

/// Appends one UTF-8 line to `path`. Failures are logged and otherwise
/// swallowed; a broken log sink must not stop the button from having
/// flushed the timetable.
fn append_log_line(path: &Path, now: i64, message: &str) {
    let line = format!("{now} {message}\n");
    let result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| f.write_all(line.as_bytes()));
    if let Err(e) = result {
        warn!("Failed to append to log file {:?}: {}", path, e);
    }
}

impl Default for BackupButton {
    fn default() -> Self {
        Self::new(DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::dummy::DummyIndicator;

    #[tokio::test]
    async fn first_press_always_acted_on() {
        let mut button = BackupButton::new(Duration::from_secs(2));
        let mut table = Timetable::new(15);
        let clock = crate::time_util::DummyClock::new(0);
        table.record(&clock, 0, true);
        let mut indicator = DummyIndicator::new();
        let dir = std::env::temp_dir().join(format!("wwpumpe-button-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("timetable");

        let acted = button.handle_press(1000, &table, &path, None, &mut indicator).await;
        assert!(acted);
        assert!(path.exists());
        assert_eq!(indicator.flash_count(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn press_inside_debounce_window_is_dropped() {
        let mut button = BackupButton::new(Duration::from_secs(2));
        let table = Timetable::new(15);
        let mut indicator = DummyIndicator::new();

        assert!(button.handle_press(1000, &table, "/nonexistent/should-not-write", None, &mut indicator).await);
        assert!(!button.handle_press(1001, &table, "/nonexistent/should-not-write", None, &mut indicator).await);
        assert_eq!(indicator.flash_count(), 1, "the dropped press must not flash");
    }

    #[tokio::test]
    async fn press_after_debounce_window_is_acted_on() {
        let mut button = BackupButton::new(Duration::from_secs(2));
        let table = Timetable::new(15);
        let mut indicator = DummyIndicator::new();

        assert!(button.handle_press(1000, &table, "/nonexistent/should-not-write", None, &mut indicator).await);
        assert!(button.handle_press(1002, &table, "/nonexistent/should-not-write", None, &mut indicator).await);
        assert_eq!(indicator.flash_count(), 2);
    }

    #[tokio::test]
    async fn acted_press_appends_a_log_line_when_a_sink_is_configured() {
        let mut button = BackupButton::new(Duration::from_secs(2));
        let mut table = Timetable::new(15);
        let clock = crate::time_util::DummyClock::new(0);
        table.record(&clock, 0, true);
        let mut indicator = DummyIndicator::new();
        let dir = std::env::temp_dir().join(format!("wwpumpe-button-log-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let timetable_path = dir.join("timetable");
        let log_path = dir.join("wwpumpe.log");

        button.handle_press(1000, &table, &timetable_path, Some(&log_path), &mut indicator).await;
        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert!(contents.contains("Backup button pressed"));

        button.handle_press(5000, &table, &timetable_path, Some(&log_path), &mut indicator).await;
        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.lines().count(), 2, "log file is append-only");

        std::fs::remove_dir_all(&dir).ok();
    }
}
