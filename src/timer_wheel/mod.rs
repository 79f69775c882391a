//! Three timers driving the pump: a 1 Hz tick, a periodic desinfect run,
//! and a one-shot scheduled-run timer that re-arms itself against
//! `Timetable::next_alarm_delay` every time it fires.
//!
//! Each timer is its own `tokio::spawn`ed loop holding a `JoinHandle`, and
//! "deinitialise before re-arm" is just `JoinHandle::abort` before spawning
//! the replacement. Firing pushes an event into the shared mailbox (the
//! `io::gpio` `PinUpdate` trampoline, generalised) rather than calling
//! back into `PumpController` directly - callbacks must defer into a
//! scheduler-safe queue instead of doing real work themselves.

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelEvent {
    Tick,
    Desinfect,
    ScheduledRun,
}

/// Owns the periodic tick and desinfect loops and the rearm-able one-shot
/// scheduled-run timer. Never touches `PumpController` or `Timetable`
/// itself; it only ever sends `WheelEvent`s for the main loop to act on.
pub struct TimerWheel {
    sender: Sender<WheelEvent>,
    tick_handle: JoinHandle<()>,
    desinfect_handle: JoinHandle<()>,
    scheduled_handle: Option<JoinHandle<()>>,
}

impl TimerWheel {
    pub fn new(tick_period: Duration, desinfect_period: Duration, sender: Sender<WheelEvent>) -> Self {
        let tick_handle = spawn_periodic(tick_period, sender.clone(), WheelEvent::Tick);
        let desinfect_handle = spawn_periodic(desinfect_period, sender.clone(), WheelEvent::Desinfect);
        TimerWheel {
            sender,
            tick_handle,
            desinfect_handle,
            scheduled_handle: None,
        }
    }

    /// Re-arms the one-shot scheduled-run timer. Always deinitialise the
    /// previous timer before arming the new one, so a stale timer from
    /// the last rearm can never double-fire.
    pub fn rearm_scheduled(&mut self, delay: Option<Duration>) {
        if let Some(handle) = self.scheduled_handle.take() {
            handle.abort();
        }
        let Some(delay) = delay else {
            return;
        };
        let sender = self.sender.clone();
        self.scheduled_handle = Some(tokio::spawn(async move {
            sleep(delay).await;
            let _ = sender.send(WheelEvent::ScheduledRun).await;
        }));
    }

    /// Deinitialises all three timers, in shutdown order: tick, then
    /// desinfect, then scheduled.
    pub fn shutdown(&mut self) {
        self.tick_handle.abort();
        self.desinfect_handle.abort();
        if let Some(handle) = self.scheduled_handle.take() {
            handle.abort();
        }
    }
}

fn spawn_periodic(period: Duration, sender: Sender<WheelEvent>, event: WheelEvent) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if sender.send(event).await.is_err() {
                return;
            }
        }
    })
}

/// Pure rearm-delay arithmetic, split out of `rearm_scheduled` so it can be
/// exercised without a runtime: arm for
/// `max(1, d - QUIET_TIME) * 1000ms` so the pump is primed before the
/// expected demand window.
pub fn rearm_delay(next_alarm: Option<i64>, quiet_time: Duration) -> Option<Duration> {
    let d = next_alarm?;
    let quiet = quiet_time.as_secs() as i64;
    let lead = std::cmp::max(1, d - quiet);
    Some(Duration::from_secs(lead as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn rearm_delay_none_when_no_next_alarm() {
        assert_eq!(rearm_delay(None, Duration::from_secs(60)), None);
    }

    #[test]
    fn rearm_delay_subtracts_quiet_time() {
        let delay = rearm_delay(Some(300), Duration::from_secs(60)).unwrap();
        assert_eq!(delay, Duration::from_secs(240));
    }

    #[test]
    fn rearm_delay_floors_at_one_second() {
        // Next alarm is sooner than QUIET_TIME away: still arm, just as
        // close to immediately as allowed, rather than a negative delay.
        let delay = rearm_delay(Some(10), Duration::from_secs(60)).unwrap();
        assert_eq!(delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn tick_timer_fires_repeatedly() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut wheel = TimerWheel::new(Duration::from_millis(5), Duration::from_secs(3600), tx);

        for _ in 0..3 {
            assert_eq!(rx.recv().await, Some(WheelEvent::Tick));
        }
        wheel.shutdown();
    }

    #[tokio::test]
    async fn scheduled_run_fires_once_after_rearm() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut wheel = TimerWheel::new(Duration::from_secs(3600), Duration::from_secs(3600), tx);

        wheel.rearm_scheduled(Some(Duration::from_millis(5)));
        assert_eq!(rx.recv().await, Some(WheelEvent::ScheduledRun));
        wheel.shutdown();
    }

    #[tokio::test]
    async fn rearm_cancels_previous_timer() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut wheel = TimerWheel::new(Duration::from_secs(3600), Duration::from_secs(3600), tx);

        wheel.rearm_scheduled(Some(Duration::from_millis(50)));
        wheel.rearm_scheduled(Some(Duration::from_millis(5)));

        assert_eq!(rx.recv().await, Some(WheelEvent::ScheduledRun));
        // Only one ScheduledRun should ever arrive; the first timer was
        // aborted before it could fire.
        let second = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(second.is_err(), "stale timer must not have fired a second event");
        wheel.shutdown();
    }
}
