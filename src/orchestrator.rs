//! Process-wide wiring and lifecycle. Owns every collaborator and drives
//! the main-context event loop: timer and button events land in a mailbox
//! here and are dispatched one at a time, the same trampoline shape
//! `io::gpio`'s `PinUpdate` channel uses for pin transitions.

use crate::button::BackupButton;
use crate::config::Config;
use crate::detector::RisingDetector;
use crate::io::IOBundle;
use crate::time_util::Clock;
use crate::timer_wheel::{rearm_delay, TimerWheel, WheelEvent};
use crate::timetable::Timetable;
use crate::pump::PumpController;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

pub struct Orchestrator {
    config: Config,
    controller: PumpController,
    detector: RisingDetector,
    timetable: Timetable,
    timetable_path: PathBuf,
    io: IOBundle,
    clock: Box<dyn Clock>,
    button: BackupButton,
    wheel: TimerWheel,
    wheel_rx: Receiver<WheelEvent>,
    button_rx: Receiver<()>,
    button_watcher: JoinHandle<()>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        io: IOBundle,
        clock: Box<dyn Clock>,
        button_rx: Receiver<()>,
        button_watcher: JoinHandle<()>,
    ) -> Self {
        let now = clock.now();
        let timetable_path = config.timetable.file.clone();
        let timetable = Timetable::load(&timetable_path, config.timetable.slot_size_min);
        let controller = PumpController::new(now, config.pump.clone());
        let detector = RisingDetector::new(config.detector.history_len, config.detector.rise_threshold_c);

        let (wheel_tx, wheel_rx) = tokio::sync::mpsc::channel(16);
        let wheel = TimerWheel::new(config.tick_interval, config.pump.desinfect_time, wheel_tx);

        Orchestrator {
            config,
            controller,
            detector,
            timetable,
            timetable_path,
            io,
            clock,
            button: BackupButton::default(),
            wheel,
            wheel_rx,
            button_rx,
            button_watcher,
        }
    }

    /// Drives the mailbox forever; returns only when both the timer wheel
    /// and the button watcher have been shut down and their channels
    /// close. `main` drives this inside a `select!` against the shutdown
    /// signal so it can be cancelled cleanly.
    pub async fn run(&mut self) {
        self.rearm();
        loop {
            tokio::select! {
                event = self.wheel_rx.recv() => {
                    match event {
                        Some(event) => self.handle_wheel_event(event).await,
                        None => {
                            warn!("Timer wheel mailbox closed unexpectedly");
                            return;
                        }
                    }
                }
                press = self.button_rx.recv() => {
                    match press {
                        Some(()) => self.handle_button_press().await,
                        None => {
                            warn!("Button watcher mailbox closed unexpectedly");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn handle_wheel_event(&mut self, event: WheelEvent) {
        let now = self.clock.now();
        let rising = matches!(event, WheelEvent::Tick) && self.sample_rising().await;
        let (relay, indicator) = self.io.relay_and_indicator();
        let result = match event {
            WheelEvent::Tick => {
                self.controller
                    .tick(now, rising, &*self.clock, relay, indicator, &mut self.timetable)
                    .await
            }
            WheelEvent::Desinfect => {
                info!("Desinfect timer fired");
                self.controller
                    .desinfect(now, relay, indicator, &self.timetable, &self.timetable_path)
                    .await
            }
            WheelEvent::ScheduledRun => {
                self.controller.scheduled_run(now, &*self.clock, relay, indicator, &mut self.timetable)
            }
        };

        if let Err(e) = result {
            error!("Pump failure handling {:?}: {}", event, e);
        }

        if matches!(event, WheelEvent::Tick | WheelEvent::ScheduledRun) {
            self.rearm();
        }
    }

    async fn sample_rising(&mut self) -> bool {
        match self.io.sensor().read_celsius().await {
            Ok(value) => self.detector.sample(value),
            Err(e) => {
                warn!("Temperature read failed, treating as no demand: {}", e);
                false
            }
        }
    }

    async fn handle_button_press(&mut self) {
        let now = self.clock.now();
        self.button
            .handle_press(
                now,
                &self.timetable,
                &self.timetable_path,
                self.config.log_file.as_deref(),
                self.io.indicator(),
            )
            .await;
    }

    fn rearm(&mut self) {
        let now = self.clock.now();
        let next = self.timetable.next_alarm_delay(&*self.clock, now);
        if next.is_none() {
            debug!("No pending timetable slot to rearm the scheduled-run timer against");
        }
        let delay = rearm_delay(next, self.config.pump.quiet_time);
        self.wheel.rearm_scheduled(delay);
    }

    /// Graceful shutdown: timers deinitialised tick -> desinfect ->
    /// scheduled, then the timetable is flushed.
    pub fn shutdown(&mut self) {
        self.wheel.shutdown();
        self.button_watcher.abort();
        if self.timetable.persist(&self.timetable_path) {
            info!("Flushed timetable to {:?} on shutdown", self.timetable_path);
        }
    }
}
