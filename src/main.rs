use crate::config::Config;
use crate::indicator::GpioIndicator;
use crate::io::gpio::sysfs_gpio::SysFsGPIO;
use crate::io::gpio::{GPIOManager, GPIOMode, GPIOState};
use crate::io::IOBundle;
use crate::logging::init_logging;
use crate::pump::relay::GpioPumpRelay;
use crate::sensor::OneWireSensor;
use log::{error, info};
use std::{fs, panic};
use tokio::runtime::Builder;
use tokio::sync::mpsc::Sender;
use tracing_log::LogTracer;

mod button;
mod config;
mod detector;
mod error;
mod indicator;
mod io;
mod logging;
mod orchestrator;
mod pump;
mod sensor;
mod time_util;
mod timer_wheel;
mod timetable;

const CONFIG_FILE: &str = "wwpumpe.toml";

fn check_config() {
    let config = fs::read_to_string(CONFIG_FILE).expect("Unable to read config file. Is it missing?");
    let config: Config = toml::from_str(&config).expect("Error reading config file");
    config
        .timetable
        .validate()
        .expect("Invalid timetable configuration");
    info!("Config OK: {:?}", config);
}

fn main() {
    LogTracer::init().expect("Should be able to make tokio subscribers listen to the log crate!");
    let _logging_handle = init_logging().expect("Failed to initialize logger");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--check-config") {
        check_config();
        return;
    }

    info!("Preparing...");

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("PANICKED: {:?}: attempting to shut the pump relay off", panic_info);
        if let Err(e) = emergency_relay_off(&read_config()) {
            error!("Failed to reach the pump relay during panic shutdown: {}", e);
        }
        default_hook(panic_info);
    }));

    let config = read_config();
    let rt = Builder::new_current_thread()
        .enable_time()
        .enable_io()
        .build()
        .expect("Expected to be able to make a current-thread runtime");

    let io_bundle = make_io_bundle(&config).expect("Failed to set up GPIO collaborators");
    let button_watcher =
        button::ButtonWatcher::new(SysFsGPIO::new(make_pin_update_sink()), config.gpio.button_pin)
            .expect("Failed to set up backup button pin");
    let (button_tx, button_rx) = tokio::sync::mpsc::channel(8);
    let watcher_handle = button_watcher.spawn(button_tx);

    let clock: Box<dyn time_util::Clock> = Box::new(time_util::RealClock::default());
    let mut orchestrator =
        orchestrator::Orchestrator::new(config, io_bundle, clock, button_rx, watcher_handle);

    rt.block_on(async {
        #[cfg(target_family = "unix")]
        {
            let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to subscribe to SIGTERM");
            tokio::select! {
                _ = orchestrator.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT, shutting down");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                }
            }
        }
        #[cfg(not(target_family = "unix"))]
        {
            tokio::select! {
                _ = orchestrator.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Received termination signal, shutting down");
                }
            }
        }
    });

    orchestrator.shutdown();
    info!("Stopped safely.");
}

fn read_config() -> Config {
    match config::try_read_config() {
        Some(config) => config,
        None => {
            error!("Using default config as {} could not be read", CONFIG_FILE);
            Config::default()
        }
    }
}

fn emergency_relay_off(config: &Config) -> Result<(), crate::io::gpio::GPIOError> {
    let mut gpio = SysFsGPIO::new(make_pin_update_sink());
    gpio.setup(config.gpio.pump_relay_pin, &GPIOMode::Output)?;
    let off = if config.gpio.pump_relay_active_low {
        GPIOState::High
    } else {
        GPIOState::Low
    };
    gpio.set_pin(config.gpio.pump_relay_pin, &off)
}

fn make_pin_update_sink() -> Sender<io::gpio::PinUpdate> {
    let (sender, _recv) = tokio::sync::mpsc::channel(25);
    sender
}

fn make_io_bundle(config: &Config) -> Result<IOBundle, crate::io::gpio::GPIOError> {
    let relay_gpio = SysFsGPIO::new(make_pin_update_sink());
    let relay = GpioPumpRelay::create(relay_gpio, config.gpio.pump_relay_pin, config.gpio.pump_relay_active_low)?;

    let indicator_gpio = SysFsGPIO::new(make_pin_update_sink());
    let indicator = GpioIndicator::new(indicator_gpio, config.gpio.neopixel_pin, config.gpio.onboard_led_pin)?;

    let sensor = OneWireSensor::new(format!("/sys/bus/w1/devices/28-{:03}/w1_slave", config.gpio.ds18b20_pin));

    Ok(IOBundle::new(sensor, relay, indicator))
}
