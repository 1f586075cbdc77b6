use crate::session::history::{render_shot, SessionSummary, ShotHistory};
use crate::workflow::config::MonitorConfig;
use anyhow::Context;
use launchcore::hardware::{CdevGpioLine, IioAdc, LineReader, SimulatedLine, SysfsGpioLine};
use launchcore::processing::{AdcSource, SignalSource, SyntheticSource, UnavailableSource};
use launchcore::telemetry::LogManager;
use launchcore::{RadarCoordinator, TriggerStateMachine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

/// Wires the trigger to the radar and records every delivered shot.
pub struct Runner {
    config: MonitorConfig,
    radar: Arc<RadarCoordinator>,
    trigger: TriggerStateMachine,
    history: Arc<Mutex<ShotHistory>>,
    next_simulation: Option<Instant>,
    logger: LogManager,
}

impl Runner {
    pub fn new(config: MonitorConfig, logger: LogManager) -> anyhow::Result<Self> {
        logger.info("Initializing components...");
        let radar = RadarCoordinator::new(
            config.radar.clone(),
            build_source(&config, &logger),
            logger.clone(),
        )
        .context("creating radar coordinator")?;
        radar.initialize();
        let radar = Arc::new(radar);

        let history = Arc::new(Mutex::new(ShotHistory::new()));
        let shots = Arc::clone(&history);
        let shot_logger = logger.clone();
        radar.set_measurement_callback(move |measurement| {
            if let Ok(mut history) = shots.lock() {
                let line = render_shot(history.record(measurement));
                shot_logger.info(&line);
                println!("{}", line);
            }
        });

        let mut trigger =
            TriggerStateMachine::new(build_line(&config, &logger), &config.trigger, logger.clone());
        let trigger_radar = Arc::clone(&radar);
        trigger.set_trigger_callback(move |_timestamp| {
            trigger_radar.start_measurement();
        });

        let next_simulation = config
            .simulate_interval()
            .map(|interval| Instant::now() + interval);
        logger.info("Components initialized.");

        Ok(Self {
            config,
            radar,
            trigger,
            history,
            next_simulation,
            logger,
        })
    }

    #[cfg(test)]
    pub fn trigger_mut(&mut self) -> &mut TriggerStateMachine {
        &mut self.trigger
    }

    pub fn radar(&self) -> &RadarCoordinator {
        &self.radar
    }

    /// One tick of the main loop: advance the trigger and inject a simulated
    /// trigger when one is due.
    pub fn poll_once(&mut self) {
        self.trigger.update();
        if let (Some(due), Some(interval)) = (self.next_simulation, self.config.simulate_interval())
        {
            if Instant::now() >= due {
                self.trigger.simulate_trigger();
                self.next_simulation = Some(due + interval);
            }
        }
    }

    /// Polls at the configured cadence until `shutdown` is set.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        let cadence = self.config.trigger.poll_interval();
        self.logger.info(&format!(
            "Polling trigger every {} ms",
            cadence.as_millis()
        ));
        while !shutdown.load(Ordering::SeqCst) {
            self.poll_once();
            thread::sleep(cadence);
        }
    }

    /// Waits for in-flight shots, releases the radar and returns the session.
    pub fn finish(self) -> SessionSummary {
        self.radar.teardown();
        let metrics = self.radar.metrics().snapshot();
        self.logger.info(&format!(
            "Radar measurements: {} completed, {} failed ({} aborted)",
            metrics.completed(),
            metrics.failed(),
            metrics.aborted
        ));
        self.history
            .lock()
            .map(|history| history.summary())
            .unwrap_or_default()
    }
}

fn build_source(config: &MonitorConfig, logger: &LogManager) -> Box<dyn SignalSource> {
    if config.synthetic {
        logger.info(&format!(
            "Using synthetic radar return at {:.1} mph",
            config.radar.debug_speed_mph
        ));
        return Box::new(SyntheticSource::new(
            config.radar.converter(),
            config.radar.debug_speed_mph,
        ));
    }
    match IioAdc::open(&config.radar.iio_device) {
        Ok(adc) => Box::new(AdcSource::new(
            adc,
            config.radar.adc_channel,
            logger.clone(),
        )),
        Err(err) => {
            logger.error(&format!("Failed to initialize radar ADC: {}", err));
            Box::new(UnavailableSource::new(err.to_string()))
        }
    }
}

fn build_line(config: &MonitorConfig, logger: &LogManager) -> Box<dyn LineReader> {
    let pin = config.trigger.gpio_pin;
    let cdev_err = match CdevGpioLine::open(&config.trigger.gpio_chip, pin) {
        Ok(line) => return Box::new(line),
        Err(err) => err,
    };
    logger.warn(&format!("{}, trying sysfs GPIO", cdev_err));
    match SysfsGpioLine::open(pin) {
        Ok(line) => Box::new(line),
        Err(err) => {
            logger.error(&format!("Failed to initialize IR Trigger: {}", err));
            Box::new(SimulatedLine::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn synthetic_config(simulate_every_ms: Option<u64>) -> MonitorConfig {
        let mut config = MonitorConfig::from_args(1024, 10_000, 9999, true, simulate_every_ms);
        config.trigger.gpio_chip = "/nonexistent/gpiochip9".into();
        config.radar.debug_speed_mph = 90.0;
        config
    }

    #[test]
    fn simulated_trigger_records_a_shot() {
        let mut runner = Runner::new(synthetic_config(None), LogManager::new()).unwrap();
        runner.trigger_mut().simulate_trigger();
        let summary = runner.finish();
        assert_eq!(summary.shots, 1);
        assert!((summary.records[0].speed_mph - 90.0).abs() <= 3.0);
    }

    #[test]
    fn run_loop_fires_periodic_simulations_until_shutdown() {
        let mut runner = Runner::new(synthetic_config(Some(50)), LogManager::new()).unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            flag.store(true, Ordering::SeqCst);
        });
        runner.run(&shutdown);
        stopper.join().unwrap();

        let summary = runner.finish();
        assert!(summary.shots >= 2, "only {} shots", summary.shots);
        assert!(summary
            .records
            .iter()
            .all(|shot| (shot.speed_mph - 90.0).abs() <= 3.0));
        assert!((summary.max_mph - 90.0).abs() <= 3.0);
    }

    #[test]
    fn missing_adc_records_nothing() {
        let mut config = synthetic_config(None);
        config.synthetic = false;
        config.radar.iio_device = "/nonexistent/iio:device0".into();
        let mut runner = Runner::new(config, LogManager::new()).unwrap();
        runner.trigger_mut().simulate_trigger();
        let summary = runner.finish();
        assert_eq!(summary.shots, 0);
    }

    #[test]
    fn idle_line_never_triggers() {
        let mut runner = Runner::new(synthetic_config(None), LogManager::new()).unwrap();
        for _ in 0..10 {
            runner.poll_once();
        }
        assert!(!runner.radar().is_measuring());
        assert_eq!(runner.finish().shots, 0);
    }

    #[test]
    fn missing_gpio_hardware_falls_back_to_simulated_line() {
        let sink = launchcore::telemetry::MemorySink::new();
        let mut runner =
            Runner::new(synthetic_config(None), LogManager::with_sink(sink.clone())).unwrap();
        assert!(sink.contains("[WARN] hardware unavailable: requesting line 9999"));
        assert!(sink.contains("[ERROR] Failed to initialize IR Trigger"));
        runner.poll_once();
        assert_eq!(runner.finish().shots, 0);
    }
}
