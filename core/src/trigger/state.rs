use crate::hardware::gpio::LineReader;
use crate::prelude::TriggerConfig;
use crate::telemetry::log::LogManager;
use std::time::{Duration, Instant};

pub type TriggerCallback = Box<dyn FnMut(Instant) + Send>;

/// Debounce state of the beam-break trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Triggered,
    Cooldown,
}

/// Turns polled line levels into discrete trigger events.
///
/// `update` is non-blocking and meant to be called on a fixed cadence. Any
/// active read while idle fires the callback once, then the machine passes
/// through `Triggered` into `Cooldown` until the cooldown has elapsed.
pub struct TriggerStateMachine {
    line: Box<dyn LineReader>,
    state: TriggerState,
    last_trigger: Instant,
    cooldown: Duration,
    callback: Option<TriggerCallback>,
    logger: LogManager,
}

impl TriggerStateMachine {
    pub fn new(line: Box<dyn LineReader>, config: &TriggerConfig, logger: LogManager) -> Self {
        logger.info(&format!("IR Trigger initialized on GPIO pin {}", config.gpio_pin));
        Self {
            line,
            state: TriggerState::Idle,
            last_trigger: Instant::now(),
            cooldown: config.cooldown(),
            callback: None,
            logger,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn last_trigger(&self) -> Instant {
        self.last_trigger
    }

    pub fn set_trigger_callback<F>(&mut self, callback: F)
    where
        F: FnMut(Instant) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn update(&mut self) {
        let now = Instant::now();
        match self.state {
            TriggerState::Idle => {
                if self.line_active() {
                    self.state = TriggerState::Triggered;
                    self.last_trigger = now;
                    self.logger.debug("IR Trigger activated");
                    self.fire();
                }
            }
            TriggerState::Triggered => {
                self.state = TriggerState::Cooldown;
            }
            TriggerState::Cooldown => {
                if now.duration_since(self.last_trigger) >= self.cooldown {
                    self.state = TriggerState::Idle;
                    self.logger.debug("IR Trigger cooldown complete");
                }
            }
        }
    }

    /// Fires a trigger without consulting the line.
    pub fn simulate_trigger(&mut self) {
        self.last_trigger = Instant::now();
        self.state = TriggerState::Triggered;
        self.logger.debug("IR Trigger manually simulated");
        self.fire();
    }

    fn fire(&mut self) {
        let timestamp = self.last_trigger;
        if let Some(callback) = self.callback.as_mut() {
            callback(timestamp);
        }
    }

    fn line_active(&mut self) -> bool {
        match self.line.read_level() {
            Ok(level) => level,
            Err(err) => {
                self.logger.error(&format!("Failed to read GPIO: {}", err));
                false
            }
        }
    }
}
