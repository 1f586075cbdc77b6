use crate::processing::doppler::{mps_to_mph, DopplerConverter, HB100_CARRIER_HZ};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Number of samples captured per measurement.
pub const DEFAULT_SAMPLE_COUNT: usize = 1024;
/// ADC sampling rate in Hz.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 10_000;
/// Largest reading a 10-bit ADC produces.
pub const ADC_MAX: u16 = 1023;

/// Radar acquisition and processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub sample_count: usize,
    pub sample_rate_hz: u32,
    pub adc_channel: u32,
    pub carrier_hz: f64,
    /// Target speed synthesized by the debug measurement path.
    pub debug_speed_mph: f64,
    /// IIO device directory exposing the ADC channels.
    pub iio_device: String,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            adc_channel: 0,
            carrier_hz: HB100_CARRIER_HZ,
            debug_speed_mph: 85.0,
            iio_device: "/sys/bus/iio/devices/iio:device0".to_string(),
        }
    }
}

impl RadarConfig {
    pub fn converter(&self) -> DopplerConverter {
        DopplerConverter::new(self.carrier_hz)
    }
}

/// IR beam-break trigger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// GPIO character device the trigger line is requested from.
    pub gpio_chip: String,
    pub gpio_pin: u32,
    pub cooldown_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            gpio_chip: "/dev/gpiochip0".to_string(),
            gpio_pin: 17,
            cooldown_ms: 500,
            poll_interval_ms: 10,
        }
    }
}

impl TriggerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of one radar measurement. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    speed_mps: f64,
    signal_strength: f64,
    timestamp: Instant,
}

impl Measurement {
    pub fn new(speed_mps: f64, signal_strength: f64, timestamp: Instant) -> Self {
        Self {
            speed_mps,
            signal_strength,
            timestamp,
        }
    }

    /// Sentinel returned whenever processing cannot run.
    pub fn zero(timestamp: Instant) -> Self {
        Self::new(0.0, 0.0, timestamp)
    }

    pub fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    pub fn speed_mph(&self) -> f64 {
        mps_to_mph(self.speed_mps)
    }

    /// Magnitude of the dominant spectral peak.
    pub fn signal_strength(&self) -> f64 {
        self.signal_strength
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn is_zero(&self) -> bool {
        self.speed_mps == 0.0 && self.signal_strength == 0.0
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} mph ({:.1} m/s), strength {:.1}",
            self.speed_mph(),
            self.speed_mps,
            self.signal_strength
        )
    }
}

/// Common error type for the radar and trigger subsystems.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(String),
    #[error("sample count mismatch, expected {expected} but got {actual}")]
    SampleSizeMismatch { expected: usize, actual: usize },
    #[error("transient read failure: {0}")]
    TransientRead(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
