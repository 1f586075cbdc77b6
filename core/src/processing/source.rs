use crate::hardware::adc::AdcReader;
use crate::prelude::{CoreError, CoreResult, ADC_MAX};
use crate::processing::doppler::{mph_to_mps, DopplerConverter};
use crate::telemetry::log::LogManager;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;
use std::thread;
use std::time::{Duration, Instant};

/// Produces a block of raw 10-bit amplitude readings.
///
/// Implementations always return exactly `count` samples.
pub trait SignalSource: Send {
    fn acquire(&mut self, count: usize, sample_rate_hz: u32) -> CoreResult<Vec<u16>>;
}

fn sample_interval(sample_rate_hz: u32) -> CoreResult<Duration> {
    if sample_rate_hz == 0 {
        return Err(CoreError::InvalidInput("sample rate must be positive".into()));
    }
    Ok(Duration::from_micros(1_000_000 / u64::from(sample_rate_hz)))
}

/// Samples one ADC channel at a fixed rate. Reads are paced against a
/// schedule anchored at the first read, so slow reads do not stretch the
/// sample period.
pub struct AdcSource<A: AdcReader> {
    adc: A,
    channel: u32,
    logger: LogManager,
}

impl<A: AdcReader> AdcSource<A> {
    pub fn new(adc: A, channel: u32, logger: LogManager) -> Self {
        Self {
            adc,
            channel,
            logger,
        }
    }
}

impl<A: AdcReader> SignalSource for AdcSource<A> {
    fn acquire(&mut self, count: usize, sample_rate_hz: u32) -> CoreResult<Vec<u16>> {
        let delay = sample_interval(sample_rate_hz)?;
        self.logger.debug(&format!(
            "Reading {} samples at {} Hz",
            count, sample_rate_hz
        ));

        let mut samples = Vec::with_capacity(count);
        let start = Instant::now();
        let mut due = start;
        for _ in 0..count {
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
            due += delay;
            let value = match self.adc.read_sample(self.channel) {
                Ok(value) => value.min(ADC_MAX),
                Err(err) => {
                    self.logger
                        .error(&format!("ADC read on channel {} failed: {}", self.channel, err));
                    0
                }
            };
            samples.push(value);
        }
        self.logger.debug(&format!(
            "Acquired {} samples in {:.1} ms",
            count,
            start.elapsed().as_secs_f64() * 1000.0
        ));
        Ok(samples)
    }
}

/// Stands in for an ADC that could not be opened; every acquisition fails.
pub struct UnavailableSource {
    reason: String,
}

impl UnavailableSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SignalSource for UnavailableSource {
    fn acquire(&mut self, _count: usize, _sample_rate_hz: u32) -> CoreResult<Vec<u16>> {
        Err(CoreError::HardwareUnavailable(self.reason.clone()))
    }
}

/// Generates the return of a target moving at a fixed speed: a sine at the
/// Doppler frequency around mid-scale plus uniform noise, without delay.
pub struct SyntheticSource {
    converter: DopplerConverter,
    speed_mph: f64,
    offset: f64,
    amplitude: f64,
    noise: f64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(converter: DopplerConverter, speed_mph: f64) -> Self {
        Self {
            converter,
            speed_mph,
            offset: 512.0,
            amplitude: 400.0,
            noise: 20.0,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Peak noise in ADC counts. Zero disables noise.
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    pub fn speed_mph(&self) -> f64 {
        self.speed_mph
    }

    /// Doppler shift the generated tone sits at.
    pub fn doppler_frequency_hz(&self) -> f64 {
        self.converter.speed_to_frequency(mph_to_mps(self.speed_mph))
    }
}

impl SignalSource for SyntheticSource {
    fn acquire(&mut self, count: usize, sample_rate_hz: u32) -> CoreResult<Vec<u16>> {
        if sample_rate_hz == 0 {
            return Err(CoreError::InvalidInput("sample rate must be positive".into()));
        }
        let frequency = self.doppler_frequency_hz();
        let rate = f64::from(sample_rate_hz);
        let samples = (0..count)
            .map(|i| {
                let t = i as f64 / rate;
                let jitter = if self.noise > 0.0 {
                    self.rng.gen_range(-self.noise..self.noise)
                } else {
                    0.0
                };
                let value = self.offset + self.amplitude * (2.0 * PI * frequency * t).sin() + jitter;
                value.clamp(0.0, f64::from(ADC_MAX)) as u16
            })
            .collect();
        Ok(samples)
    }
}
