use crate::math::fft::TransformResources;
use crate::math::stats::StatsHelper;
use crate::math::window::hamming;
use crate::prelude::{CoreError, Measurement};
use crate::processing::activity::InFlight;
use crate::processing::doppler::{mps_to_mph, DopplerConverter};
use crate::telemetry::log::LogManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Number of spectral peaks retained for diagnostics.
pub const MAX_PEAKS: usize = 5;

/// One candidate spectral peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub bin: usize,
    pub frequency_hz: f64,
    pub magnitude: f64,
    pub speed_mph: f64,
}

/// Full output of one processing call.
#[derive(Debug, Clone)]
pub struct SpectralReport {
    pub measurement: Measurement,
    /// Strongest peaks, magnitude descending.
    pub peaks: Vec<Peak>,
    pub dominant_bin: usize,
    pub dominant_frequency_hz: f64,
    pub frequency_resolution_hz: f64,
}

impl SpectralReport {
    fn empty(timestamp: Instant) -> Self {
        Self {
            measurement: Measurement::zero(timestamp),
            peaks: Vec::new(),
            dominant_bin: 0,
            dominant_frequency_hz: 0.0,
            frequency_resolution_hz: 0.0,
        }
    }
}

/// Turns a block of ADC readings into a speed estimate.
///
/// The transform resources are created by `initialize`, reused under a lock
/// by every `process` call, and released by `teardown` once no measurement
/// is in flight.
pub struct SpectralEstimator {
    resources: Mutex<Option<TransformResources>>,
    planned_size: AtomicUsize,
    activity: Arc<InFlight>,
    converter: DopplerConverter,
    logger: LogManager,
}

impl SpectralEstimator {
    pub fn new(converter: DopplerConverter, logger: LogManager) -> Self {
        Self {
            resources: Mutex::new(None),
            planned_size: AtomicUsize::new(0),
            activity: Arc::new(InFlight::new()),
            converter,
            logger,
        }
    }

    pub fn converter(&self) -> DopplerConverter {
        self.converter
    }

    /// Tracker that `teardown` waits on before releasing the buffers.
    pub fn activity(&self) -> &Arc<InFlight> {
        &self.activity
    }

    pub fn is_initialized(&self) -> bool {
        self.planned_size.load(Ordering::Acquire) != 0
    }

    /// Sample count the resources are sized for, 0 when uninitialized.
    pub fn sample_count(&self) -> usize {
        self.planned_size.load(Ordering::Acquire)
    }

    /// Plans the transform for `sample_count` samples. A no-op when resources
    /// of that size already exist. Failures are logged and leave the
    /// estimator uninitialized.
    pub fn initialize(&self, sample_count: usize) {
        let mut guard = self.resources.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = guard.as_ref() {
            if existing.size() == sample_count {
                return;
            }
        }
        match TransformResources::new(sample_count) {
            Ok(resources) => {
                *guard = Some(resources);
                self.planned_size.store(sample_count, Ordering::Release);
                self.logger.info(&format!(
                    "Transform resources planned for {} samples",
                    sample_count
                ));
            }
            Err(err) => {
                *guard = None;
                self.planned_size.store(0, Ordering::Release);
                self.logger
                    .error(&format!("Failed to create transform plan: {}", err));
            }
        }
    }

    /// Blocks until no measurement is in flight, then frees the resources.
    /// Safe to call when never initialized.
    pub fn teardown(&self) {
        self.activity.wait_idle();
        let mut guard = self.resources.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            self.planned_size.store(0, Ordering::Release);
            self.logger.info("Transform resources released");
        }
    }

    pub fn process(&self, samples: &[u16], sample_rate_hz: u32) -> Measurement {
        self.analyze(samples, sample_rate_hz).measurement
    }

    pub fn analyze(&self, samples: &[u16], sample_rate_hz: u32) -> SpectralReport {
        let timestamp = Instant::now();
        self.logger.debug(&format!(
            "Processing {} samples with diagnostics",
            samples.len()
        ));

        let expected = self.sample_count();
        if samples.len() != expected {
            let mismatch = CoreError::SampleSizeMismatch {
                expected,
                actual: samples.len(),
            };
            self.logger.debug(&mismatch.to_string());
            return SpectralReport::empty(timestamp);
        }

        let mut guard = self.resources.lock().unwrap_or_else(PoisonError::into_inner);
        let resources = match guard.as_mut() {
            Some(resources) if resources.size() == samples.len() => resources,
            _ => {
                self.logger.error("Transform resources not available");
                return SpectralReport::empty(timestamp);
            }
        };

        let mean = StatsHelper::mean(samples);
        self.logger.debug(&format!("DC offset (mean): {:.6}", mean));

        let input = resources.input_mut();
        for (slot, &sample) in input.iter_mut().zip(samples) {
            *slot = f64::from(sample) - mean;
        }
        hamming(input);

        let n = samples.len();
        let resolution = f64::from(sample_rate_hz) / n as f64;
        self.logger.debug(&format!(
            "Frequency resolution: {:.6} Hz per bin",
            resolution
        ));

        let spectrum = resources.execute();
        let mut max_magnitude = 0.0;
        let mut max_bin = 0;
        let mut peaks: Vec<Peak> = Vec::with_capacity(MAX_PEAKS + 1);

        // Bin 0 is the DC term. The candidate test only looks at the weakest
        // retained peak, so the list is an approximate top five.
        for (bin, value) in spectrum.iter().enumerate().take(n / 2).skip(1) {
            let magnitude = value.norm();
            if magnitude > max_magnitude {
                max_magnitude = magnitude;
                max_bin = bin;
            }

            let weakest = peaks.last().map_or(0.0, |peak| peak.magnitude);
            if peaks.len() < MAX_PEAKS || magnitude > weakest {
                let frequency_hz = bin as f64 * resolution;
                peaks.push(Peak {
                    bin,
                    frequency_hz,
                    magnitude,
                    speed_mph: mps_to_mph(self.converter.frequency_to_speed(frequency_hz)),
                });
                peaks.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
                peaks.truncate(MAX_PEAKS);
            }
        }
        drop(guard);

        for peak in &peaks {
            self.logger.debug(&format!(
                "Peak at bin {}: {:.3} Hz, magnitude {:.3}, equals {:.3} mph",
                peak.bin, peak.frequency_hz, peak.magnitude, peak.speed_mph
            ));
        }

        let dominant_frequency_hz = max_bin as f64 * resolution;
        self.logger.debug(&format!(
            "Dominant frequency: {:.3} Hz at bin {}",
            dominant_frequency_hz, max_bin
        ));

        let speed_mps = self.converter.frequency_to_speed(dominant_frequency_hz);
        self.logger.debug(&format!(
            "Speed calculation: {:.3} Hz -> {:.3} m/s -> {:.3} mph",
            dominant_frequency_hz,
            speed_mps,
            mps_to_mph(speed_mps)
        ));

        SpectralReport {
            measurement: Measurement::new(speed_mps, max_magnitude, timestamp),
            peaks,
            dominant_bin: max_bin,
            dominant_frequency_hz,
            frequency_resolution_hz: resolution,
        }
    }
}
