use crate::prelude::{CoreError, CoreResult, Measurement, RadarConfig};
use crate::processing::source::{SignalSource, SyntheticSource};
use crate::processing::spectral::SpectralEstimator;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{MetricsRecorder, Outcome};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::runtime::{Builder, Runtime};

pub type MeasurementCallback = Arc<dyn Fn(&Measurement) + Send + Sync>;

/// Runs acquisition, spectral processing and Doppler conversion off the
/// caller's thread and hands the result to the registered callback.
///
/// Overlapping starts are accepted; they serialize on the source and the
/// transform lock. The in-flight guard is held until the callback returns
/// and the outcome is recorded, so `teardown` must not be called from inside
/// the callback.
pub struct RadarCoordinator {
    config: RadarConfig,
    estimator: Arc<SpectralEstimator>,
    source: Arc<Mutex<Box<dyn SignalSource>>>,
    callback: Arc<RwLock<Option<MeasurementCallback>>>,
    metrics: Arc<MetricsRecorder>,
    runtime: Runtime,
    logger: LogManager,
}

impl RadarCoordinator {
    pub fn new(
        config: RadarConfig,
        source: Box<dyn SignalSource>,
        logger: LogManager,
    ) -> CoreResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("radar-worker")
            .build()
            .map_err(|err| CoreError::Internal(format!("creating radar runtime: {}", err)))?;
        let estimator = Arc::new(SpectralEstimator::new(config.converter(), logger.clone()));
        Ok(Self {
            config,
            estimator,
            source: Arc::new(Mutex::new(source)),
            callback: Arc::new(RwLock::new(None)),
            metrics: Arc::new(MetricsRecorder::new()),
            runtime,
            logger,
        })
    }

    pub fn config(&self) -> &RadarConfig {
        &self.config
    }

    pub fn estimator(&self) -> &Arc<SpectralEstimator> {
        &self.estimator
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn initialize(&self) {
        self.logger.debug(&format!(
            "Initializing radar on ADC channel {}",
            self.config.adc_channel
        ));
        self.estimator.initialize(self.config.sample_count);
        self.logger.info(&format!(
            "Radar initialized on ADC channel {}",
            self.config.adc_channel
        ));
    }

    pub fn set_measurement_callback<F>(&self, callback: F)
    where
        F: Fn(&Measurement) + Send + Sync + 'static,
    {
        let mut slot = self.callback.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(callback));
    }

    pub fn is_measuring(&self) -> bool {
        self.estimator.activity().is_busy()
    }

    /// Starts a measurement on the radar worker and returns immediately.
    pub fn start_measurement(&self) {
        if self.is_measuring() {
            self.logger
                .debug("Measurement already in progress, queuing behind it");
        } else {
            self.logger.debug("Starting radar measurement");
        }

        let guard = self.estimator.activity().enter();
        let estimator = Arc::clone(&self.estimator);
        let source = Arc::clone(&self.source);
        let callback = Arc::clone(&self.callback);
        let metrics = Arc::clone(&self.metrics);
        let logger = self.logger.clone();
        let sample_count = self.config.sample_count;
        let sample_rate_hz = self.config.sample_rate_hz;

        self.runtime.spawn_blocking(move || {
            let _guard = guard;
            let outcome = contain(&logger, "Radar measurement aborted", || {
                let acquired = source
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .acquire(sample_count, sample_rate_hz);
                let samples = match acquired {
                    Ok(samples) => samples,
                    Err(err) => {
                        logger.error(&format!("Error in radar measurement: {}", err));
                        return Outcome::SourceFailed;
                    }
                };
                let measurement = estimator.process(&samples, sample_rate_hz);
                deliver(&callback, &measurement, &logger);
                Outcome::Delivered
            });
            metrics.record(outcome);
        });
    }

    /// Synthesizes a return at `debug_speed_mph`, processes it and invokes the
    /// callback before returning. A panicking callback is logged, not
    /// propagated.
    pub fn start_debug_measurement(&self) {
        self.logger
            .debug("Starting DEBUG radar measurement with synthetic data");
        let _guard = self.estimator.activity().enter();

        let outcome = contain(&self.logger, "Debug radar measurement aborted", || {
            let speed_mph = self.config.debug_speed_mph;
            let mut source = SyntheticSource::new(self.estimator.converter(), speed_mph);
            self.logger.debug(&format!(
                "Debug setup: speed={:.1} mph, expected Doppler frequency={:.3} Hz",
                speed_mph,
                source.doppler_frequency_hz()
            ));

            let samples =
                match source.acquire(self.config.sample_count, self.config.sample_rate_hz) {
                    Ok(samples) => samples,
                    Err(err) => {
                        self.logger
                            .error(&format!("Error in debug radar measurement: {}", err));
                        return Outcome::SourceFailed;
                    }
                };

            let measurement = self.estimator.process(&samples, self.config.sample_rate_hz);
            self.logger.debug(&format!(
                "Measurement processed: {:.1} mph (expected: {:.1} mph)",
                measurement.speed_mph(),
                speed_mph
            ));
            deliver(&self.callback, &measurement, &self.logger);
            Outcome::Delivered
        });
        self.metrics.record(outcome);
    }

    /// Waits for in-flight measurements, then releases the transform
    /// resources.
    pub fn teardown(&self) {
        self.estimator.teardown();
        self.logger.info("Radar resources cleaned up");
    }
}

/// Runs one measurement, turning a panic anywhere inside it into a logged
/// `Outcome::Aborted`.
fn contain<F>(logger: &LogManager, context: &str, work: F) -> Outcome
where
    F: FnOnce() -> Outcome,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            logger.error(&format!("{}: {}", context, panic_message(payload.as_ref())));
            Outcome::Aborted
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn deliver(
    callback: &RwLock<Option<MeasurementCallback>>,
    measurement: &Measurement,
    logger: &LogManager,
) {
    let registered = callback
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match registered {
        Some(callback) => callback(measurement),
        None => logger.debug("No measurement callback registered"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::DEFAULT_SAMPLE_COUNT;
    use crate::processing::doppler::DopplerConverter;
    use crate::telemetry::log::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    struct SlowSource {
        inner: SyntheticSource,
        delay: Duration,
    }

    impl SignalSource for SlowSource {
        fn acquire(&mut self, count: usize, sample_rate_hz: u32) -> CoreResult<Vec<u16>> {
            thread::sleep(self.delay);
            self.inner.acquire(count, sample_rate_hz)
        }
    }

    struct BrokenSource;

    impl SignalSource for BrokenSource {
        fn acquire(&mut self, _count: usize, _sample_rate_hz: u32) -> CoreResult<Vec<u16>> {
            Err(CoreError::HardwareUnavailable("ADC offline".into()))
        }
    }

    struct PanickingSource;

    impl SignalSource for PanickingSource {
        fn acquire(&mut self, _count: usize, _sample_rate_hz: u32) -> CoreResult<Vec<u16>> {
            panic!("driver fault");
        }
    }

    /// Panics on the first acquisition and behaves afterwards.
    struct FlakySource {
        inner: SyntheticSource,
        faulted: bool,
    }

    impl SignalSource for FlakySource {
        fn acquire(&mut self, count: usize, sample_rate_hz: u32) -> CoreResult<Vec<u16>> {
            if !self.faulted {
                self.faulted = true;
                panic!("driver fault");
            }
            self.inner.acquire(count, sample_rate_hz)
        }
    }

    fn synthetic(speed_mph: f64) -> Box<dyn SignalSource> {
        Box::new(SyntheticSource::new(DopplerConverter::default(), speed_mph).with_seed(42))
    }

    fn coordinator(source: Box<dyn SignalSource>) -> RadarCoordinator {
        let coordinator =
            RadarCoordinator::new(RadarConfig::default(), source, LogManager::new()).unwrap();
        coordinator.initialize();
        coordinator
    }

    #[test]
    fn measurement_is_delivered_from_background() {
        let radar = coordinator(synthetic(75.0));
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        radar.set_measurement_callback(move |measurement| {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(*measurement);
            }
        });

        radar.start_measurement();
        let measurement = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!((measurement.speed_mph() - 75.0).abs() <= 3.0);
        radar.teardown();
        assert!(!radar.is_measuring());
        let metrics = radar.metrics().snapshot();
        assert_eq!((metrics.completed(), metrics.failed()), (1, 0));
    }

    #[test]
    fn start_returns_before_acquisition_finishes() {
        let source = SlowSource {
            inner: SyntheticSource::new(DopplerConverter::default(), 30.0),
            delay: Duration::from_millis(200),
        };
        let radar = coordinator(Box::new(source));
        radar.start_measurement();
        assert!(radar.is_measuring());
        radar.teardown();
        assert!(!radar.is_measuring());
    }

    #[test]
    fn debug_measurement_invokes_callback_inline() {
        let sink = MemorySink::new();
        let radar = RadarCoordinator::new(
            RadarConfig::default(),
            synthetic(10.0),
            LogManager::with_sink(sink.clone()),
        )
        .unwrap();
        radar.initialize();
        assert!(sink.contains("[INFO] Radar initialized on ADC channel 0"));

        let received = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&received);
        radar.set_measurement_callback(move |measurement| {
            if let Ok(mut slot) = slot.lock() {
                *slot = Some(*measurement);
            }
        });

        radar.start_debug_measurement();
        let measurement = received.lock().unwrap().expect("callback not invoked");
        assert!((measurement.speed_mph() - 85.0).abs() <= 3.0);
        assert!(sink.contains("Measurement processed"));
        assert!(!radar.is_measuring());
    }

    #[test]
    fn failed_acquisition_skips_callback_and_clears_flag() {
        let radar = coordinator(Box::new(BrokenSource));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        radar.set_measurement_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        radar.start_measurement();
        radar.teardown();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!radar.is_measuring());
    }

    #[test]
    fn panicking_pipeline_is_contained() {
        let sink = MemorySink::new();
        let radar = RadarCoordinator::new(
            RadarConfig::default(),
            Box::new(PanickingSource),
            LogManager::with_sink(sink.clone()),
        )
        .unwrap();
        radar.initialize();
        radar.start_measurement();
        radar.teardown();
        assert!(!radar.is_measuring());
        assert!(sink.contains("[ERROR] Radar measurement aborted: driver fault"));
        let metrics = radar.metrics().snapshot();
        assert_eq!(metrics.aborted, 1);
        assert_eq!(metrics.total(), 1);
    }

    #[test]
    fn source_panic_does_not_disable_later_measurements() {
        let source = FlakySource {
            inner: SyntheticSource::new(DopplerConverter::default(), 70.0).with_seed(9),
            faulted: false,
        };
        let radar = coordinator(Box::new(source));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        radar.set_measurement_callback(move |measurement| {
            assert!((measurement.speed_mph() - 70.0).abs() <= 3.0);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        radar.start_measurement();
        radar.estimator().activity().wait_idle();
        for _ in 0..3 {
            radar.start_measurement();
        }
        radar.teardown();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let metrics = radar.metrics().snapshot();
        assert_eq!(metrics.delivered, 3);
        assert_eq!(metrics.aborted, 1);
        assert_eq!(metrics.source_failed, 0);
    }

    #[test]
    fn panicking_callback_counts_one_failed_measurement() {
        let sink = MemorySink::new();
        let radar = RadarCoordinator::new(
            RadarConfig::default(),
            synthetic(50.0),
            LogManager::with_sink(sink.clone()),
        )
        .unwrap();
        radar.initialize();
        radar.set_measurement_callback(|_| panic!("display went away"));

        radar.start_measurement();
        radar.teardown();

        let metrics = radar.metrics().snapshot();
        assert_eq!(metrics.total(), 1);
        assert_eq!(metrics.aborted, 1);
        assert_eq!(metrics.last, Some(Outcome::Aborted));
        assert!(sink.contains("Radar measurement aborted: display went away"));
    }

    #[test]
    fn debug_measurement_contains_callback_panic() {
        let sink = MemorySink::new();
        let radar = RadarCoordinator::new(
            RadarConfig::default(),
            synthetic(10.0),
            LogManager::with_sink(sink.clone()),
        )
        .unwrap();
        radar.initialize();
        radar.set_measurement_callback(|_| panic!("display went away"));

        radar.start_debug_measurement();
        assert!(!radar.is_measuring());
        assert!(sink.contains("[ERROR] Debug radar measurement aborted: display went away"));
        assert_eq!(radar.metrics().snapshot().aborted, 1);

        radar.set_measurement_callback(|_| {});
        radar.start_debug_measurement();
        assert_eq!(radar.metrics().snapshot().last, Some(Outcome::Delivered));
    }

    #[test]
    fn teardown_waits_for_concurrent_measurements() {
        for _ in 0..3 {
            let source = SlowSource {
                inner: SyntheticSource::new(DopplerConverter::default(), 60.0),
                delay: Duration::from_millis(20),
            };
            let radar = coordinator(Box::new(source));
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            radar.set_measurement_callback(move |measurement| {
                assert!((measurement.speed_mph() - 60.0).abs() <= 3.0);
                counter.fetch_add(1, Ordering::SeqCst);
            });

            for _ in 0..4 {
                radar.start_measurement();
            }
            radar.teardown();
            assert_eq!(calls.load(Ordering::SeqCst), 4);
            assert!(!radar.estimator().is_initialized());
            assert_eq!(radar.metrics().snapshot().delivered, 4);
            assert_eq!(radar.metrics().snapshot().failed(), 0);
        }
    }

    #[test]
    fn measurement_after_teardown_delivers_zero() {
        let radar = coordinator(synthetic(40.0));
        radar.teardown();
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        radar.set_measurement_callback(move |measurement| {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(*measurement);
            }
        });
        radar.start_measurement();
        let measurement = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(measurement.is_zero());
    }

    #[test]
    fn repeated_init_teardown_cycles() {
        let radar = coordinator(synthetic(20.0));
        for _ in 0..5 {
            radar.teardown();
            radar.initialize();
            assert_eq!(radar.estimator().sample_count(), DEFAULT_SAMPLE_COUNT);
        }
        radar.teardown();
        radar.teardown();
    }
}
