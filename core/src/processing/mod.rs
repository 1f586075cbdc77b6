pub mod activity;
pub mod coordinator;
pub mod doppler;
pub mod source;
pub mod spectral;

pub use activity::{InFlight, InFlightGuard};
pub use coordinator::{MeasurementCallback, RadarCoordinator};
pub use doppler::DopplerConverter;
pub use source::{AdcSource, SignalSource, SyntheticSource, UnavailableSource};
pub use spectral::{Peak, SpectralEstimator, SpectralReport};
