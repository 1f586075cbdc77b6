//! Core of the DIY launch monitor: Doppler radar speed estimation and the
//! infrared beam-break trigger that starts each measurement.
//!
//! A trigger event starts a radar measurement; the radar coordinator acquires
//! a block of ADC samples off the caller's thread, estimates the dominant
//! Doppler shift and hands the resulting speed to a registered callback.

pub mod hardware;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;
pub mod trigger;

pub use prelude::{CoreError, CoreResult, Measurement, RadarConfig, TriggerConfig};
pub use processing::RadarCoordinator;
pub use trigger::{TriggerState, TriggerStateMachine};
