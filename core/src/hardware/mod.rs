//! Capability seams over the radar ADC and the trigger GPIO line.

pub mod adc;
pub mod gpio;

pub use adc::{AdcReader, IioAdc};
pub use gpio::{CdevGpioLine, LineReader, SimulatedLine, SysfsGpioLine};
