/// Carrier frequency of the HB100 X-band module in Hz.
pub const HB100_CARRIER_HZ: f64 = 10.525e9;
/// Propagation speed of the radar wave in m/s.
pub const SPEED_OF_LIGHT_MPS: f64 = 299_792_458.0;
/// Metres per second to miles per hour.
pub const MPS_TO_MPH: f64 = 2.23694;

pub fn mps_to_mph(speed_mps: f64) -> f64 {
    speed_mps * MPS_TO_MPH
}

pub fn mph_to_mps(speed_mph: f64) -> f64 {
    speed_mph / MPS_TO_MPH
}

/// Doppler law shared by measurement processing and signal synthesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DopplerConverter {
    pub carrier_hz: f64,
    pub propagation_mps: f64,
}

impl DopplerConverter {
    pub fn new(carrier_hz: f64) -> Self {
        Self {
            carrier_hz,
            propagation_mps: SPEED_OF_LIGHT_MPS,
        }
    }

    /// `v = c * f / (2 * f0)`
    pub fn frequency_to_speed(&self, frequency_hz: f64) -> f64 {
        (self.propagation_mps * frequency_hz) / (2.0 * self.carrier_hz)
    }

    /// `f = 2 * v * f0 / c`
    pub fn speed_to_frequency(&self, speed_mps: f64) -> f64 {
        (2.0 * speed_mps * self.carrier_hz) / self.propagation_mps
    }
}

impl Default for DopplerConverter {
    fn default() -> Self {
        Self::new(HB100_CARRIER_HZ)
    }
}
