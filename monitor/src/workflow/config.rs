use anyhow::Context;
use launchcore::prelude::{RadarConfig, TriggerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub radar: RadarConfig,
    pub trigger: TriggerConfig,
    /// Replace the ADC with a synthetic return at `radar.debug_speed_mph`.
    pub synthetic: bool,
    /// Inject a simulated trigger at this interval.
    pub simulate_every_ms: Option<u64>,
}

impl MonitorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading monitor config {}", path_ref.display()))?;
        let config: MonitorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing monitor config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        sample_count: usize,
        sample_rate_hz: u32,
        gpio_pin: u32,
        synthetic: bool,
        simulate_every_ms: Option<u64>,
    ) -> Self {
        Self {
            radar: RadarConfig {
                sample_count,
                sample_rate_hz,
                ..RadarConfig::default()
            },
            trigger: TriggerConfig {
                gpio_pin,
                ..TriggerConfig::default()
            },
            synthetic,
            simulate_every_ms,
        }
    }

    pub fn simulate_interval(&self) -> Option<Duration> {
        self.simulate_every_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}
