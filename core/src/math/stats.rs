pub struct StatsHelper;

impl StatsHelper {
    /// Arithmetic mean of integer ADC readings.
    pub fn mean(samples: &[u16]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = samples.iter().map(|&v| f64::from(v)).sum();
        sum / samples.len() as f64
    }
}
