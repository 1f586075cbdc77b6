use launchcore::Measurement;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One recorded shot, relative to the start of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotRecord {
    pub number: usize,
    pub elapsed_s: f64,
    pub speed_mph: f64,
    pub speed_mps: f64,
    pub signal_strength: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub shots: usize,
    pub mean_mph: f64,
    pub max_mph: f64,
    pub records: Vec<ShotRecord>,
}

/// Append-only, in-memory history of the shots measured this session.
pub struct ShotHistory {
    started: Instant,
    shots: Vec<ShotRecord>,
}

impl ShotHistory {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            shots: Vec::new(),
        }
    }

    pub fn record(&mut self, measurement: &Measurement) -> &ShotRecord {
        let record = ShotRecord {
            number: self.shots.len() + 1,
            elapsed_s: measurement
                .timestamp()
                .saturating_duration_since(self.started)
                .as_secs_f64(),
            speed_mph: measurement.speed_mph(),
            speed_mps: measurement.speed_mps(),
            signal_strength: measurement.signal_strength(),
        };
        self.shots.push(record);
        &self.shots[self.shots.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    pub fn summary(&self) -> SessionSummary {
        if self.shots.is_empty() {
            return SessionSummary::default();
        }
        let total: f64 = self.shots.iter().map(|shot| shot.speed_mph).sum();
        let max_mph = self
            .shots
            .iter()
            .map(|shot| shot.speed_mph)
            .fold(f64::MIN, f64::max);
        SessionSummary {
            shots: self.shots.len(),
            mean_mph: total / self.shots.len() as f64,
            max_mph,
            records: self.shots.clone(),
        }
    }
}

impl Default for ShotHistory {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_shot(record: &ShotRecord) -> String {
    format!(
        "Shot #{}: {:.1} mph ({:.1} m/s), strength {:.1}",
        record.number, record.speed_mph, record.speed_mps, record.signal_strength
    )
}

pub fn render_summary(summary: &SessionSummary) -> String {
    if summary.shots == 0 {
        return "Session summary: no shots recorded".to_string();
    }
    let mut lines = vec![format!(
        "Session summary: {} shots, mean {:.1} mph, max {:.1} mph",
        summary.shots, summary.mean_mph, summary.max_mph
    )];
    lines.extend(summary.records.iter().map(render_shot));
    lines.join("\n")
}
