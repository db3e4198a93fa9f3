//! Metrics capture for tests.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Creates a debugging recorder and snapshotter for metrics testing.
#[must_use]
pub fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

/// One recorded metric series.
#[derive(Debug)]
pub struct Series {
    /// Metric name.
    pub name: String,
    /// Label pairs.
    pub labels: Vec<(String, String)>,
    /// Recorded value.
    pub value: DebugValue,
}

/// Take a snapshot of every series recorded so far.
#[must_use]
pub fn capture(snapshotter: &Snapshotter) -> Vec<Series> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, value)| Series {
            name: key.key().name().to_owned(),
            labels: key
                .key()
                .labels()
                .map(|l| (l.key().to_owned(), l.value().to_owned()))
                .collect(),
            value,
        })
        .collect()
}

/// Sum of counter `name`, restricted to series carrying `label` if given.
#[must_use]
pub fn counter_value(series: &[Series], name: &str, label: Option<(&str, &str)>) -> u64 {
    series
        .iter()
        .filter(|s| s.name == name)
        .filter(|s| label.is_none_or(|(k, v)| s.labels.iter().any(|(lk, lv)| lk == k && lv == v)))
        .map(|s| match &s.value {
            DebugValue::Counter(n) => *n,
            _ => 0,
        })
        .sum()
}

/// Current value of gauge `name`, if it was ever touched.
#[must_use]
pub fn gauge_value(series: &[Series], name: &str) -> Option<f64> {
    series
        .iter()
        .find(|s| s.name == name)
        .and_then(|s| match &s.value {
            DebugValue::Gauge(g) => Some(g.into_inner()),
            _ => None,
        })
}
