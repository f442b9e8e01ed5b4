use parking_lot::Mutex;
use reelfeed_core::{AnalyticsEvent, AnalyticsSink, TracingAnalyticsSink};
use std::collections::BTreeMap;

/// Counts events by name and forwards them to the tracing sink.
#[derive(Debug, Default)]
pub struct CountingSink {
    forward: TracingAnalyticsSink,
    counts: Mutex<BTreeMap<&'static str, usize>>,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        self.counts.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.counts.lock().get(name).copied().unwrap_or(0)
    }
}

impl AnalyticsSink for CountingSink {
    fn log(&self, event: &AnalyticsEvent) {
        *self.counts.lock().entry(event.name()).or_default() += 1;
        self.forward.log(event);
    }
}
