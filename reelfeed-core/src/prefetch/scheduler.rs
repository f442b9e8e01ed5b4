use futures::future::join_all;
use reelfeed_config::PrefetchConfig;
use reelfeed_model::SourceLocator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::probe::{NetworkProbe, ProbeError};

/// Summary of a batch of probes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchOutcome {
    pub warmed: usize,
    pub failed: usize,
}

/// Best-effort warming of upcoming video sources.
///
/// Every fault is swallowed and reduced to `false`; nothing is retried.
#[derive(Debug, Clone)]
pub struct PrefetchScheduler {
    probe: Arc<dyn NetworkProbe>,
    concurrency: usize,
    range: String,
}

impl PrefetchScheduler {
    pub fn new(probe: Arc<dyn NetworkProbe>, config: &PrefetchConfig) -> Self {
        Self {
            probe,
            concurrency: config.concurrency.max(1),
            range: config.range_header(),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probe one locator within `timeout`. Never fails.
    pub async fn prefetch(
        &self,
        locator: &SourceLocator,
        timeout: Duration,
    ) -> bool {
        let result =
            tokio::time::timeout(timeout, self.probe.probe(locator, &self.range))
                .await
                .unwrap_or(Err(ProbeError::Timeout));

        match result {
            Ok(response) if response.is_valid() => {
                trace!(locator = %locator, status = response.status, "prefetched");
                true
            }
            Ok(response) => {
                warn!(
                    locator = %locator,
                    status = response.status,
                    "prefetch rejected"
                );
                false
            }
            Err(err) if err.is_timeout() => {
                debug!(locator = %locator, ?timeout, "prefetch timed out");
                false
            }
            Err(err) => {
                warn!(locator = %locator, error = %err, "prefetch failed");
                false
            }
        }
    }

    /// Probe `locators` in fixed-size groups. Each group runs fully in
    /// parallel and must settle before the next one starts.
    pub async fn prefetch_many(
        &self,
        locators: &[SourceLocator],
        timeout: Duration,
    ) -> PrefetchOutcome {
        let mut outcome = PrefetchOutcome::default();
        for group in locators.chunks(self.concurrency) {
            let results = join_all(
                group.iter().map(|locator| self.prefetch(locator, timeout)),
            )
            .await;
            for warmed in results {
                if warmed {
                    outcome.warmed += 1;
                } else {
                    outcome.failed += 1;
                }
            }
        }
        debug!(
            warmed = outcome.warmed,
            failed = outcome.failed,
            "prefetch batch settled"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ProbeScript, ScriptedProbe};
    use tokio::time::Instant;

    fn locators(n: usize) -> Vec<SourceLocator> {
        (0..n)
            .map(|i| {
                SourceLocator::parse(&format!("https://cdn.example.com/{i}.mp4"))
                    .unwrap()
            })
            .collect()
    }

    fn scheduler(probe: Arc<ScriptedProbe>) -> PrefetchScheduler {
        PrefetchScheduler::new(probe, &PrefetchConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn batches_of_three_settle_in_sequence() {
        let probe = Arc::new(ScriptedProbe::ok(Duration::from_millis(100)));
        let scheduler = scheduler(probe.clone());
        let start = Instant::now();

        let outcome = scheduler
            .prefetch_many(&locators(7), Duration::from_secs(5))
            .await;

        assert_eq!(outcome, PrefetchOutcome { warmed: 7, failed: 0 });
        assert_eq!(probe.max_in_flight(), 3);
        // Three sequential groups (3, 3, 1) of 100ms each.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(400));
        assert!(
            probe
                .calls()
                .iter()
                .all(|(_, range)| range == "bytes=0-1023")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failures_reduce_to_false() {
        let probe = Arc::new(ScriptedProbe::ok(Duration::from_millis(10)));
        let targets = locators(3);
        probe.script(&targets[0], ProbeScript::Fail("reset".into()));
        probe.script(&targets[1], ProbeScript::Status(404));
        let scheduler = scheduler(probe);

        assert!(!scheduler.prefetch(&targets[0], Duration::from_secs(1)).await);
        assert!(!scheduler.prefetch(&targets[1], Duration::from_secs(1)).await);
        assert!(scheduler.prefetch(&targets[2], Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_aborts_probe() {
        let probe = Arc::new(ScriptedProbe::new(
            Duration::from_millis(10),
            ProbeScript::Hang,
        ));
        let scheduler = scheduler(probe.clone());
        let start = Instant::now();

        let outcome = scheduler
            .prefetch_many(&locators(4), Duration::from_millis(500))
            .await;

        assert_eq!(outcome, PrefetchOutcome { warmed: 0, failed: 4 });
        assert!(start.elapsed() >= Duration::from_millis(1_000));
        assert_eq!(probe.max_in_flight(), 3);
    }
}
