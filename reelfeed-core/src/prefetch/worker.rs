//! Background prefetch worker
//!
//! The orchestrator never awaits a probe. It pushes requests through a
//! [`PrefetchHandle`]; a spawned task drains whatever has queued up,
//! drops duplicate locators, and hands the batch to the scheduler.

use reelfeed_model::{SourceLocator, VideoId};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::scheduler::PrefetchScheduler;

/// Ephemeral request to warm one upcoming video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchRequest {
    pub video_id: VideoId,
    pub locator: SourceLocator,
}

/// Sending half of the prefetch queue.
#[derive(Debug, Clone)]
pub struct PrefetchHandle {
    tx: mpsc::UnboundedSender<PrefetchRequest>,
}

impl PrefetchHandle {
    /// Handle paired with its raw receiver, for callers that run their own
    /// drain loop.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PrefetchRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a request. Dropped silently once the worker has stopped.
    pub fn send(&self, request: PrefetchRequest) {
        if self.tx.send(request).is_err() {
            trace!("prefetch worker gone; request dropped");
        }
    }
}

/// Start the prefetch task.
pub fn start_prefetcher(
    scheduler: PrefetchScheduler,
    timeout: Duration,
) -> (PrefetchHandle, JoinHandle<()>) {
    let (handle, mut rx) = PrefetchHandle::channel();

    let join = tokio::spawn(async move {
        let mut batch = Vec::new();
        let mut seen = HashSet::new();
        while let Some(first) = rx.recv().await {
            batch.clear();
            seen.clear();
            seen.insert(first.locator.clone());
            batch.push(first.locator);
            while let Ok(next) = rx.try_recv() {
                if seen.insert(next.locator.clone()) {
                    batch.push(next.locator);
                }
            }

            let outcome = scheduler.prefetch_many(&batch, timeout).await;
            debug!(
                requested = batch.len(),
                warmed = outcome.warmed,
                "prefetch drain complete"
            );
        }
    });

    (handle, join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProbe;
    use reelfeed_config::PrefetchConfig;
    use std::sync::Arc;

    fn request(i: usize) -> PrefetchRequest {
        PrefetchRequest {
            video_id: VideoId::new(),
            locator: SourceLocator::parse(&format!(
                "https://cdn.example.com/{i}.mp4"
            ))
            .unwrap(),
        }
    }

    #[tokio::test]
    async fn worker_dedupes_queued_locators() {
        let probe = Arc::new(ScriptedProbe::ok(Duration::from_millis(1)));
        let scheduler =
            PrefetchScheduler::new(probe.clone(), &PrefetchConfig::default());
        let (handle, join) =
            start_prefetcher(scheduler, Duration::from_secs(1));

        let a = request(1);
        handle.send(a.clone());
        handle.send(a);
        handle.send(request(2));
        drop(handle);
        join.await.unwrap();

        // Everything was queued before the worker first ran, so the
        // duplicate falls into the same drain.
        assert_eq!(probe.calls().len(), 2);
    }
}
