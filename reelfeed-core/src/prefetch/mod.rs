//! Concurrency-bounded prefetch of upcoming videos.

pub mod probe;
pub mod scheduler;
pub mod worker;

pub use probe::{HttpProbe, NetworkProbe, ProbeError, ProbeResponse};
pub use scheduler::{PrefetchOutcome, PrefetchScheduler};
pub use worker::{PrefetchHandle, PrefetchRequest, start_prefetcher};
