use std::sync::Arc;
use std::time::Duration;

use reelfeed_core::{ManualClock, WatchCache};
use reelfeed_model::VideoId;

fn cache(capacity: usize) -> (WatchCache, ManualClock) {
    let clock = ManualClock::new();
    let cache = WatchCache::with_clock(capacity, 0.9, Arc::new(clock.clone()));
    (cache, clock)
}

#[test]
fn inserting_past_capacity_evicts_oldest() {
    let (cache, clock) = cache(100);
    let ids: Vec<VideoId> = (0..101).map(|_| VideoId::new()).collect();

    for id in &ids[..100] {
        cache.mark_watched(*id, 1.0, 10.0);
        clock.advance(Duration::from_secs(1));
    }
    assert_eq!(cache.len(), 100);

    cache.mark_watched(ids[100], 1.0, 10.0);
    assert_eq!(cache.len(), 100);
    assert!(!cache.has_been_watched(&ids[0]));
    assert!(ids[1..].iter().all(|id| cache.has_been_watched(id)));
}

#[test]
fn rewatching_refreshes_recency() {
    let (cache, clock) = cache(3);
    let ids: Vec<VideoId> = (0..4).map(|_| VideoId::new()).collect();

    for id in &ids[..3] {
        cache.mark_watched(*id, 1.0, 10.0);
        clock.advance(Duration::from_secs(1));
    }
    cache.mark_watched(ids[0], 4.0, 10.0);
    clock.advance(Duration::from_secs(1));
    cache.mark_watched(ids[3], 1.0, 10.0);

    assert!(cache.has_been_watched(&ids[0]));
    assert!(!cache.has_been_watched(&ids[1]));
    assert_eq!(cache.entry(&ids[0]).unwrap().watch_count, 2);
    assert_eq!(cache.last_position(&ids[0]), 4.0);
}

#[test]
fn same_instant_inserts_evict_in_insertion_order() {
    let (cache, _clock) = cache(2);
    let ids: Vec<VideoId> = (0..3).map(|_| VideoId::new()).collect();
    for id in &ids {
        cache.mark_watched(*id, 1.0, 10.0);
    }

    assert_eq!(cache.len(), 2);
    assert!(!cache.has_been_watched(&ids[0]));
    assert!(cache.has_been_watched(&ids[1]));
    assert!(cache.has_been_watched(&ids[2]));
}

#[test]
fn stats_track_history() {
    let (cache, _clock) = cache(10);
    let a = VideoId::new();
    let b = VideoId::new();
    cache.mark_watched(a, 2.0, 10.0);
    cache.mark_watched(a, 9.5, 10.0);
    cache.mark_watched(b, 1.0, 10.0);

    let stats = cache.stats();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.fully_watched, 1);
    assert_eq!(stats.total_watch_count, 3);
}
