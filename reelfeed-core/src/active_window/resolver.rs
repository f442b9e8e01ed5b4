use reelfeed_config::{ArbitrationPolicy, AxisConfig, ScrollEstimate};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, trace};

use super::viewability::{ViewableItem, normalize_viewability};
use crate::timer::CancelableTimer;

/// Which signal produced a committed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Viewability,
    ScrollEstimate,
    /// The list length changed underneath the active index.
    ItemCount,
    /// The configured initial index was adopted.
    Initial,
    Cleared,
}

/// A committed change of the active index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveIndexChange {
    pub previous: Option<usize>,
    pub current: Option<usize>,
    pub cause: ChangeCause,
}

/// Snapshot of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindowState {
    pub active: Option<usize>,
    /// Most recent non-null committed index.
    pub last_stable: Option<usize>,
    /// Scroll-derived candidate waiting out the debounce interval.
    pub pending: Option<usize>,
    pub pending_deadline: Option<Instant>,
    pub item_count: usize,
}

/// Resolves a single stable active index for one scroll axis.
///
/// Viewability reports are the primary signal and commit immediately.
/// Scroll offsets produce an estimate that must survive the debounce
/// interval before it commits; any superseding report cancels it. How the
/// two signals interact when they disagree is set by [`ArbitrationPolicy`].
#[derive(Debug)]
pub struct ActiveWindowResolver {
    axis: &'static str,
    config: AxisConfig,
    debounce: Duration,
    policy: ArbitrationPolicy,
    item_count: usize,
    active: Option<usize>,
    last_stable: Option<usize>,
    pending: Option<usize>,
    timer: CancelableTimer,
    last_viewability_at: Option<Instant>,
    adopted_initial: bool,
    notifier: watch::Sender<Option<usize>>,
}

impl ActiveWindowResolver {
    pub fn new(
        axis: &'static str,
        config: AxisConfig,
        debounce: Duration,
        policy: ArbitrationPolicy,
    ) -> Self {
        let (notifier, _) = watch::channel(None);
        Self {
            axis,
            config,
            debounce,
            policy,
            item_count: 0,
            active: None,
            last_stable: None,
            pending: None,
            timer: CancelableTimer::new(),
            last_viewability_at: None,
            adopted_initial: false,
            notifier,
        }
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    pub fn state(&self) -> ActiveWindowState {
        ActiveWindowState {
            active: self.active,
            last_stable: self.last_stable,
            pending: self.pending,
            pending_deadline: self.timer.deadline(),
            item_count: self.item_count,
        }
    }

    /// Receiver notified only when the committed index actually changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<usize>> {
        self.notifier.subscribe()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Apply a viewability report from the host list.
    ///
    /// Among items at or above the threshold the current active index is
    /// kept if it still qualifies, otherwise the lowest index wins. A report
    /// with no qualifying item leaves the active index untouched.
    pub fn report_viewability(
        &mut self,
        items: &[ViewableItem],
        now: Instant,
    ) -> Option<ActiveIndexChange> {
        let visible = normalize_viewability(items, self.item_count);

        let threshold = self.config.viewability_threshold;
        let mut qualifying = visible
            .iter()
            .filter(|item| item.fraction >= threshold)
            .map(|item| item.index)
            .peekable();

        let lowest = *qualifying.peek()?;
        // Only reports that name a candidate hold off the scroll estimate.
        self.last_viewability_at = Some(now);
        let candidate = match self.active {
            Some(active) if qualifying.any(|index| index == active) => active,
            _ => lowest,
        };

        if self.policy == ArbitrationPolicy::PreferScrollEstimate
            && self.timer.is_armed()
            && self.pending != Some(candidate)
        {
            trace!(
                axis = self.axis,
                candidate,
                pending = ?self.pending,
                "viewability deferred to pending scroll estimate"
            );
            return None;
        }

        self.cancel_pending();
        self.commit(Some(candidate), ChangeCause::Viewability)
    }

    /// Apply a raw scroll offset using the configured item stride.
    pub fn report_scroll_offset(
        &mut self,
        offset: f32,
        now: Instant,
    ) -> Option<ActiveIndexChange> {
        let extent = self.config.stride();
        self.report_scroll_offset_with_extent(offset, extent, now)
    }

    /// Apply a raw scroll offset with an explicit per-item extent.
    ///
    /// The estimate only commits after it has been stable for the debounce
    /// interval; an estimate matching the active index cancels any pending
    /// commit.
    pub fn report_scroll_offset_with_extent(
        &mut self,
        offset: f32,
        item_extent: f32,
        now: Instant,
    ) -> Option<ActiveIndexChange> {
        let estimate = self.estimate_index(offset, item_extent)?;

        if Some(estimate) == self.active {
            if self.cancel_pending() {
                trace!(axis = self.axis, estimate, "scroll estimate agrees");
            }
            return None;
        }

        if self.policy == ArbitrationPolicy::PreferViewability
            && self
                .last_viewability_at
                .is_some_and(|at| now.duration_since(at) < self.debounce)
        {
            trace!(
                axis = self.axis,
                estimate,
                "scroll estimate ignored while viewability is fresh"
            );
            return None;
        }

        if self.pending != Some(estimate) || !self.timer.is_armed() {
            self.pending = Some(estimate);
            self.timer.arm(now, self.debounce);
            trace!(axis = self.axis, estimate, "scroll candidate pending");
        }

        self.tick(now)
    }

    /// Map a scroll offset onto a clamped index, or `None` for an empty
    /// list or a non-finite offset.
    pub fn estimate_index(&self, offset: f32, item_extent: f32) -> Option<usize> {
        if self.item_count == 0 || !offset.is_finite() {
            return None;
        }
        let extent = if item_extent.is_finite() && item_extent > 0.0 {
            item_extent
        } else {
            self.config.stride()
        };

        let raw = match self.config.estimate {
            ScrollEstimate::Nearest => (offset / extent).round(),
            ScrollEstimate::Centered => {
                ((offset + self.config.viewport_extent / 2.0) / extent).floor()
            }
        };
        let max = (self.item_count - 1) as f32;
        Some(raw.clamp(0.0, max) as usize)
    }

    /// Commit a pending scroll candidate once its debounce has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<ActiveIndexChange> {
        if !self.timer.fire(now) {
            return None;
        }
        let candidate = self.pending.take()?;
        if candidate >= self.item_count {
            return None;
        }
        self.commit(Some(candidate), ChangeCause::ScrollEstimate)
    }

    /// Update the list length, clamping or clearing the active index.
    pub fn set_item_count(
        &mut self,
        item_count: usize,
    ) -> Option<ActiveIndexChange> {
        self.item_count = item_count;

        if item_count == 0 {
            self.cancel_pending();
            return self.commit(None, ChangeCause::ItemCount);
        }
        if self.pending.is_some_and(|p| p >= item_count) {
            self.cancel_pending();
        }

        match self.active {
            Some(active) if active >= item_count => {
                self.commit(Some(item_count - 1), ChangeCause::ItemCount)
            }
            None if !self.adopted_initial => {
                self.adopted_initial = true;
                let initial = self.config.initial_index?;
                self.commit(
                    Some(initial.min(item_count - 1)),
                    ChangeCause::Initial,
                )
            }
            _ => None,
        }
    }

    /// Reset to "no active item".
    pub fn clear(&mut self) -> Option<ActiveIndexChange> {
        self.cancel_pending();
        self.commit(None, ChangeCause::Cleared)
    }

    fn cancel_pending(&mut self) -> bool {
        self.pending = None;
        self.timer.cancel()
    }

    fn commit(
        &mut self,
        next: Option<usize>,
        cause: ChangeCause,
    ) -> Option<ActiveIndexChange> {
        if next.is_some() {
            self.adopted_initial = true;
        }
        if self.active == next {
            return None;
        }
        let previous = std::mem::replace(&mut self.active, next);
        if next.is_some() {
            self.last_stable = next;
        }
        self.notifier.send_replace(next);

        debug!(
            axis = self.axis,
            previous = ?previous,
            current = ?next,
            cause = ?cause,
            "active index committed"
        );
        Some(ActiveIndexChange {
            previous,
            current: next,
            cause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(175);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn resolver(policy: ArbitrationPolicy, count: usize) -> ActiveWindowResolver {
        let mut r = ActiveWindowResolver::new(
            "outer",
            AxisConfig::outer_defaults(),
            DEBOUNCE,
            policy,
        );
        r.set_item_count(count);
        r
    }

    fn report(
        r: &mut ActiveWindowResolver,
        items: &[(usize, f32)],
        now: Instant,
    ) -> Option<ActiveIndexChange> {
        let items: Vec<_> = items
            .iter()
            .map(|&(i, f)| ViewableItem::new(i, f))
            .collect();
        r.report_viewability(&items, now)
    }

    #[test]
    fn picks_lowest_qualifying_index() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::PreferViewability, 10);
        let change = report(&mut r, &[(2, 0.3), (3, 0.9), (4, 0.95)], t0);
        assert_eq!(change.map(|c| c.current), Some(Some(3)));
    }

    #[test]
    fn keeps_active_while_it_qualifies() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::PreferViewability, 10);
        report(&mut r, &[(4, 1.0)], t0);
        assert!(report(&mut r, &[(3, 0.85), (4, 0.85)], t0 + ms(10)).is_none());
        assert_eq!(r.active(), Some(4));
    }

    #[test]
    fn no_qualifying_item_keeps_previous() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::PreferViewability, 10);
        report(&mut r, &[(1, 1.0)], t0);
        assert!(report(&mut r, &[(1, 0.4), (2, 0.5)], t0 + ms(5)).is_none());
        assert!(r.report_viewability(&[], t0 + ms(6)).is_none());
        assert_eq!(r.active(), Some(1));
    }

    #[test]
    fn hidden_items_never_take_over() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::PreferViewability, 10);
        report(&mut r, &[(1, 1.0)], t0);

        let hidden = [ViewableItem {
            index: 0,
            is_visible: false,
            visible_fraction: Some(0.95),
        }];
        assert!(r.report_viewability(&hidden, t0 + ms(20)).is_none());
        assert_eq!(r.active(), Some(1));
    }

    #[test]
    fn empty_reports_leave_scroll_estimate_usable() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::PreferViewability, 10);
        report(&mut r, &[(0, 1.0)], t0);
        // Fast flick: the host reports nothing above threshold.
        assert!(report(&mut r, &[(1, 0.4)], t0 + ms(200)).is_none());
        assert!(r.report_viewability(&[], t0 + ms(240)).is_none());

        r.report_scroll_offset(1280.0, t0 + ms(250));
        assert_eq!(r.state().pending, Some(2));
        assert_eq!(r.tick(t0 + ms(425)).unwrap().current, Some(2));
    }

    #[test]
    fn scroll_estimate_commits_after_debounce() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::PreferViewability, 10);
        // Centered: floor((1280 + 422) / 640) == 2
        assert!(r.report_scroll_offset(1280.0, t0).is_none());
        assert_eq!(r.state().pending, Some(2));
        assert!(r.tick(t0 + ms(174)).is_none());

        let change = r.tick(t0 + DEBOUNCE).unwrap();
        assert_eq!(change.current, Some(2));
        assert_eq!(change.cause, ChangeCause::ScrollEstimate);
        assert_eq!(r.next_deadline(), None);
    }

    #[test]
    fn changing_estimate_restarts_debounce() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::LatestWins, 10);
        r.report_scroll_offset(640.0, t0);
        r.report_scroll_offset(1280.0, t0 + ms(100));
        assert!(r.tick(t0 + ms(200)).is_none());
        assert_eq!(r.tick(t0 + ms(275)).unwrap().current, Some(2));
    }

    #[test]
    fn repeated_estimate_keeps_deadline() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::LatestWins, 10);
        r.report_scroll_offset(640.0, t0);
        r.report_scroll_offset(650.0, t0 + ms(100));
        assert_eq!(r.next_deadline(), Some(t0 + DEBOUNCE));
    }

    #[test]
    fn viewability_cancels_pending_scroll_commit() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::LatestWins, 10);
        r.report_scroll_offset(1280.0, t0);
        report(&mut r, &[(5, 1.0)], t0 + ms(50));
        assert!(r.tick(t0 + ms(500)).is_none());
        assert_eq!(r.active(), Some(5));
    }

    #[test]
    fn fresh_viewability_suppresses_scroll_estimates() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::PreferViewability, 10);
        report(&mut r, &[(0, 1.0)], t0);
        r.report_scroll_offset(1280.0, t0 + ms(50));
        assert_eq!(r.state().pending, None);

        r.report_scroll_offset(1280.0, t0 + ms(200));
        assert_eq!(r.state().pending, Some(2));
        assert_eq!(r.tick(t0 + ms(375)).unwrap().current, Some(2));
    }

    #[test]
    fn prefer_scroll_estimate_defers_viewability() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::PreferScrollEstimate, 10);
        r.report_scroll_offset(1280.0, t0);
        assert!(report(&mut r, &[(5, 1.0)], t0 + ms(50)).is_none());
        assert_eq!(r.tick(t0 + DEBOUNCE).unwrap().current, Some(2));

        // Nothing pending: viewability commits straight away.
        assert_eq!(
            report(&mut r, &[(5, 1.0)], t0 + ms(400)).unwrap().current,
            Some(5)
        );
    }

    #[test]
    fn estimate_matching_active_cancels_pending() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::LatestWins, 10);
        report(&mut r, &[(0, 1.0)], t0);
        r.report_scroll_offset(1280.0, t0 + ms(10));
        r.report_scroll_offset(0.0, t0 + ms(20));
        assert_eq!(r.next_deadline(), None);
        assert!(r.tick(t0 + ms(500)).is_none());
    }

    #[test]
    fn nearest_estimate_is_clamped() {
        let mut r = ActiveWindowResolver::new(
            "inner",
            AxisConfig::inner_defaults(),
            DEBOUNCE,
            ArbitrationPolicy::LatestWins,
        );
        assert_eq!(r.estimate_index(100.0, 390.0), None);
        r.set_item_count(3);
        assert_eq!(r.estimate_index(200.0, 390.0), Some(1));
        assert_eq!(r.estimate_index(-50.0, 390.0), Some(0));
        assert_eq!(r.estimate_index(99_999.0, 390.0), Some(2));
    }

    #[test]
    fn item_count_adopts_initial_and_clamps() {
        let mut r = ActiveWindowResolver::new(
            "inner",
            AxisConfig::inner_defaults(),
            DEBOUNCE,
            ArbitrationPolicy::PreferViewability,
        );
        assert_eq!(r.active(), None);
        let change = r.set_item_count(4).unwrap();
        assert_eq!(change.cause, ChangeCause::Initial);
        assert_eq!(r.active(), Some(0));

        report(&mut r, &[(3, 1.0)], Instant::now());
        assert_eq!(r.set_item_count(2).unwrap().current, Some(1));
        assert_eq!(r.set_item_count(0).unwrap().current, None);
        assert_eq!(r.state().last_stable, Some(1));
        // Initial index is only adopted the first time.
        assert!(r.set_item_count(3).is_none());
    }

    #[test]
    fn subscribers_see_only_genuine_changes() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::PreferViewability, 10);
        let mut rx = r.subscribe();

        report(&mut r, &[(2, 1.0)], t0);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(2));

        report(&mut r, &[(2, 1.0)], t0 + ms(1));
        assert!(!rx.has_changed().unwrap());

        r.clear();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), None);
    }

    #[test]
    fn alternating_estimates_never_commit_within_debounce() {
        let t0 = Instant::now();
        let mut r = resolver(ArbitrationPolicy::LatestWins, 10);
        report(&mut r, &[(1, 1.0)], t0);

        let mut committed = Vec::new();
        for step in 0..40u64 {
            let now = t0 + ms(50 * step);
            let offset = if step % 2 == 0 { 1280.0 } else { 1920.0 };
            committed.extend(r.report_scroll_offset(offset, now));
            committed.extend(r.tick(now));
        }
        assert!(committed.is_empty());
        assert_eq!(r.active(), Some(1));
    }
}
