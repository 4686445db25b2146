// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Periodic refresh scheduling.
//!
//! [`RefreshScheduler`] is a two-state machine:
//!
//! ```text
//!            start(interval)                 set_interval(new)
//!  Stopped ──────────────────▶ Running ◀──────────────────────┐
//!     ▲   (immediate refresh,     │  (cancel old timer, arm new)│
//!     │    timer armed)           └─────────────────────────────┘
//!     └──────────── stop() ───────┘
//! ```
//!
//! While running it owns exactly one [`ScheduleHandle`], a Tokio task that
//! calls [`Refresh::refresh`] every interval.  The first timer tick comes one
//! full interval after arming; [`RefreshScheduler::refresh_now`] calls the
//! target out of band and leaves the timer phase untouched.
//!
//! The scheduler never awaits a fetch itself.  Whether a tick actually
//! issues a request (or is dropped because one is outstanding) is decided by
//! the [`Refresh`] target and reported back as a [`TickOutcome`].

use crate::config::clamp_interval;
use crate::lock;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// What caused a refresh.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// The immediate refresh on `start`.
    Startup,
    Timer,
    /// A user-requested "refresh now".
    Manual,
}

/// Result of asking for a refresh.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A fetch was started.
    Issued,
    /// A fetch was already outstanding; this request was dropped.
    Skipped,
    /// The owner is stopped or torn down.
    Stopped,
}

/// The work a scheduler drives.  Must return without awaiting the fetch.
pub trait Refresh: Send + Sync + 'static {
    fn refresh(&self, trigger: Trigger) -> TickOutcome;
}

/// The one active timer of a running scheduler.  Dropping it cancels it.
#[derive(Debug)]
pub struct ScheduleHandle {
    period: Duration,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    /// Spawn a timer that refreshes `target` every `period`, first after one
    /// full period.  Must be called from within a Tokio runtime.
    fn arm(target: Arc<dyn Refresh>, period: Duration) -> Self {
        let first = Instant::now() + period;
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let outcome = target.refresh(Trigger::Timer);
                debug!(?outcome, "timer tick");
            }
        });
        Self { period, task }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Drives a [`Refresh`] target on a configurable interval.
pub struct RefreshScheduler {
    target: Arc<dyn Refresh>,
    timer: Mutex<Option<ScheduleHandle>>,
}

impl RefreshScheduler {
    pub fn new(target: Arc<dyn Refresh>) -> Self {
        Self {
            target,
            timer: Mutex::new(None),
        }
    }

    /// Stopped → Running: refresh immediately, then every `interval`
    /// (clamped to 900–86 400 s).  Returns `false` if already running.
    pub fn start(&self, interval: Duration) -> bool {
        let interval = clamp_interval(interval);
        {
            let mut timer = lock(&self.timer);
            if timer.is_some() {
                debug!("scheduler already running");
                return false;
            }
            *timer = Some(ScheduleHandle::arm(self.target.clone(), interval));
        }
        info!(interval_secs = interval.as_secs(), "refresh scheduler started");
        self.target.refresh(Trigger::Startup);
        true
    }

    /// Running → Running: replace the timer with one at `interval`.
    ///
    /// The old timer is cancelled before the new one exists, so no tick is
    /// doubled; the new timer first fires one full `interval` from now.
    /// Returns `false` (and leaves the timer alone) when stopped or when the
    /// effective interval is unchanged.
    pub fn set_interval(&self, interval: Duration) -> bool {
        let interval = clamp_interval(interval);
        let mut timer = lock(&self.timer);
        match timer.as_ref() {
            None => false,
            Some(handle) if handle.period() == interval => false,
            Some(_) => {
                // dropping the old handle aborts its task
                drop(timer.take());
                *timer = Some(ScheduleHandle::arm(self.target.clone(), interval));
                info!(interval_secs = interval.as_secs(), "refresh timer re-armed");
                true
            }
        }
    }

    /// One out-of-band refresh; the timer keeps its phase.
    pub fn refresh_now(&self) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::Stopped;
        }
        self.target.refresh(Trigger::Manual)
    }

    /// Running → Stopped.  Idempotent; returns whether a timer was cancelled.
    pub fn stop(&self) -> bool {
        let stopped = lock(&self.timer).take().is_some();
        if stopped {
            info!("refresh scheduler stopped");
        }
        stopped
    }

    pub fn is_running(&self) -> bool {
        lock(&self.timer).is_some()
    }

    /// Period of the active timer, if running.
    pub fn interval(&self) -> Option<Duration> {
        lock(&self.timer).as_ref().map(ScheduleHandle::period)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        triggers: Mutex<Vec<Trigger>>,
    }

    impl Recorder {
        fn count(&self) -> usize {
            lock(&self.triggers).len()
        }

        fn last(&self) -> Option<Trigger> {
            lock(&self.triggers).last().copied()
        }
    }

    impl Refresh for Recorder {
        fn refresh(&self, trigger: Trigger) -> TickOutcome {
            lock(&self.triggers).push(trigger);
            TickOutcome::Issued
        }
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance_secs(secs: u64) {
        time::advance(Duration::from_secs(secs)).await;
        settle().await;
    }

    fn scheduler() -> (Arc<Recorder>, RefreshScheduler) {
        let recorder = Arc::new(Recorder::default());
        let scheduler = RefreshScheduler::new(recorder.clone());
        (recorder, scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn start_refreshes_immediately_then_every_interval() {
        let (recorder, scheduler) = scheduler();
        assert!(scheduler.start(Duration::from_secs(900)));
        assert_eq!(recorder.count(), 1);
        assert_eq!(recorder.last(), Some(Trigger::Startup));

        settle().await;
        advance_secs(899).await;
        assert_eq!(recorder.count(), 1);
        advance_secs(1).await;
        assert_eq!(recorder.count(), 2);
        assert_eq!(recorder.last(), Some(Trigger::Timer));
        advance_secs(900).await;
        assert_eq!(recorder.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_keeps_single_timer() {
        let (recorder, scheduler) = scheduler();
        assert!(scheduler.start(Duration::from_secs(900)));
        assert!(!scheduler.start(Duration::from_secs(900)));
        assert_eq!(recorder.count(), 1);

        advance_secs(900).await;
        assert_eq!(recorder.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_is_clamped() {
        let (_, scheduler) = scheduler();
        scheduler.start(Duration::from_secs(10));
        assert_eq!(scheduler.interval(), Some(Duration::from_secs(900)));
        scheduler.set_interval(Duration::from_secs(100_000));
        assert_eq!(scheduler.interval(), Some(Duration::from_secs(86_400)));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_replaces_timer_once() {
        let (recorder, scheduler) = scheduler();
        scheduler.start(Duration::from_secs(900));
        settle().await;

        advance_secs(300).await;
        assert!(scheduler.set_interval(Duration::from_secs(1800)));
        assert!(!scheduler.set_interval(Duration::from_secs(1800)));
        settle().await;

        // old timer would have fired at t=900
        advance_secs(600).await;
        assert_eq!(recorder.count(), 1);

        // new timer fires at t=300+1800
        advance_secs(1199).await;
        assert_eq!(recorder.count(), 1);
        advance_secs(1).await;
        assert_eq!(recorder.count(), 2);
        advance_secs(1800).await;
        assert_eq!(recorder.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_refresh_keeps_timer_phase() {
        let (recorder, scheduler) = scheduler();
        scheduler.start(Duration::from_secs(900));
        settle().await;

        advance_secs(400).await;
        assert_eq!(scheduler.refresh_now(), TickOutcome::Issued);
        assert_eq!(recorder.last(), Some(Trigger::Manual));
        assert_eq!(recorder.count(), 2);

        advance_secs(500).await;
        assert_eq!(recorder.count(), 3);
        assert_eq!(recorder.last(), Some(Trigger::Timer));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_silences_timer() {
        let (recorder, scheduler) = scheduler();
        assert!(!scheduler.stop());

        scheduler.start(Duration::from_secs(900));
        settle().await;
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.interval(), None);
        assert!(!scheduler.set_interval(Duration::from_secs(1800)));
        assert_eq!(scheduler.refresh_now(), TickOutcome::Stopped);

        advance_secs(5_000).await;
        assert_eq!(recorder.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop() {
        let (recorder, scheduler) = scheduler();
        scheduler.start(Duration::from_secs(900));
        scheduler.stop();
        assert!(scheduler.start(Duration::from_secs(1800)));
        assert_eq!(recorder.count(), 2);

        advance_secs(1800).await;
        assert_eq!(recorder.count(), 3);
    }
}
