// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! The moon indicator: settings → scheduler → data source → presenter → sink.
//!
//! Refresh policy:
//!
//! * At most one fetch is outstanding, counting its completion callback.  A
//!   tick (timer or manual) that arrives before the previous callback has
//!   finished is dropped, not queued.
//! * A successful fetch replaces the displayed fields and is published.
//! * A failed fetch keeps the displayed fields, logs one warning and sends one
//!   notice to the sink.  The next scheduled tick is the retry.
//! * After [`MoonIndicator::shutdown`] the timer is cancelled and the source
//!   closed.  A fetch still in flight is allowed to finish but its result is
//!   discarded.
//! * Only `update-interval` is watched; the other settings are read once at
//!   start-up.

use crate::config::{Hemisphere, RefreshConfig, SettingsStore, UPDATE_INTERVAL_KEY};
use crate::lock;
use crate::presentation::{present_for, DisplayFields, DisplaySink};
use crate::scheduler::{Refresh, RefreshScheduler, TickOutcome, Trigger};
use crate::source::{self, MoonDataSource};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// State shared between the indicator and its in-flight fetches.
struct CycleState {
    alive: AtomicBool,
    in_flight: AtomicBool,
    current: Mutex<Option<DisplayFields>>,
}

/// Claim on the single fetch slot.  Released on drop, so a callback that
/// panics still frees the slot.
struct InFlight(Arc<CycleState>);

impl InFlight {
    /// `None` when another fetch holds the slot.
    fn claim(state: &Arc<CycleState>) -> Option<Self> {
        state
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(state.clone()))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

/// One fetch-and-publish per accepted tick.
struct RefreshCycle {
    source: Arc<dyn MoonDataSource>,
    sink: Arc<dyn DisplaySink>,
    hemisphere: Hemisphere,
    state: Arc<CycleState>,
}

impl Refresh for RefreshCycle {
    fn refresh(&self, trigger: Trigger) -> TickOutcome {
        if !self.state.alive.load(Ordering::Acquire) {
            return TickOutcome::Stopped;
        }
        let Some(slot) = InFlight::claim(&self.state) else {
            debug!(?trigger, "fetch outstanding, dropping tick");
            return TickOutcome::Skipped;
        };

        let source = self.source.clone();
        let sink = self.sink.clone();
        let state = self.state.clone();
        let hemisphere = self.hemisphere;

        tokio::spawn(async move {
            // held until the callback below has published or noticed
            let _slot = slot;
            let result = source.fetch(Utc::now()).await;

            if !state.alive.load(Ordering::Acquire) {
                debug!("indicator torn down, discarding fetch result");
                return;
            }

            match result {
                Ok(snapshot) => {
                    let fields = present_for(&snapshot, hemisphere);
                    debug!(?trigger, phase = %snapshot.phase, "moon data refreshed");
                    *lock(&state.current) = Some(fields.clone());
                    sink.publish(&fields);
                }
                Err(err) => {
                    warn!(?trigger, source = %source.kind(), error = %err, "moon data unavailable");
                    sink.notice(&format!("Moon phase data unavailable: {err}"));
                }
            }
        });

        TickOutcome::Issued
    }
}

/// A running moon-phase indicator.
///
/// Must be started from within a Tokio runtime.  Dropping it shuts it down.
pub struct MoonIndicator {
    config: RefreshConfig,
    source: Arc<dyn MoonDataSource>,
    state: Arc<CycleState>,
    scheduler: Arc<RefreshScheduler>,
    watcher: Option<JoinHandle<()>>,
}

impl MoonIndicator {
    /// Read settings, build the configured data source and start refreshing.
    pub fn start(settings: Arc<dyn SettingsStore>, sink: Arc<dyn DisplaySink>) -> Self {
        let config = RefreshConfig::from_store(settings.as_ref());
        let source = source::from_config(&config);
        Self::with_source(settings, sink, config, source)
    }

    /// Start with an explicit configuration and data source.
    pub fn with_source(
        settings: Arc<dyn SettingsStore>,
        sink: Arc<dyn DisplaySink>,
        config: RefreshConfig,
        source: Arc<dyn MoonDataSource>,
    ) -> Self {
        let state = Arc::new(CycleState {
            alive: AtomicBool::new(true),
            in_flight: AtomicBool::new(false),
            current: Mutex::new(None),
        });
        let cycle = RefreshCycle {
            source: source.clone(),
            sink,
            hemisphere: config.hemisphere,
            state: state.clone(),
        };
        let scheduler = Arc::new(RefreshScheduler::new(Arc::new(cycle)));

        let mut changes = settings.subscribe(UPDATE_INTERVAL_KEY);
        let watcher = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                while changes.changed().await {
                    let interval = RefreshConfig::interval_from(settings.get(UPDATE_INTERVAL_KEY).as_ref());
                    debug!(interval_secs = interval.as_secs(), "update interval changed");
                    scheduler.set_interval(interval);
                }
            })
        };

        info!(source = %config.source, hemisphere = %config.hemisphere, "starting moon indicator");
        scheduler.start(config.interval);

        Self {
            config,
            source,
            state,
            scheduler,
            watcher: Some(watcher),
        }
    }

    /// Fetch now, outside the timer schedule.
    pub fn refresh_now(&self) -> TickOutcome {
        self.scheduler.refresh_now()
    }

    /// The fields currently displayed, if any fetch has succeeded yet.
    pub fn current(&self) -> Option<DisplayFields> {
        lock(&self.state.current).clone()
    }

    /// Settings read at start-up.
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Active refresh interval; `None` once shut down.
    pub fn interval(&self) -> Option<Duration> {
        self.scheduler.interval()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stop refreshing and release the data source.  Idempotent.
    pub fn shutdown(&mut self) {
        let Some(watcher) = self.watcher.take() else {
            return;
        };
        watcher.abort();
        self.state.alive.store(false, Ordering::Release);
        self.scheduler.stop();
        self.source.close();
        info!("moon indicator shut down");
    }
}

impl Drop for MoonIndicator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
