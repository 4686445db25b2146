// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Moon phase engine.
//!
//! This crate computes the phase, illumination, age and Earth–Moon distance of
//! the Moon for an instant and keeps a display up to date on a timer.
//!
//! # Core types
//!
//! - [`JulianDate`]: Meeus Julian Date of any `chrono::DateTime`.
//! - [`calculator`]: lunar age, phase bin, illumination and distance.
//! - [`Phase`]: the eight named phases with their icon keys.
//! - [`MoonSnapshot`]: one normalized result.
//! - [`MoonDataSource`]: local calculator or remote phase API.
//! - [`RefreshScheduler`]: start / re-arm / stop state machine around one timer.
//! - [`DisplayFields`] / [`present`]: snapshot → display strings.
//! - [`MoonIndicator`]: everything above wired to a settings store and a sink.
//!
//! # Data flow
//!
//! ```text
//! timer tick / refresh now
//!   → MoonDataSource::fetch(now) → MoonSnapshot
//!   → present_for(snapshot, hemisphere) → DisplayFields
//!   → DisplaySink::publish
//! ```
//!
//! A failed fetch never blanks the display: the previous fields stay and the
//! sink gets a notice instead.
//!
//! # Quick example
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use luna::{present, MoonSnapshot, Phase};
//!
//! let t = Utc.with_ymd_and_hms(2000, 1, 21, 18, 14, 0).unwrap();
//! let snapshot = MoonSnapshot::at(&t);
//! assert_eq!(snapshot.phase, Phase::FullMoon);
//!
//! let fields = present(&snapshot);
//! assert_eq!(fields.next_phase_label, "Waning Gibbous");
//! ```

pub mod calculator;
pub mod catalog;
pub mod config;
pub mod error;
mod indicator;
mod julian;
pub mod presentation;
pub mod scheduler;
mod snapshot;
pub mod source;

// ── Re-exports ────────────────────────────────────────────────────────────

pub use catalog::{Phase, PHASES};
pub use config::{Hemisphere, MemorySettings, RefreshConfig, SettingValue, SettingsStore};
pub use error::{CatalogError, ConfigInvalid, DataUnavailable, Error, Result};
pub use indicator::MoonIndicator;
pub use julian::JulianDate;
pub use presentation::{present, present_for, DisplayFields, DisplaySink};
pub use scheduler::{RefreshScheduler, TickOutcome, Trigger};
pub use snapshot::MoonSnapshot;
pub use source::{LocalSource, MoonDataSource, RemoteSource, SourceKind};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
