// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Lunar phase calculator.
//!
//! Pure functions from an instant (or a lunar age) to the quantities shown by
//! the indicator.  The model is a mean-motion approximation:
//!
//! * **Age**: days since the last new moon, the Julian Date offset from the
//!   lunar epoch (the new moon of 2000-01-06) reduced modulo the mean
//!   synodic month.
//! * **Phase index**: the age split into eight equal bins, shifted by half a
//!   bin so that New Moon is centred on age 0.  Bins are half-open `[lo, hi)`.
//! * **Illumination**: `(1 − cos(2π·age/P)) / 2`, exactly 0 at new moon and
//!   100 % at half a cycle.
//! * **Distance**: a cosine around the mean Earth–Moon distance driven by the
//!   anomalistic month.  This is **not** an ephemeris: the perigee phase is tied
//!   to the lunar age rather than to the true orbit, so the value only has the
//!   right range and period (363 400 – 405 400 km over ≈27.55 days).
//!
//! Nothing here allocates, performs I/O, or fails: every function is total over
//! finite input.

use crate::julian::JulianDate;
use chrono::{DateTime, TimeZone};
use qtty::*;
use std::f64::consts::TAU;

/// Mean synodic month (new moon to new moon).
pub const SYNODIC_MONTH: Days = Days::new(29.530_588_67);

/// Mean anomalistic month (perigee to perigee).
pub const ANOMALISTIC_MONTH: Days = Days::new(27.554_55);

/// Mean Earth–Moon distance in kilometres.
pub const MEAN_DISTANCE_KM: f64 = 384_400.0;

/// Half the peak-to-peak variation of the modelled distance, in kilometres.
pub const DISTANCE_AMPLITUDE_KM: f64 = 21_000.0;

/// Width of one of the eight phase bins.
#[inline]
fn bin_width() -> f64 {
    SYNODIC_MONTH.value() / 8.0
}

/// Julian Date of `instant`.
#[inline]
pub fn julian_date<Tz: TimeZone>(instant: &DateTime<Tz>) -> JulianDate {
    JulianDate::from_datetime(instant)
}

/// Reduce a day count into `[0, SYNODIC_MONTH)`.
pub fn wrap_age(days: Days) -> Days {
    let period = SYNODIC_MONTH.value();
    let wrapped = days.value().rem_euclid(period);
    // rem_euclid may round up to the divisor for tiny negative inputs
    if wrapped >= period {
        Days::new(0.0)
    } else {
        Days::new(wrapped)
    }
}

/// Lunar age at a Julian Date.
#[inline]
pub fn lunar_age_at(jd: JulianDate) -> Days {
    wrap_age(jd.days_since_lunar_epoch())
}

/// Lunar age at `instant`, always in `[0, SYNODIC_MONTH)`.
#[inline]
pub fn lunar_age<Tz: TimeZone>(instant: &DateTime<Tz>) -> Days {
    lunar_age_at(julian_date(instant))
}

/// Phase bin (`0..=7`) for a lunar age.
///
/// Bin `k` covers ages `[(2k − 1)·P/16, (2k + 1)·P/16)` modulo `P`, so New Moon
/// spans the last sixteenth of one cycle and the first sixteenth of the next.
pub fn phase_index(age: Days) -> usize {
    let width = bin_width();
    let shifted = (age.value() + width / 2.0).rem_euclid(SYNODIC_MONTH.value());
    ((shifted / width).floor() as usize) % 8
}

/// Illuminated fraction of the disk, in percent.
pub fn illumination(age: Days) -> f64 {
    let cycle = age.value() / SYNODIC_MONTH.value();
    (1.0 - (TAU * cycle).cos()) / 2.0 * 100.0
}

/// Modelled Earth–Moon distance in kilometres.
pub fn distance(age: Days) -> f64 {
    let cycle = (age.value() / ANOMALISTIC_MONTH.value()).rem_euclid(1.0);
    MEAN_DISTANCE_KM - DISTANCE_AMPLITUDE_KM * (TAU * cycle).cos()
}
