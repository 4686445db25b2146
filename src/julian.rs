// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Julian Date, the common time axis of the lunar calculation.
//!
//! [`JulianDate`] stores a single [`Days`] quantity counted from the start of
//! the Julian Period.  It is built from any `chrono::DateTime<Tz>` with the
//! calendar algorithm of *Jean Meeus, Astronomical Algorithms*, ch. 7:
//!
//! ```text
//! if month <= 2 { year -= 1; month += 12 }
//! A  = floor(year / 100)
//! B  = 2 - A + floor(A / 4)
//! JD = floor(365.25 (year + 4716)) + floor(30.6001 (month + 1)) + day + B - 1524.5
//! ```
//!
//! The instant is converted to UTC first, so two `DateTime`s describing the
//! same moment in different zones map to the same Julian Date.  No ΔT
//! correction is applied: the lunar model works on the civil (UT) axis.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use qtty::*;
use serde::{Serialize, Serializer};
use std::ops::{Add, Sub};

/// A point on the Julian Date axis.
///
/// `Copy` and layout-identical to [`Days`] (a single `f64`).
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct JulianDate {
    quantity: Days,
}

impl JulianDate {
    /// J2000.0 epoch: 2000-01-01T12:00:00 (JD 2 451 545.0).
    pub const J2000: Self = Self::new(2_451_545.0);

    /// Lunar epoch JD 2 451 550.1, the mean new moon near 2000-01-06T18:14 UTC.
    pub const LUNAR_EPOCH: Self = Self::new(2_451_550.1);

    /// Create from a raw scalar (days since the start of the Julian Period).
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self {
            quantity: Days::new(value),
        }
    }

    /// Create from a [`Days`] quantity.
    #[inline]
    pub const fn from_days(days: Days) -> Self {
        Self { quantity: days }
    }

    /// The underlying quantity in days.
    #[inline]
    pub const fn quantity(&self) -> Days {
        self.quantity
    }

    /// The underlying scalar value in days.
    #[inline]
    pub const fn value(&self) -> f64 {
        self.quantity.value()
    }

    /// Julian Date of `datetime` using the Meeus calendar algorithm.
    ///
    /// January and February are counted as months 13 and 14 of the previous
    /// year; the Gregorian leap-year correction `B` is always applied, so the
    /// result is only meaningful for Gregorian-calendar dates (after 1582).
    pub fn from_datetime<Tz: TimeZone>(datetime: &DateTime<Tz>) -> Self {
        let utc = datetime.with_timezone(&Utc);

        let mut year = f64::from(utc.year());
        let mut month = f64::from(utc.month());
        let day = f64::from(utc.day());

        let seconds = f64::from(utc.second()) + f64::from(utc.nanosecond()) / 1e9;
        let hours = f64::from(utc.hour()) + f64::from(utc.minute()) / 60.0 + seconds / 3600.0;
        let day_fraction = hours / 24.0;

        if month <= 2.0 {
            year -= 1.0;
            month += 12.0;
        }

        let a = (year / 100.0).floor();
        let b = 2.0 - a + (a / 4.0).floor();

        Self::new(
            (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + day
                + day_fraction
                + b
                - 1524.5,
        )
    }

    /// Days elapsed since the reference new moon; negative before it.
    #[inline]
    pub fn days_since_lunar_epoch(&self) -> Days {
        *self - Self::LUNAR_EPOCH
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for JulianDate {
    fn from(datetime: DateTime<Tz>) -> Self {
        Self::from_datetime(&datetime)
    }
}

impl std::fmt::Display for JulianDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Julian Day: {}", self.quantity)
    }
}

impl Serialize for JulianDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.value())
    }
}

impl Add<Days> for JulianDate {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Days) -> Self::Output {
        Self::from_days(self.quantity + rhs)
    }
}

impl Sub<Days> for JulianDate {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Days) -> Self::Output {
        Self::from_days(self.quantity - rhs)
    }
}

impl Sub for JulianDate {
    type Output = Days;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.quantity - rhs.quantity
    }
}

impl From<Days> for JulianDate {
    #[inline]
    fn from(days: Days) -> Self {
        Self::from_days(days)
    }
}

impl From<JulianDate> for Days {
    #[inline]
    fn from(jd: JulianDate) -> Self {
        jd.quantity
    }
}
