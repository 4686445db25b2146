// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! The normalized result of one refresh.

use crate::calculator;
use crate::catalog::Phase;
use chrono::{DateTime, TimeZone};
use qtty::Days;
use serde::{ser::SerializeStruct, Serialize, Serializer};

/// Phase, illumination, age and distance of the Moon at one instant.
///
/// Produced fresh by every data source on every refresh and never mutated
/// afterwards.  Local snapshots keep `distance_km` in the modelled
/// 363 400 to 405 400 km band.  Remote snapshots carry the API's distance
/// unclamped, which may fall outside that band.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MoonSnapshot {
    pub phase: Phase,
    /// Illuminated fraction of the disk, `0.0..=100.0`.
    pub illumination_percent: f64,
    /// Days since the last new moon, in `[0, SYNODIC_MONTH)`.
    pub age: Days,
    /// Earth–Moon distance in km; inside the model band for local snapshots only.
    pub distance_km: f64,
}

impl MoonSnapshot {
    /// Snapshot derived from a lunar age with the local model.
    pub fn from_age(age: Days) -> Self {
        let age = calculator::wrap_age(age);
        Self {
            phase: Phase::from_index_wrapping(calculator::phase_index(age) as i64),
            illumination_percent: calculator::illumination(age),
            age,
            distance_km: calculator::distance(age),
        }
    }

    /// Snapshot of the local model at `instant`.
    pub fn at<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self::from_age(calculator::lunar_age(instant))
    }

    #[inline]
    pub fn phase_index(&self) -> usize {
        self.phase.index()
    }

    #[inline]
    pub fn phase_name(&self) -> &'static str {
        self.phase.name()
    }
}

impl Default for MoonSnapshot {
    /// New moon at age zero.
    fn default() -> Self {
        Self::from_age(Days::new(0.0))
    }
}

impl Serialize for MoonSnapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("MoonSnapshot", 5)?;
        state.serialize_field("phase_index", &self.phase_index())?;
        state.serialize_field("phase_name", self.phase_name())?;
        state.serialize_field("illumination_percent", &self.illumination_percent)?;
        state.serialize_field("age_days", &self.age.value())?;
        state.serialize_field("distance_km", &self.distance_km)?;
        state.end()
    }
}
