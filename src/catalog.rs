// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Phase catalog: the eight named lunar phases.
//!
//! | Index | Phase | Icon key | Farmsense name |
//! |-------|-------|----------|----------------|
//! | 0 | New Moon | `luna_nueva` | New Moon |
//! | 1 | Waxing Crescent | `luna_creciente` | Waxing Crescent |
//! | 2 | First Quarter | `luna_cuarto_creciente` | 1st Quarter |
//! | 3 | Waxing Gibbous | `luna_gibosa_creciente` | Waxing Gibbous |
//! | 4 | Full Moon | `luna_llena` | Full Moon |
//! | 5 | Waning Gibbous | `luna_gibosa_menguante` | Waning Gibbous |
//! | 6 | Last Quarter | `luna_cuarto_menguante` | 3rd Quarter |
//! | 7 | Waning Crescent | `luna_menguante` | Waning Crescent |
//!
//! Index lookups are strict ([`Phase::from_index`] fails outside `0..=7`);
//! name lookups used for display never fail and default to New Moon.

use crate::error::CatalogError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One of the eight canonical phases, ordered by phase index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

/// All phases in index order.
pub const PHASES: [Phase; Phase::COUNT] = [
    Phase::NewMoon,
    Phase::WaxingCrescent,
    Phase::FirstQuarter,
    Phase::WaxingGibbous,
    Phase::FullMoon,
    Phase::WaningGibbous,
    Phase::LastQuarter,
    Phase::WaningCrescent,
];

impl Phase {
    /// Number of phases in a synodic cycle.
    pub const COUNT: usize = 8;

    /// Phase at `index`; fails outside `0..=7`.
    pub fn from_index(index: usize) -> Result<Self, CatalogError> {
        PHASES
            .get(index)
            .copied()
            .ok_or(CatalogError::IndexOutOfRange(index))
    }

    /// Phase at `index` reduced modulo 8 (negative indices wrap backwards).
    pub fn from_index_wrapping(index: i64) -> Self {
        PHASES[index.rem_euclid(Self::COUNT as i64) as usize]
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Canonical English name.
    pub const fn name(self) -> &'static str {
        match self {
            Phase::NewMoon => "New Moon",
            Phase::WaxingCrescent => "Waxing Crescent",
            Phase::FirstQuarter => "First Quarter",
            Phase::WaxingGibbous => "Waxing Gibbous",
            Phase::FullMoon => "Full Moon",
            Phase::WaningGibbous => "Waning Gibbous",
            Phase::LastQuarter => "Last Quarter",
            Phase::WaningCrescent => "Waning Crescent",
        }
    }

    /// Icon asset key (file stem, without directory or extension).
    pub const fn icon_key(self) -> &'static str {
        match self {
            Phase::NewMoon => "luna_nueva",
            Phase::WaxingCrescent => "luna_creciente",
            Phase::FirstQuarter => "luna_cuarto_creciente",
            Phase::WaxingGibbous => "luna_gibosa_creciente",
            Phase::FullMoon => "luna_llena",
            Phase::WaningGibbous => "luna_gibosa_menguante",
            Phase::LastQuarter => "luna_cuarto_menguante",
            Phase::WaningCrescent => "luna_menguante",
        }
    }

    /// The phase that follows this one: `(index + 1) mod 8`.
    #[inline]
    pub fn next(self) -> Self {
        PHASES[(self.index() + 1) % Self::COUNT]
    }

    /// The phase as seen from the opposite hemisphere: `(8 - index) mod 8`.
    ///
    /// New and Full Moon map to themselves; waxing and waning swap.
    #[inline]
    pub fn mirrored(self) -> Self {
        PHASES[(Self::COUNT - self.index()) % Self::COUNT]
    }

    /// Lookup by canonical name (exact match).
    pub fn from_name(name: &str) -> Option<Self> {
        PHASES.iter().copied().find(|phase| phase.name() == name)
    }

    /// Lookup by the name a remote phase API reports.
    ///
    /// Accepts the canonical names plus the ordinal quarter spellings
    /// (`"1st Quarter"`, `"3rd Quarter"`); surrounding whitespace and case are
    /// ignored.
    pub fn from_api_name(name: &str) -> Option<Self> {
        let name = name.trim();
        match name.to_ascii_lowercase().as_str() {
            "1st quarter" => Some(Phase::FirstQuarter),
            "3rd quarter" => Some(Phase::LastQuarter),
            _ => PHASES
                .iter()
                .copied()
                .find(|phase| phase.name().eq_ignore_ascii_case(name)),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Phase {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::from_name(s).ok_or_else(|| CatalogError::UnknownName(s.to_owned()))
    }
}

impl Serialize for Phase {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

// ── Name-keyed lookups ────────────────────────────────────────────────────

/// Name of the phase at `index`; fails outside `0..=7`.
pub fn name_for(index: usize) -> Result<&'static str, CatalogError> {
    Phase::from_index(index).map(Phase::name)
}

/// Icon key for a phase name, defaulting to the New Moon icon.
pub fn icon_for(name: &str) -> &'static str {
    Phase::from_name(name)
        .unwrap_or(Phase::NewMoon)
        .icon_key()
}

/// Name of the phase after `name`.
///
/// An unrecognised name counts as index −1, so its successor is New Moon.
pub fn next_of(name: &str) -> &'static str {
    Phase::from_name(name)
        .map(Phase::next)
        .unwrap_or(Phase::NewMoon)
        .name()
}
