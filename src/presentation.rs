// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Snapshot → display strings.
//!
//! [`present`] turns a [`MoonSnapshot`] into the immutable [`DisplayFields`]
//! handed to the UI.  The UI side is a [`DisplaySink`]: it receives fields and
//! notices and owns every widget.

use crate::catalog::{icon_for, next_of};
use crate::config::Hemisphere;
use crate::snapshot::MoonSnapshot;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Symbolic icon shown when a phase asset is missing.
pub const FALLBACK_ICON: &str = "weather-clear-night-symbolic";

/// Everything the indicator displays for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayFields {
    /// e.g. `"Waxing Gibbous"`
    pub phase_label: String,
    /// e.g. `"73%"`
    pub illumination_label: String,
    pub next_phase_label: String,
    /// e.g. `"384,400 km"`
    pub distance_label: String,
    /// e.g. `"10.42 Days"`
    pub age_label: String,
    pub icon_key: &'static str,
}

/// Display fields as seen from the northern hemisphere.
pub fn present(snapshot: &MoonSnapshot) -> DisplayFields {
    present_for(snapshot, Hemisphere::Northern)
}

/// Display fields for an observer in `hemisphere`.
///
/// Only the icon depends on the hemisphere; labels always name the phase.
pub fn present_for(snapshot: &MoonSnapshot, hemisphere: Hemisphere) -> DisplayFields {
    let phase = snapshot.phase;
    let drawn = match hemisphere {
        Hemisphere::Northern => phase,
        Hemisphere::Southern => phase.mirrored(),
    };

    DisplayFields {
        phase_label: phase.name().to_owned(),
        illumination_label: format!("{}%", snapshot.illumination_percent.round() as i64),
        next_phase_label: next_of(phase.name()).to_owned(),
        distance_label: format!("{} km", group_thousands(snapshot.distance_km.round() as i64)),
        age_label: format!("{:.2} Days", snapshot.age.value()),
        icon_key: icon_for(drawn.name()),
    }
}

/// `1234567` → `"1,234,567"`.
fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Receiver of display updates, implemented by the UI adapter.
pub trait DisplaySink: Send + Sync {
    /// New fields to show.
    fn publish(&self, fields: &DisplayFields);

    /// A non-blocking warning; the currently shown fields stay as they are.
    fn notice(&self, message: &str);
}

/// How the UI should draw an icon key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconRef {
    /// An SVG asset on disk.
    Asset(PathBuf),
    /// A themed symbolic icon name.
    Symbolic(&'static str),
}

/// `<dir>/<key>.svg` if it exists, else [`FALLBACK_ICON`].
pub fn resolve_icon(dir: &Path, key: &str) -> IconRef {
    let path = dir.join(format!("{key}.svg"));
    if path.is_file() {
        IconRef::Asset(path)
    } else {
        tracing::warn!(path = %path.display(), "icon not found");
        IconRef::Symbolic(FALLBACK_ICON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Phase;
    use qtty::Days;

    fn snapshot(phase: Phase, illumination: f64, age: f64, distance: f64) -> MoonSnapshot {
        MoonSnapshot {
            phase,
            illumination_percent: illumination,
            age: Days::new(age),
            distance_km: distance,
        }
    }

    #[test]
    fn formats_all_labels() {
        let fields = present(&snapshot(Phase::WaxingGibbous, 72.6, 10.4166, 384_400.4));
        assert_eq!(
            fields,
            DisplayFields {
                phase_label: "Waxing Gibbous".into(),
                illumination_label: "73%".into(),
                next_phase_label: "Full Moon".into(),
                distance_label: "384,400 km".into(),
                age_label: "10.42 Days".into(),
                icon_key: "luna_gibosa_creciente",
            }
        );
    }

    #[test]
    fn next_phase_wraps_after_waning_crescent() {
        let fields = present(&snapshot(Phase::WaningCrescent, 3.0, 28.0, 370_000.0));
        assert_eq!(fields.next_phase_label, "New Moon");
    }

    #[test]
    fn labels_agree_with_name_lookups() {
        for phase in crate::catalog::PHASES {
            let fields = present(&snapshot(phase, 50.0, 10.0, 384_400.0));
            assert_eq!(fields.next_phase_label, next_of(phase.name()));
            assert_eq!(fields.icon_key, icon_for(phase.name()));

            let southern = present_for(&snapshot(phase, 50.0, 10.0, 384_400.0), Hemisphere::Southern);
            assert_eq!(southern.icon_key, icon_for(phase.mirrored().name()));
        }
    }

    #[test]
    fn default_snapshot_is_presentable() {
        let fields = present(&MoonSnapshot::default());
        assert_eq!(fields.phase_label, "New Moon");
        assert_eq!(fields.illumination_label, "0%");
        assert_eq!(fields.distance_label, "363,400 km");
        assert_eq!(fields.age_label, "0.00 Days");
        assert_eq!(fields.icon_key, "luna_nueva");
    }

    #[test]
    fn southern_hemisphere_mirrors_icon_only() {
        let s = snapshot(Phase::WaxingCrescent, 20.0, 4.0, 380_000.0);
        let fields = present_for(&s, Hemisphere::Southern);
        assert_eq!(fields.phase_label, "Waxing Crescent");
        assert_eq!(fields.icon_key, Phase::WaningCrescent.icon_key());
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(405_400), "405,400");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(-12_345), "-12,345");
    }

    #[test]
    fn missing_icon_falls_back_to_symbolic() {
        let dir = std::env::temp_dir().join("luna-icon-test-missing");
        assert_eq!(
            resolve_icon(&dir, "luna_llena"),
            IconRef::Symbolic(FALLBACK_ICON)
        );
    }

    #[test]
    fn existing_icon_resolves_to_asset() {
        let dir = std::env::temp_dir().join(format!("luna-icons-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("luna_llena.svg");
        std::fs::write(&path, "<svg/>").unwrap();
        assert_eq!(resolve_icon(&dir, "luna_llena"), IconRef::Asset(path));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
