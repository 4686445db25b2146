// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Settings and refresh configuration.
//!
//! The settings store is an external key–value service with per-key change
//! notifications; this crate only reads it.  Recognised keys:
//!
//! | Key | Type | Default |
//! |-----|------|---------|
//! | `update-interval` | integer seconds, clamped to 900–86 400 | 3600 |
//! | `data-source` | `local` \| `farmsense` \| `timeanddate` | `local` |
//! | `api-url` | base URL of the remote API | Farmsense endpoint |
//! | `hemisphere` | `northern` \| `southern` | `northern` |
//!
//! Malformed values are never fatal: they are logged at `debug` level and
//! replaced by the default.

use crate::error::ConfigInvalid;
use crate::lock;
use crate::source::SourceKind;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

pub const UPDATE_INTERVAL_KEY: &str = "update-interval";
pub const DATA_SOURCE_KEY: &str = "data-source";
pub const API_URL_KEY: &str = "api-url";
pub const HEMISPHERE_KEY: &str = "hemisphere";

/// Interval used when the setting is missing, non-integer or non-positive.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);
/// Shortest refresh interval (15 minutes).
pub const MIN_INTERVAL: Duration = Duration::from_secs(900);
/// Longest refresh interval (24 hours).
pub const MAX_INTERVAL: Duration = Duration::from_secs(86_400);

// ═══════════════════════════════════════════════════════════════════════════
// Setting values and stores
// ═══════════════════════════════════════════════════════════════════════════

/// A raw value as held by a settings store.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl SettingValue {
    /// Integer view; integral floats count as integers.
    pub fn as_int(&self, key: &str) -> Result<i64, ConfigInvalid> {
        match *self {
            SettingValue::Int(v) => Ok(v),
            SettingValue::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
            _ => Err(ConfigInvalid::NotAnInteger { key: key.to_owned() }),
        }
    }

    pub fn as_str(&self, key: &str) -> Result<&str, ConfigInvalid> {
        match self {
            SettingValue::Str(v) => Ok(v),
            _ => Err(ConfigInvalid::NotAString { key: key.to_owned() }),
        }
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        SettingValue::Int(i64::from(v))
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Float(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Str(v.to_owned())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Str(v)
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

/// Change notifications for one key.
pub struct KeyChanges {
    key: String,
    receiver: broadcast::Receiver<String>,
}

impl KeyChanges {
    /// Wrap a receiver of changed key names, keeping only `key`.
    pub fn new(key: impl Into<String>, receiver: broadcast::Receiver<String>) -> Self {
        Self {
            key: key.into(),
            receiver,
        }
    }

    /// Wait for the next change of the key; `false` once the store is gone.
    ///
    /// Lagging behind the channel counts as a change, since the missed
    /// notifications may have included this key.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.receiver.recv().await {
                Ok(key) if key == self.key => return true,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => return true,
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    }
}

/// Read-only view of the external settings store.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<SettingValue>;

    fn subscribe(&self, key: &str) -> KeyChanges;
}

/// Thread-safe in-memory settings store.
pub struct MemorySettings {
    values: Mutex<HashMap<String, SettingValue>>,
    changes: broadcast::Sender<String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            values: Mutex::new(HashMap::new()),
            changes,
        }
    }

    /// Builder-style insert, without notification.
    pub fn with(self, key: &str, value: impl Into<SettingValue>) -> Self {
        lock(&self.values).insert(key.to_owned(), value.into());
        self
    }

    /// Load a flat TOML table.  Nested tables, arrays and datetimes are skipped.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigInvalid> {
        let table: toml::Table = source
            .parse()
            .map_err(|e: toml::de::Error| ConfigInvalid::Toml(e.to_string()))?;

        let mut settings = Self::new();
        for (key, value) in table {
            let value = match value {
                toml::Value::Integer(v) => SettingValue::Int(v),
                toml::Value::Float(v) => SettingValue::Float(v),
                toml::Value::String(v) => SettingValue::Str(v),
                toml::Value::Boolean(v) => SettingValue::Bool(v),
                other => {
                    debug!(%key, kind = other.type_str(), "ignoring non-scalar setting");
                    continue;
                }
            };
            settings = settings.with(&key, value);
        }
        Ok(settings)
    }

    /// Store `value` under `key` and notify subscribers of that key.
    pub fn set(&self, key: &str, value: impl Into<SettingValue>) {
        lock(&self.values).insert(key.to_owned(), value.into());
        // no subscribers is fine
        let _ = self.changes.send(key.to_owned());
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<SettingValue> {
        lock(&self.values).get(key).cloned()
    }

    fn subscribe(&self, key: &str) -> KeyChanges {
        KeyChanges::new(key, self.changes.subscribe())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Refresh configuration
// ═══════════════════════════════════════════════════════════════════════════

/// Where the observer stands; decides which way the drawn crescent faces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Hemisphere {
    #[default]
    Northern,
    Southern,
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Hemisphere::Northern => "northern",
            Hemisphere::Southern => "southern",
        })
    }
}

impl FromStr for Hemisphere {
    type Err = ConfigInvalid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "northern" | "north" => Ok(Hemisphere::Northern),
            "southern" | "south" => Ok(Hemisphere::Southern),
            other => Err(ConfigInvalid::UnknownHemisphere(other.to_owned())),
        }
    }
}

/// Validate a raw `update-interval` value, in seconds.
pub fn parse_interval(value: Option<&SettingValue>) -> Result<u64, ConfigInvalid> {
    let Some(value) = value else {
        return Ok(DEFAULT_INTERVAL.as_secs());
    };
    let seconds = value.as_int(UPDATE_INTERVAL_KEY)?;
    if seconds <= 0 {
        return Err(ConfigInvalid::NotPositive {
            key: UPDATE_INTERVAL_KEY.to_owned(),
            value: seconds,
        });
    }
    Ok(seconds as u64)
}

/// Clamp an interval into `[MIN_INTERVAL, MAX_INTERVAL]`.
#[inline]
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_INTERVAL, MAX_INTERVAL)
}

/// Settings snapshot taken at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshConfig {
    /// Effective refresh interval, already defaulted and clamped.
    pub interval: Duration,
    pub source: SourceKind,
    pub api_url: Option<String>,
    pub hemisphere: Hemisphere,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            source: SourceKind::Local,
            api_url: None,
            hemisphere: Hemisphere::Northern,
        }
    }
}

impl RefreshConfig {
    /// Effective interval for a raw setting: invalid values fall back to the
    /// default first, then the result is clamped.
    pub fn interval_from(value: Option<&SettingValue>) -> Duration {
        let seconds = parse_interval(value).unwrap_or_else(|err| {
            debug!(error = %err, "using default update interval");
            DEFAULT_INTERVAL.as_secs()
        });
        clamp_interval(Duration::from_secs(seconds))
    }

    /// Read every recognised key from `store`.
    pub fn from_store(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();

        let source = parse_or_default(store, DATA_SOURCE_KEY, defaults.source);
        let hemisphere = parse_or_default(store, HEMISPHERE_KEY, defaults.hemisphere);
        let api_url = store.get(API_URL_KEY).and_then(|value| {
            value
                .as_str(API_URL_KEY)
                .map(|url| url.trim().to_owned())
                .map_err(|err| debug!(error = %err, "ignoring api-url"))
                .ok()
                .filter(|url| !url.is_empty())
        });

        Self {
            interval: Self::interval_from(store.get(UPDATE_INTERVAL_KEY).as_ref()),
            source,
            api_url,
            hemisphere,
        }
    }
}

fn parse_or_default<T>(store: &dyn SettingsStore, key: &str, default: T) -> T
where
    T: FromStr<Err = ConfigInvalid> + fmt::Display,
{
    let Some(value) = store.get(key) else {
        return default;
    };
    value
        .as_str(key)
        .and_then(str::parse)
        .unwrap_or_else(|err| {
            debug!(error = %err, %default, "using default for {key}");
            default
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(value: impl Into<SettingValue>) -> Duration {
        RefreshConfig::interval_from(Some(&value.into()))
    }

    #[test]
    fn interval_defaults_then_clamps() {
        assert_eq!(RefreshConfig::interval_from(None), DEFAULT_INTERVAL);
        assert_eq!(interval(0), Duration::from_secs(3600));
        assert_eq!(interval(-5), Duration::from_secs(3600));
        assert_eq!(interval(100_000), Duration::from_secs(86_400));
        assert_eq!(interval(60), Duration::from_secs(900));
        assert_eq!(interval(1800), Duration::from_secs(1800));
        assert_eq!(interval(1800.0), Duration::from_secs(1800));
        assert_eq!(interval(1800.5), Duration::from_secs(3600));
        assert_eq!(interval("1800"), Duration::from_secs(3600));
    }

    #[test]
    fn parse_interval_reports_why() {
        assert_eq!(
            parse_interval(Some(&SettingValue::Int(0))),
            Err(ConfigInvalid::NotPositive {
                key: UPDATE_INTERVAL_KEY.into(),
                value: 0
            })
        );
        assert!(matches!(
            parse_interval(Some(&SettingValue::Bool(true))),
            Err(ConfigInvalid::NotAnInteger { .. })
        ));
    }

    #[test]
    fn from_store_reads_all_keys() {
        let store = MemorySettings::new()
            .with(UPDATE_INTERVAL_KEY, 7200)
            .with(DATA_SOURCE_KEY, "farmsense")
            .with(API_URL_KEY, " https://moon.example/ ")
            .with(HEMISPHERE_KEY, "Southern");
        let config = RefreshConfig::from_store(&store);
        assert_eq!(config.interval, Duration::from_secs(7200));
        assert_eq!(config.source, SourceKind::Farmsense);
        assert_eq!(config.api_url.as_deref(), Some("https://moon.example/"));
        assert_eq!(config.hemisphere, Hemisphere::Southern);
    }

    #[test]
    fn from_store_falls_back_silently() {
        let store = MemorySettings::new()
            .with(UPDATE_INTERVAL_KEY, "hourly")
            .with(DATA_SOURCE_KEY, "oracle")
            .with(API_URL_KEY, 3)
            .with(HEMISPHERE_KEY, "equatorial");
        assert_eq!(RefreshConfig::from_store(&store), RefreshConfig::default());
        assert_eq!(
            RefreshConfig::from_store(&MemorySettings::new()),
            RefreshConfig::default()
        );
    }

    #[test]
    fn toml_settings_are_loaded() {
        let store = MemorySettings::from_toml_str(
            r#"
            update-interval = 100000
            data-source = "timeanddate"
            api-url = "https://moon.example/api"
            hemisphere = "southern"
            [extra]
            ignored = true
            "#,
        )
        .unwrap();
        let config = RefreshConfig::from_store(&store);
        assert_eq!(config.interval, MAX_INTERVAL);
        assert_eq!(config.source, SourceKind::TimeAndDate);
        assert_eq!(config.hemisphere, Hemisphere::Southern);
        assert!(store.get("extra").is_none());

        assert!(matches!(
            MemorySettings::from_toml_str("update-interval = "),
            Err(ConfigInvalid::Toml(_))
        ));
    }

    #[tokio::test]
    async fn set_notifies_only_matching_subscribers() {
        let store = MemorySettings::new();
        let mut interval_changes = store.subscribe(UPDATE_INTERVAL_KEY);

        store.set(HEMISPHERE_KEY, "southern");
        store.set(UPDATE_INTERVAL_KEY, 1800);

        assert!(interval_changes.changed().await);
        assert_eq!(store.get(UPDATE_INTERVAL_KEY), Some(SettingValue::Int(1800)));
        assert_eq!(store.get(HEMISPHERE_KEY), Some(SettingValue::from("southern")));

        drop(store);
        assert!(!interval_changes.changed().await);
    }
}
