// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Moon data sources.
//!
//! Every source answers the same question, *what does the Moon look like at
//! this instant?*, with a [`MoonSnapshot`] or [`DataUnavailable`]:
//!
//! | Source | Kind | Fails |
//! |--------|------|-------|
//! | [`LocalSource`] | [`SourceKind::Local`] | never |
//! | [`RemoteSource`] (Farmsense shape) | [`SourceKind::Farmsense`] | transport, HTTP status, parse, API error |
//! | [`RemoteSource`] (TimeAndDate shape) | [`SourceKind::TimeAndDate`] | transport, HTTP status, parse |
//!
//! Shape-specific parsing stays behind this boundary; callers only ever see
//! normalized snapshots.

mod local;
mod remote;

pub use local::LocalSource;
pub use remote::{parse_response, ApiShape, RemoteSource, FARMSENSE_URL};

use crate::config::RefreshConfig;
use crate::error::{ConfigInvalid, DataUnavailable};
use crate::snapshot::MoonSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which implementation answers refreshes (`data-source` setting).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Local,
    Farmsense,
    TimeAndDate,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::Farmsense => "farmsense",
            SourceKind::TimeAndDate => "timeanddate",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ConfigInvalid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "calculator" => Ok(SourceKind::Local),
            "farmsense" => Ok(SourceKind::Farmsense),
            "timeanddate" | "time-and-date" => Ok(SourceKind::TimeAndDate),
            other => Err(ConfigInvalid::UnknownSource(other.to_owned())),
        }
    }
}

/// Anything that can produce a snapshot for an instant.
#[async_trait]
pub trait MoonDataSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Snapshot at `at`. Performs at most one outbound request and no retry.
    async fn fetch(&self, at: DateTime<Utc>) -> Result<MoonSnapshot, DataUnavailable>;

    /// Release any session held by the source. Later fetches may fail with
    /// [`DataUnavailable::Closed`].
    fn close(&self) {}
}

/// Build the source selected by `config`.
///
/// TimeAndDate without an `api-url`, or a remote source whose HTTP client
/// cannot be built, degrades to the local calculator.
pub fn from_config(config: &RefreshConfig) -> Arc<dyn MoonDataSource> {
    let shape = match config.source {
        SourceKind::Local => return Arc::new(LocalSource),
        SourceKind::Farmsense => ApiShape::Farmsense,
        SourceKind::TimeAndDate => ApiShape::TimeAndDate,
    };
    let base_url = match (shape, &config.api_url) {
        (_, Some(url)) => url.clone(),
        (ApiShape::Farmsense, None) => FARMSENSE_URL.to_owned(),
        (ApiShape::TimeAndDate, None) => {
            let err = ConfigInvalid::MissingApiUrl(SourceKind::TimeAndDate.as_str());
            debug!(error = %err, "using local calculator");
            return Arc::new(LocalSource);
        }
    };

    match RemoteSource::new(shape, base_url) {
        Ok(source) => Arc::new(source),
        Err(err) => {
            warn!(error = %err, "cannot build HTTP client, using local calculator");
            Arc::new(LocalSource)
        }
    }
}
