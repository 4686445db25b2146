// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Remote phase APIs.
//!
//! Two response shapes are understood, each either wrapped in a one-element
//! array or bare:
//!
//! ```text
//! Farmsense    GET <base>?d=<unix seconds>
//!              [{"Error": 0, "Phase": "1st Quarter", "Illumination": 0.52, "Age": 7.2, "Distance": 380000.5}]
//! TimeAndDate  GET <base>?iso=<YYYY-MM-DD>
//!              [{"phase": 2, "illum": 52.0, "age": 7.2, "dist": 380000.5}]
//! ```
//!
//! Farmsense illumination is a fraction and is scaled to percent.  Farmsense
//! names the quarters "1st Quarter" / "3rd Quarter"; a name that matches
//! nothing is replaced by the phase the reported age falls in.

use super::{MoonDataSource, SourceKind};
use crate::calculator;
use crate::catalog::Phase;
use crate::error::DataUnavailable;
use crate::snapshot::MoonSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qtty::Days;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Default Farmsense endpoint.
pub const FARMSENSE_URL: &str = "https://api.farmsense.net/v1/moonphases/";

const USER_AGENT: &str = "Luna - Moon Phase Indicator";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Request/response dialect of a remote phase API.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ApiShape {
    Farmsense,
    TimeAndDate,
}

impl ApiShape {
    /// Query parameter identifying `at` for this API.
    pub fn query(self, at: DateTime<Utc>) -> (&'static str, String) {
        match self {
            ApiShape::Farmsense => ("d", at.timestamp().to_string()),
            ApiShape::TimeAndDate => ("iso", at.format("%Y-%m-%d").to_string()),
        }
    }

    fn kind(self) -> SourceKind {
        match self {
            ApiShape::Farmsense => SourceKind::Farmsense,
            ApiShape::TimeAndDate => SourceKind::TimeAndDate,
        }
    }
}

/// HTTP-backed source. Owns one client session for its whole life.
pub struct RemoteSource {
    client: Client,
    base_url: String,
    shape: ApiShape,
    closed: AtomicBool,
}

impl RemoteSource {
    pub fn new(shape: ApiShape, base_url: impl Into<String>) -> Result<Self, DataUnavailable> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            shape,
            closed: AtomicBool::new(false),
        })
    }

    /// Source for the public Farmsense endpoint.
    pub fn farmsense() -> Result<Self, DataUnavailable> {
        Self::new(ApiShape::Farmsense, FARMSENSE_URL)
    }

    pub fn shape(&self) -> ApiShape {
        self.shape
    }

    /// Full request URL for `at`.
    pub fn request_url(&self, at: DateTime<Utc>) -> String {
        let (key, value) = self.shape.query(at);
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{key}={value}", self.base_url)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl MoonDataSource for RemoteSource {
    fn kind(&self) -> SourceKind {
        self.shape.kind()
    }

    async fn fetch(&self, at: DateTime<Utc>) -> Result<MoonSnapshot, DataUnavailable> {
        if self.is_closed() {
            return Err(DataUnavailable::Closed);
        }

        let url = self.request_url(at);
        debug!(%url, "requesting moon data");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataUnavailable::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_response(self.shape, &body)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Wire format
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().next(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FarmsenseRecord {
    #[serde(default)]
    error: i64,
    #[serde(default)]
    error_msg: Option<String>,
    phase: Option<String>,
    illumination: Option<f64>,
    age: Option<f64>,
    distance: Option<f64>,
}

#[derive(Deserialize)]
struct TimeAndDateRecord {
    phase: i64,
    illum: f64,
    age: f64,
    dist: f64,
}

fn first_record<T: DeserializeOwned>(body: &str) -> Result<T, DataUnavailable> {
    serde_json::from_str::<OneOrMany<T>>(body)?
        .into_first()
        .ok_or(DataUnavailable::EmptyResponse)
}

/// Parse a response body of the given shape into a normalized snapshot.
pub fn parse_response(shape: ApiShape, body: &str) -> Result<MoonSnapshot, DataUnavailable> {
    match shape {
        ApiShape::Farmsense => first_record::<FarmsenseRecord>(body)?.normalize(),
        ApiShape::TimeAndDate => Ok(first_record::<TimeAndDateRecord>(body)?.normalize()),
    }
}

impl FarmsenseRecord {
    fn normalize(self) -> Result<MoonSnapshot, DataUnavailable> {
        if self.error != 0 {
            return Err(DataUnavailable::Api {
                code: self.error,
                message: self.error_msg.unwrap_or_default(),
            });
        }

        let name = self.phase.ok_or(DataUnavailable::MissingField("Phase"))?;
        let illumination = self
            .illumination
            .ok_or(DataUnavailable::MissingField("Illumination"))?;
        let age = self.age.ok_or(DataUnavailable::MissingField("Age"))?;
        let distance = self.distance.ok_or(DataUnavailable::MissingField("Distance"))?;

        let age = calculator::wrap_age(Days::new(age));
        let phase = Phase::from_api_name(&name).unwrap_or_else(|| {
            let derived = Phase::from_index_wrapping(calculator::phase_index(age) as i64);
            debug!(api_name = %name, %derived, "unrecognised phase name, using age");
            derived
        });

        Ok(MoonSnapshot {
            phase,
            illumination_percent: (illumination * 100.0).clamp(0.0, 100.0),
            age,
            distance_km: distance,
        })
    }
}

impl TimeAndDateRecord {
    fn normalize(self) -> MoonSnapshot {
        MoonSnapshot {
            phase: Phase::from_index_wrapping(self.phase),
            illumination_percent: self.illum.clamp(0.0, 100.0),
            age: calculator::wrap_age(Days::new(self.age)),
            distance_km: self.dist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, 6, 18, 14, 0).unwrap()
    }

    #[test]
    fn farmsense_array_response() {
        let body = r#"[{"Error":0,"ErrorMsg":"success","TargetDate":"1700000000",
            "Moon":["Beaver Moon"],"Index":7,"Age":7.2,"Phase":"1st Quarter",
            "Distance":380000.5,"Illumination":0.52,"AngularDiameter":0.52}]"#;
        let snapshot = parse_response(ApiShape::Farmsense, body).unwrap();
        assert_eq!(snapshot.phase, Phase::FirstQuarter);
        assert!((snapshot.illumination_percent - 52.0).abs() < 1e-9);
        assert!((snapshot.age.value() - 7.2).abs() < 1e-9);
        assert_eq!(snapshot.distance_km, 380_000.5);
    }

    #[test]
    fn farmsense_third_quarter_maps_to_last_quarter() {
        let body = r#"{"Error":0,"Phase":"3rd Quarter","Illumination":0.5,"Age":22.1,"Distance":390000}"#;
        let snapshot = parse_response(ApiShape::Farmsense, body).unwrap();
        assert_eq!(snapshot.phase, Phase::LastQuarter);
    }

    #[test]
    fn farmsense_error_code_is_unavailable() {
        let body = r#"[{"Error":1,"ErrorMsg":"Invalid date"}]"#;
        match parse_response(ApiShape::Farmsense, body) {
            Err(DataUnavailable::Api { code, message }) => {
                assert_eq!(code, 1);
                assert_eq!(message, "Invalid date");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn farmsense_unknown_name_uses_age() {
        let body = r#"[{"Error":0,"Phase":"Pink Moon","Illumination":0.99,"Age":14.8,"Distance":400000}]"#;
        let snapshot = parse_response(ApiShape::Farmsense, body).unwrap();
        assert_eq!(snapshot.phase, Phase::FullMoon);
    }

    #[test]
    fn farmsense_missing_field() {
        let body = r#"[{"Error":0,"Phase":"Full Moon","Illumination":1.0,"Distance":400000}]"#;
        assert!(matches!(
            parse_response(ApiShape::Farmsense, body),
            Err(DataUnavailable::MissingField("Age"))
        ));
    }

    #[test]
    fn timeanddate_response_is_normalised() {
        let body = r#"[{"phase":9,"illum":120.0,"age":31.0,"dist":370000}]"#;
        let snapshot = parse_response(ApiShape::TimeAndDate, body).unwrap();
        assert_eq!(snapshot.phase, Phase::WaxingCrescent);
        assert_eq!(snapshot.illumination_percent, 100.0);
        assert!((snapshot.age.value() - (31.0 - 29.530_588_67)).abs() < 1e-9);
        assert_eq!(snapshot.distance_km, 370_000.0);

        let bare = r#"{"phase":4,"illum":99.7,"age":14.9,"dist":405000.0}"#;
        assert_eq!(
            parse_response(ApiShape::TimeAndDate, bare).unwrap().phase,
            Phase::FullMoon
        );
    }

    #[test]
    fn remote_distance_is_not_clamped() {
        let body = r#"[{"Error":0,"Phase":"Full Moon","Illumination":1.0,"Age":14.8,"Distance":406500.0}]"#;
        let farmsense = parse_response(ApiShape::Farmsense, body).unwrap();
        assert_eq!(farmsense.distance_km, 406_500.0);

        let body = r#"{"phase":0,"illum":0.0,"age":0.2,"dist":356500.0}"#;
        let timeanddate = parse_response(ApiShape::TimeAndDate, body).unwrap();
        assert_eq!(timeanddate.distance_km, 356_500.0);
    }

    #[test]
    fn empty_and_malformed_bodies() {
        assert!(matches!(
            parse_response(ApiShape::TimeAndDate, "[]"),
            Err(DataUnavailable::EmptyResponse)
        ));
        assert!(matches!(
            parse_response(ApiShape::Farmsense, "<html>rate limited</html>"),
            Err(DataUnavailable::Parse(_))
        ));
        assert!(matches!(
            parse_response(ApiShape::TimeAndDate, r#"[{"phase":"two"}]"#),
            Err(DataUnavailable::Parse(_))
        ));
    }

    #[test]
    fn request_urls_per_shape() {
        let farmsense = RemoteSource::farmsense().unwrap();
        assert_eq!(
            farmsense.request_url(reference_instant()),
            "https://api.farmsense.net/v1/moonphases/?d=947182440"
        );

        let tad = RemoteSource::new(ApiShape::TimeAndDate, "https://moon.example/api?key=k").unwrap();
        assert_eq!(
            tad.request_url(reference_instant()),
            "https://moon.example/api?key=k&iso=2000-01-06"
        );
        assert_eq!(tad.kind(), SourceKind::TimeAndDate);
    }

    #[tokio::test]
    async fn closed_source_refuses_to_fetch() {
        let source = RemoteSource::farmsense().unwrap();
        source.close();
        assert!(source.is_closed());
        assert!(matches!(
            source.fetch(reference_instant()).await,
            Err(DataUnavailable::Closed)
        ));
    }
}
