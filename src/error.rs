// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Error taxonomy.
//!
//! Only [`DataUnavailable`] ever reaches the user, as a non-blocking notice.
//! [`ConfigInvalid`] is recovered where it is raised by falling back to a
//! default; [`CatalogError`] signals a caller that skipped the modulo-8 clamp.

use thiserror::Error;

/// Strict catalog lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("phase index {0} outside 0..=7")]
    IndexOutOfRange(usize),

    #[error("unknown phase name: {0:?}")]
    UnknownName(String),
}

/// A refresh produced no usable data; the previous display must be kept.
#[derive(Error, Debug)]
pub enum DataUnavailable {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("response is missing field `{0}`")]
    MissingField(&'static str),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("empty response")]
    EmptyResponse,

    #[error("data source is closed")]
    Closed,
}

/// A malformed setting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigInvalid {
    #[error("`{key}` is not an integer")]
    NotAnInteger { key: String },

    #[error("`{key}` must be positive, got {value}")]
    NotPositive { key: String, value: i64 },

    #[error("`{key}` is not a string")]
    NotAString { key: String },

    #[error("unknown data source {0:?}")]
    UnknownSource(String),

    #[error("unknown hemisphere {0:?}")]
    UnknownHemisphere(String),

    #[error("data source {0:?} needs an `api-url`")]
    MissingApiUrl(&'static str),

    #[error("settings file: {0}")]
    Toml(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    DataUnavailable(#[from] DataUnavailable),

    #[error(transparent)]
    ConfigInvalid(#[from] ConfigInvalid),
}

pub type Result<T> = std::result::Result<T, Error>;
