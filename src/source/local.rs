// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

use super::{MoonDataSource, SourceKind};
use crate::error::DataUnavailable;
use crate::snapshot::MoonSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The built-in calculator; always available, never fails.
#[derive(Debug, Default, Copy, Clone)]
pub struct LocalSource;

#[async_trait]
impl MoonDataSource for LocalSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn fetch(&self, at: DateTime<Utc>) -> Result<MoonSnapshot, DataUnavailable> {
        Ok(MoonSnapshot::at(&at))
    }
}
