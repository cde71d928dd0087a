//! REST data source
//!
//! Reads the four history endpoints of the backend and converts the rows with
//! [`RowAdapter`]. Malformed rows are skipped by the adapter; transport, status
//! and body failures become [`FetchError`]s.

use crate::error::FetchError;
use crate::refresh::DataSource;
use crate::schema::{BackendRow, CriseRow, DrugRow, FlashPopRow, NoiseGameRow, RowAdapter};
use crate::types::{CognitiveSession, MedicationEvent, MotorSession, SeizureEvent};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct HttpDataSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDataSource {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint serving rows of one resource
    pub fn url_for(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }

    async fn fetch_rows<R>(&self) -> Result<Vec<R::Record>, FetchError>
    where
        R: BackendRow + DeserializeOwned,
    {
        let url = self.url_for(R::RESOURCE);

        let response = self.client.get(&url).send().await.map_err(|e| FetchError::Transport {
            resource: R::RESOURCE.to_string(),
            message: if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                resource: R::RESOURCE.to_string(),
                status: status.as_u16(),
            });
        }

        let rows: Vec<R> = response.json().await.map_err(|e| FetchError::Decode {
            resource: R::RESOURCE.to_string(),
            message: e.to_string(),
        })?;

        debug!(resource = R::RESOURCE, rows = rows.len(), "Fetched rows");
        Ok(RowAdapter::convert(&rows))
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch_seizures(&self) -> Result<Vec<SeizureEvent>, FetchError> {
        self.fetch_rows::<CriseRow>().await
    }

    async fn fetch_medications(&self) -> Result<Vec<MedicationEvent>, FetchError> {
        self.fetch_rows::<DrugRow>().await
    }

    async fn fetch_cognitive_sessions(&self) -> Result<Vec<CognitiveSession>, FetchError> {
        self.fetch_rows::<FlashPopRow>().await
    }

    async fn fetch_motor_sessions(&self) -> Result<Vec<MotorSession>, FetchError> {
        self.fetch_rows::<NoiseGameRow>().await
    }
}
