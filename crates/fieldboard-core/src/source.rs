use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::models::{FieldId, RawValue, Sample, SampleSeries};

/// Anything that can hand back the recent samples of a field.
#[async_trait]
pub trait SampleSource: Send + Sync {
    async fn fetch(&self, field: &FieldId, results: usize) -> Result<SampleSeries, FetchError>;
}

/// Body of `GET /api/field/<field>`: parallel label and value arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSeries {
    pub labels: Vec<String>,
    pub values: Vec<Option<RawValue>>,
}

impl WireSeries {
    pub fn into_series(self) -> Result<SampleSeries, FetchError> {
        if self.labels.len() != self.values.len() {
            return Err(FetchError::Malformed(format!(
                "{} labels but {} values",
                self.labels.len(),
                self.values.len()
            )));
        }
        Ok(self
            .labels
            .into_iter()
            .zip(self.values)
            .map(|(timestamp, value)| Sample { timestamp, value })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct HttpSampleSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSampleSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid source url {:?}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("source url {} cannot carry a path", config.base_url);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("fieldboard/", env!("CARGO_PKG_VERSION"))),
        );
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name {name:?}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {name}"))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .context("building http client")?;
        Ok(Self { client, base_url })
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Self::new(&SourceConfig {
            base_url: base_url.to_string(),
            timeout,
            ..SourceConfig::default()
        })
    }

    /// `<base>/api/field/<field>?results=<n>`, the field encoded as one path
    /// segment.
    pub fn endpoint(&self, field: &FieldId, results: usize) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "field", field.as_str()]);
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("results", &results.to_string());
        url
    }
}

#[async_trait]
impl SampleSource for HttpSampleSource {
    async fn fetch(&self, field: &FieldId, results: usize) -> Result<SampleSeries, FetchError> {
        let url = self.endpoint(field, results);
        debug!(%field, %url, "requesting samples");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        let wire: WireSeries =
            serde_json::from_slice(&body).map_err(|err| FetchError::Malformed(err.to_string()))?;
        wire.into_series()
    }
}
